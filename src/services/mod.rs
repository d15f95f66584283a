pub mod claim_service;
pub mod draw_service;
pub mod instant_win_service;
pub mod ledger_service;
pub mod purchase_limit_service;
pub mod raffle_service;
pub mod reservation_service;
pub mod ticket_service;

pub use claim_service::ClaimService;
pub use draw_service::DrawService;
pub use instant_win_service::InstantWinService;
pub use ledger_service::{LedgerEntry, LedgerService};
pub use purchase_limit_service::PurchaseLimitService;
pub use raffle_service::RaffleService;
pub use reservation_service::ReservationService;
pub use ticket_service::TicketService;
