pub mod claim_allocations;
pub mod credit_accounts;
pub mod credit_transactions;
pub mod instant_wins;
pub mod prizes;
pub mod raffle_draws;
pub mod raffle_status_changes;
pub mod raffles;
pub mod reserved_tickets;
pub mod ticket_reservations;
pub mod tickets;
pub mod user_raffle_stats;

pub use claim_allocations as claim_allocation_entity;
pub use credit_accounts as credit_account_entity;
pub use credit_transactions as credit_transaction_entity;
pub use instant_wins as instant_win_entity;
pub use prizes as prize_entity;
pub use raffle_draws as raffle_draw_entity;
pub use raffle_status_changes as raffle_status_change_entity;
pub use raffles as raffle_entity;
pub use reserved_tickets as reserved_ticket_entity;
pub use ticket_reservations as ticket_reservation_entity;
pub use tickets as ticket_entity;
pub use user_raffle_stats as user_raffle_stat_entity;

pub use claim_allocations::{ClaimMethod, ClaimSource, ClaimStatus};
pub use credit_transactions::{CreditReferenceType, CreditTransactionType};
pub use instant_wins::InstantWinStatus;
pub use prizes::PrizeKind;
pub use raffles::RaffleStatus;
pub use ticket_reservations::ReservationStatus;
pub use tickets::TicketStatus;
