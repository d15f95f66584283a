pub mod admin;
pub mod claim;
pub mod credit;
pub mod raffle;
pub mod reservation;
pub mod ticket;

pub use admin::admin_config;
pub use claim::claim_config;
pub use credit::credit_config;
pub use raffle::raffle_config;
pub use reservation::reservation_config;
pub use ticket::ticket_config;
