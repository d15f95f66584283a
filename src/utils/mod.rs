pub mod jwt;
pub mod sampling;
pub mod ticket_number;

pub use jwt::*;
pub use sampling::sample_without_replacement;
pub use ticket_number::format_ticket_number;
