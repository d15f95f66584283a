pub mod claim;
pub mod common;
pub mod credit;
pub mod draw;
pub mod instant_win;
pub mod pagination;
pub mod purchase_limit;
pub mod raffle;
pub mod reservation;
pub mod ticket;

pub use claim::*;
pub use common::*;
pub use credit::*;
pub use draw::*;
pub use instant_win::*;
pub use pagination::*;
pub use purchase_limit::*;
pub use raffle::*;
pub use reservation::*;
pub use ticket::*;
