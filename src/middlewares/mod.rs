pub mod auth;
pub mod cors;

pub use auth::{AuthMiddleware, Caller, get_caller};
pub use cors::create_cors;
