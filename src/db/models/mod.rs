//! Database models split into domain-specific modules.

pub mod todo;
pub mod user;

pub use todo::*;
pub use user::*;
