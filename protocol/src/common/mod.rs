pub mod auth;
pub mod fleet;
pub mod pagination;

pub use auth::*;
pub use fleet::*;
pub use pagination::*;
