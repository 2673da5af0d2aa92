//! API DTOs module
//!
//! This module contains all API data transfer objects organized by domain:
//! - `auth`: login and token refresh
//! - `fleet`: list queries and create/update payloads for users, vehicles and routes

pub mod auth;
pub mod fleet;

pub use auth::*;
pub use fleet::*;
