//! CarIn fleet client
//!
//! Talks to the CarIn API gateway on behalf of a fleet administrator. Every
//! request goes through one [`coordinator::RefreshCoordinator`], which keeps
//! the access token fresh and renews it at most once for any number of
//! concurrent calls.

pub mod auth;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod routes;
pub mod store;
pub mod token;
pub mod transport;
pub mod users;
pub mod vehicles;
pub mod version;

#[cfg(test)]
pub(crate) mod tests;

pub use auth::{spawn_refresh_ticker, AuthService, RefreshTicker, SessionStatus};
pub use client::ApiClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use coordinator::RefreshCoordinator;
pub use error::{CarinError, ErrorCode, Result};
pub use store::{CredentialStore, CredentialStoreConfig, StoredCredential};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
