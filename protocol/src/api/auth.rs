//! Authentication API DTOs
//!
//! Login and token refresh bodies for the `/auth` endpoints.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Login DTOs
// ============================================================================

/// Email/password login request for `POST /auth/login`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub password: String,
}

/// Login response: a fresh access/refresh token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
}

// ============================================================================
// Token Refresh DTOs
// ============================================================================

/// Refresh access token request for `POST /auth/refreshToken`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Refresh token response
///
/// The gateway returns only the new access token; a rotated refresh token is
/// accepted when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}
