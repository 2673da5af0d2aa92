//! Local access token inspection
//!
//! Access tokens are compact JWS strings (`header.payload.signature`). The
//! client never verifies the signature; it only reads the payload to learn
//! who is logged in and when the token stops being usable.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::time::Duration;

use carin_protocol::{Claims, Identity};

use crate::error::{CarinError, Result};

/// Renew when less than this much lifetime is left
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of checking a token against a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    /// Usable as-is; `false` means renew first
    pub valid: bool,
    pub identity: Option<Identity>,
    pub expires_at: DateTime<Utc>,
}

impl Validity {
    /// Seconds of lifetime left at `now`; negative once expired
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at.timestamp() - now.timestamp()
    }
}

/// Payload-only reading: no signature check, expiry judged by `check`
fn inspection() -> Validation {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the claims embedded in an access token
pub fn decode_claims(token: &str) -> Result<Claims> {
    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &inspection())
        .map(|data| data.claims)
        .map_err(|e| CarinError::decode(format!("access token is not a readable claim set: {}", e)))
}

/// Expiry instant encoded in the claims
pub fn expires_at(claims: &Claims) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| CarinError::decode(format!("exp {} is out of range", claims.exp)))
}

/// Decide whether `token` may be used at `now` or must be renewed first
///
/// Renewal is required when `exp - now < window`, which also covers tokens
/// that already expired.
pub fn check(token: &str, now: DateTime<Utc>, window: Duration) -> Result<Validity> {
    let claims = decode_claims(token)?;
    let expires_at = expires_at(&claims)?;
    let remaining = claims.exp.saturating_sub(now.timestamp());
    let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);

    Ok(Validity {
        valid: remaining >= window_secs,
        identity: Some(Identity::from(claims)),
        expires_at,
    })
}

/// Identity of the token holder, without any expiry judgement
pub fn identity(token: &str) -> Result<Identity> {
    decode_claims(token).map(Identity::from)
}
