//! Unified error handling for the CarIn client and CLI
//!
//! This module provides the error system used across the crate:
//! - Unique error codes for debugging and support requests
//! - Structured error information with context
//! - Convenient constructor methods
//! - Automatic conversions from common error types

use std::fmt;
use thiserror::Error;

/// Unified Result type for all CarIn operations
pub type Result<T> = std::result::Result<T, CarinError>;

/// Error codes for CarIn operations
///
/// Each error has a unique code in the format `CXXX` where:
/// - C1XX: Authentication and session errors
/// - C2XX: Network and API errors
/// - C3XX: File and I/O errors
/// - C4XX: Configuration errors
/// - C5XX: Validation and input errors
/// - C8XX: UI and interaction errors
/// - C9XX: Internal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication (C1XX)
    /// C101: Authentication failed
    AuthenticationFailed,
    /// C102: No stored session
    NotAuthenticated,
    /// C103: Access token could not be decoded
    TokenDecodeFailed,
    /// C104: Credential renewal failed
    RenewalFailed,

    // Network (C2XX)
    /// C201: HTTP request failed
    HttpError,
    /// C202: Connection timeout
    ConnectionTimeout,
    /// C204: Connection refused
    ConnectionRefused,
    /// C205: API returned error response
    ApiError,
    /// C206: Invalid API response format
    InvalidResponse,

    // File/IO (C3XX)
    /// C301: File not found
    FileNotFound,
    /// C302: File read error
    FileReadError,
    /// C303: File write error
    FileWriteError,
    /// C304: File already exists
    FileAlreadyExists,

    // Configuration (C4XX)
    /// C401: Configuration error
    ConfigError,
    /// C402: Invalid endpoint URL
    InvalidEndpoint,

    // Validation (C5XX)
    /// C501: Invalid input
    InvalidInput,
    /// C502: Validation failed
    ValidationFailed,

    // UI (C8XX)
    /// C801: Dialog error
    DialogError,
    /// C802: User cancelled
    UserCancelled,

    // Internal (C9XX)
    /// C901: Internal error
    InternalError,
    /// C902: Serialization error
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code
    pub fn code(&self) -> u16 {
        match self {
            // Authentication (C1XX)
            ErrorCode::AuthenticationFailed => 101,
            ErrorCode::NotAuthenticated => 102,
            ErrorCode::TokenDecodeFailed => 103,
            ErrorCode::RenewalFailed => 104,

            // Network (C2XX)
            ErrorCode::HttpError => 201,
            ErrorCode::ConnectionTimeout => 202,
            ErrorCode::ConnectionRefused => 204,
            ErrorCode::ApiError => 205,
            ErrorCode::InvalidResponse => 206,

            // File/IO (C3XX)
            ErrorCode::FileNotFound => 301,
            ErrorCode::FileReadError => 302,
            ErrorCode::FileWriteError => 303,
            ErrorCode::FileAlreadyExists => 304,

            // Configuration (C4XX)
            ErrorCode::ConfigError => 401,
            ErrorCode::InvalidEndpoint => 402,

            // Validation (C5XX)
            ErrorCode::InvalidInput => 501,
            ErrorCode::ValidationFailed => 502,

            // UI (C8XX)
            ErrorCode::DialogError => 801,
            ErrorCode::UserCancelled => 802,

            // Internal (C9XX)
            ErrorCode::InternalError => 901,
            ErrorCode::SerializationError => 902,
        }
    }

    /// Get the string code (e.g., "C101")
    pub fn as_str(&self) -> String {
        format!("C{}", self.code())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.code())
    }
}

/// Main error type for all CarIn operations
#[derive(Error, Debug)]
pub enum CarinError {
    // ==================== Authentication Errors (C1XX) ====================
    /// Authentication failed
    #[error("[{code}] Authentication failed: {message}")]
    Authentication {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Stored access token is malformed; the session has to be terminated
    #[error("[{code}] Invalid access token: {message}")]
    Decode { code: ErrorCode, message: String },

    /// The refresh exchange failed. Every caller waiting on it gets this.
    #[error("[{code}] Session renewal failed: {message}")]
    RenewalFailed {
        code: ErrorCode,
        message: String,
        /// Network failures and timeouts; the stored session may still be good
        transient: bool,
    },

    // ==================== Network Errors (C2XX) ====================
    /// HTTP/Network error
    #[error("[{code}] Network error: {message}")]
    Network {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// API error with status code
    #[error("[{code}] API error ({status}): {message}")]
    Api {
        code: ErrorCode,
        status: u16,
        message: String,
    },

    // ==================== File/IO Errors (C3XX) ====================
    /// File or IO error
    #[error("[{code}] {context}: {message}")]
    Io {
        code: ErrorCode,
        context: String,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // ==================== Configuration Errors (C4XX) ====================
    /// Configuration error
    #[error("[{code}] Configuration error: {message}")]
    Config {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<config::ConfigError>,
    },

    // ==================== Validation Errors (C5XX) ====================
    /// Validation error
    #[error("[{code}] Validation error: {message}")]
    Validation {
        code: ErrorCode,
        message: String,
        field: Option<String>,
    },

    /// Invalid input error
    #[error("[{code}] Invalid input: {message}")]
    InvalidInput { code: ErrorCode, message: String },

    // ==================== UI Errors (C8XX) ====================
    /// UI/Dialog error
    #[error("[{code}] UI error: {message}")]
    Ui { code: ErrorCode, message: String },

    // ==================== Internal Errors (C9XX) ====================
    /// Internal/Unexpected error
    #[error("[{code}] Internal error: {message}")]
    Internal { code: ErrorCode, message: String },

    /// JSON serialization error
    #[error("[{code}] Serialization error: {message}")]
    Serialization {
        code: ErrorCode,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

// ==================== Constructor Methods ====================

impl CarinError {
    // --- Authentication ---

    /// Create authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            code: ErrorCode::AuthenticationFailed,
            message: message.into(),
            source: None,
        }
    }

    /// Create not-authenticated error
    pub fn not_authenticated() -> Self {
        Self::Authentication {
            code: ErrorCode::NotAuthenticated,
            message: "Not logged in. Run 'carin login' first.".to_string(),
            source: None,
        }
    }

    /// Create token decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            code: ErrorCode::TokenDecodeFailed,
            message: message.into(),
        }
    }

    /// Create renewal error for a rejected refresh token or an unreadable new token
    pub fn renewal_failed(message: impl Into<String>) -> Self {
        Self::RenewalFailed {
            code: ErrorCode::RenewalFailed,
            message: message.into(),
            transient: false,
        }
    }

    /// Create renewal error for a network failure or timeout
    pub fn renewal_failed_transient(message: impl Into<String>) -> Self {
        Self::RenewalFailed {
            code: ErrorCode::RenewalFailed,
            message: message.into(),
            transient: true,
        }
    }

    // --- Network ---

    /// Create network error from message
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            code: ErrorCode::HttpError,
            message: message.into(),
            source: None,
        }
    }

    /// Create network error from reqwest error
    pub fn network_from_reqwest(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::ConnectionTimeout
        } else if err.is_connect() {
            ErrorCode::ConnectionRefused
        } else {
            ErrorCode::HttpError
        };

        Self::Network {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create API error
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::ApiError,
            status,
            message: message.into(),
        }
    }

    /// Create invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::Api {
            code: ErrorCode::InvalidResponse,
            status: 0,
            message: message.into(),
        }
    }

    // --- File/IO ---

    /// Create IO error from std::io::Error
    pub fn io_from_error(context: impl Into<String>, err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::FileWriteError,
            std::io::ErrorKind::AlreadyExists => ErrorCode::FileAlreadyExists,
            _ => ErrorCode::FileReadError,
        };

        Self::Io {
            code,
            context: context.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    // --- Configuration ---

    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration error with source
    pub fn config_from_error(err: config::ConfigError) -> Self {
        Self::Config {
            code: ErrorCode::ConfigError,
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create invalid endpoint error
    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::InvalidEndpoint,
            message: message.into(),
            source: None,
        }
    }

    // --- Validation ---

    /// Create invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidInput,
            message: message.into(),
        }
    }

    // --- UI ---

    /// Create user cancelled error
    pub fn user_cancelled() -> Self {
        Self::Ui {
            code: ErrorCode::UserCancelled,
            message: "Operation cancelled by user".to_string(),
        }
    }

    // --- Internal ---

    /// Create internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
        }
    }

    // --- Utility Methods ---

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Authentication { code, .. } => *code,
            Self::Decode { code, .. } => *code,
            Self::RenewalFailed { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Api { code, .. } => *code,
            Self::Io { code, .. } => *code,
            Self::Config { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::InvalidInput { code, .. } => *code,
            Self::Ui { code, .. } => *code,
            Self::Internal { code, .. } => *code,
            Self::Serialization { code, .. } => *code,
        }
    }

    /// Message without the code prefix, suitable for an inline notification
    pub fn message(&self) -> String {
        match self {
            Self::Authentication { message, .. }
            | Self::Decode { message, .. }
            | Self::RenewalFailed { message, .. }
            | Self::Network { message, .. }
            | Self::Api { message, .. }
            | Self::Io { message, .. }
            | Self::Config { message, .. }
            | Self::Validation { message, .. }
            | Self::InvalidInput { message, .. }
            | Self::Ui { message, .. }
            | Self::Internal { message, .. }
            | Self::Serialization { message, .. } => message.clone(),
        }
    }

    /// Whether the stored session must be destroyed and the user sent back to login
    pub fn requires_logout(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::RenewalFailed {
                    transient: false,
                    ..
                }
        )
    }
}

// ==================== From Implementations ====================

impl From<std::io::Error> for CarinError {
    fn from(err: std::io::Error) -> Self {
        Self::io_from_error("IO operation", err)
    }
}

impl From<reqwest::Error> for CarinError {
    fn from(err: reqwest::Error) -> Self {
        Self::network_from_reqwest(err)
    }
}

impl From<serde_json::Error> for CarinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::SerializationError,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<config::ConfigError> for CarinError {
    fn from(err: config::ConfigError) -> Self {
        Self::config_from_error(err)
    }
}

impl From<dialoguer::Error> for CarinError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Ui {
            code: ErrorCode::DialogError,
            message: format!("Dialog error: {}", err),
        }
    }
}

impl From<validator::ValidationErrors> for CarinError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let field = fields.first().map(|(name, _)| name.to_string());
        let message = fields
            .iter()
            .map(|(name, errs)| {
                let detail = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", name, detail)
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message,
            field,
        }
    }
}

// Manual Clone implementation that drops non-cloneable sources
impl Clone for CarinError {
    fn clone(&self) -> Self {
        match self {
            Self::Authentication {
                code,
                message,
                source: _,
            } => Self::Authentication {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Decode { code, message } => Self::Decode {
                code: *code,
                message: message.clone(),
            },
            Self::RenewalFailed {
                code,
                message,
                transient,
            } => Self::RenewalFailed {
                code: *code,
                message: message.clone(),
                transient: *transient,
            },
            Self::Network {
                code,
                message,
                source: _,
            } => Self::Network {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Api {
                code,
                status,
                message,
            } => Self::Api {
                code: *code,
                status: *status,
                message: message.clone(),
            },
            Self::Io {
                code,
                context,
                message,
                source: _,
            } => Self::Io {
                code: *code,
                context: context.clone(),
                message: message.clone(),
                source: None,
            },
            Self::Config {
                code,
                message,
                source: _,
            } => Self::Config {
                code: *code,
                message: message.clone(),
                source: None,
            },
            Self::Validation {
                code,
                message,
                field,
            } => Self::Validation {
                code: *code,
                message: message.clone(),
                field: field.clone(),
            },
            Self::InvalidInput { code, message } => Self::InvalidInput {
                code: *code,
                message: message.clone(),
            },
            Self::Ui { code, message } => Self::Ui {
                code: *code,
                message: message.clone(),
            },
            Self::Internal { code, message } => Self::Internal {
                code: *code,
                message: message.clone(),
            },
            Self::Serialization {
                code,
                message,
                source: _,
            } => Self::Serialization {
                code: *code,
                message: message.clone(),
                source: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::AuthenticationFailed.code(), 101);
        assert_eq!(ErrorCode::RenewalFailed.code(), 104);
        assert_eq!(ErrorCode::HttpError.code(), 201);
        assert_eq!(ErrorCode::FileNotFound.code(), 301);
        assert_eq!(ErrorCode::ConfigError.code(), 401);
    }

    #[test]
    fn test_error_code_string() {
        assert_eq!(ErrorCode::AuthenticationFailed.as_str(), "C101");
        assert_eq!(ErrorCode::TokenDecodeFailed.as_str(), "C103");
    }

    #[test]
    fn test_error_display() {
        let err = CarinError::api(422, "License plate already registered");
        assert!(err.to_string().contains("C205"));
        assert!(err.to_string().contains("422"));
        assert_eq!(err.message(), "License plate already registered");
    }

    #[test]
    fn test_validation_errors_name_the_first_field() {
        use validator::Validate;

        let request = carin_protocol::LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let err = CarinError::from(request.validate().unwrap_err());
        match &err {
            CarinError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("email")),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
        assert!(err.message().contains("password"));
    }

    #[test]
    fn test_requires_logout() {
        assert!(CarinError::decode("bad segment").requires_logout());
        assert!(CarinError::renewal_failed("rejected").requires_logout());
        assert!(!CarinError::renewal_failed_transient("timed out").requires_logout());
        assert!(!CarinError::api(401, "Unauthorized").requires_logout());
    }

    #[test]
    fn test_clone_keeps_renewal_details() {
        let err = CarinError::renewal_failed_transient("connection reset");
        match err.clone() {
            CarinError::RenewalFailed {
                code,
                message,
                transient,
            } => {
                assert_eq!(code, ErrorCode::RenewalFailed);
                assert_eq!(message, "connection reset");
                assert!(transient);
            }
            other => panic!("unexpected clone: {:?}", other),
        }
    }
}
