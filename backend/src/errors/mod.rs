//! Global application error types and handlers.
//!
//! This module defines custom error types that are used across the entire
//! backend application and provides mechanisms for consistent error handling
//! and response formatting.

use thiserror::Error;

/// Authentication and session-lifecycle failures.
///
/// Every variant maps to a stable client-visible code; the specific cause is
/// only retained in the audit log, never in the response body.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Bad email or password. Never distinguishes which, to resist
    /// account enumeration.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Too many consecutive failed password attempts.
    #[error("Account is temporarily locked")]
    AccountLocked,

    /// Bad signature, expired, malformed, or wrong token type.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// TOTP or backup code did not match.
    #[error("Invalid verification code")]
    InvalidMfaCode,

    #[error("Multi-factor authentication is already enabled")]
    MfaAlreadyEnabled,

    #[error("Multi-factor authentication is not enabled")]
    MfaNotEnabled,

    /// Session was revoked or passed its expiry; the session record is
    /// authoritative even when the bearer token still verifies.
    #[error("Session has been revoked or expired")]
    SessionRevokedOrExpired,

    #[error("New password must differ from the current password")]
    PasswordReuse,

    #[error("Password does not meet strength requirements")]
    WeakPassword,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: anyhow::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    // Helper constructors for common patterns

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountLocked => "account_locked",
            Self::InvalidToken => "invalid_token",
            Self::InvalidMfaCode => "invalid_mfa_code",
            Self::MfaAlreadyEnabled => "mfa_already_enabled",
            Self::MfaNotEnabled => "mfa_not_enabled",
            Self::SessionRevokedOrExpired => "session_revoked_or_expired",
            Self::PasswordReuse => "password_reuse",
            Self::WeakPassword => "weak_password",
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Database { .. } => "internal_error",
            Self::Internal { .. } => "internal_error",
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            source: anyhow::Error::new(err),
        }
    }
}
