//! Error handling utilities for API responses.
//!
//! Provides structured error responses and conversion between service-layer
//! errors and HTTP responses. Every failure surfaces with a stable
//! machine-readable code and a generic message; the specific cause only
//! lives in the audit log.

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;

use crate::errors::AuthError;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Request timestamp
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Maps an `AuthError` to an HTTP status plus a JSON error body.
///
/// No stack traces or internal identifiers reach the caller; database and
/// internal errors collapse into a generic 500.
pub fn auth_error_to_http(error: AuthError) -> (StatusCode, String) {
    let status = match &error {
        AuthError::InvalidCredentials
        | AuthError::InvalidToken
        | AuthError::InvalidMfaCode
        | AuthError::SessionRevokedOrExpired => StatusCode::UNAUTHORIZED,
        AuthError::AccountLocked => StatusCode::LOCKED,
        AuthError::MfaAlreadyEnabled
        | AuthError::MfaNotEnabled
        | AuthError::PasswordReuse
        | AuthError::WeakPassword
        | AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
        AuthError::NotFound { .. } => StatusCode::NOT_FOUND,
        AuthError::Database { .. } | AuthError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Internal server error".to_string()
    } else {
        error.to_string()
    };

    let body = serde_json::json!({
        "error": message,
        "code": error.code(),
    });

    (status, body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_failures_map_to_stable_codes() {
        let (status, body) = auth_error_to_http(AuthError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("invalid_credentials"));

        let (status, _) = auth_error_to_http(AuthError::AccountLocked);
        assert_eq!(status, StatusCode::LOCKED);

        let (status, body) = auth_error_to_http(AuthError::WeakPassword);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("weak_password"));
    }

    #[test]
    fn internal_details_never_leak() {
        let (status, body) =
            auth_error_to_http(AuthError::internal("secret pool state: xyz"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("xyz"));
    }
}
