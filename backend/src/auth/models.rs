//! Data structures for authentication-related entities.
//!
//! This module defines the request payloads, response bodies, and
//! service-level outcome types used across the login, refresh, MFA, and
//! password-change flows. Wire field names follow the public API contract
//! (camelCase); login outcomes are a closed tagged union, never a bag of
//! optional fields.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::permissions::ResolvedAccess;
use crate::database::models::User;

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Must be a valid email"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// MFA code submission, for setup verification, login challenge, or disable.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyMfaRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DisableMfaRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LogoutRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,
}

/// Non-secret user projection returned by login, refresh, and `/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
}

impl UserSummary {
    pub fn new(user: &User, access: &ResolvedAccess) -> Self {
        UserSummary {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            roles: access.roles.clone(),
            permissions: access.permissions.clone(),
            department_id: user.department_id.clone(),
            employee_id: user.employee_id.clone(),
        }
    }
}

/// A fully completed authentication: tokens plus session metadata. Tokens
/// travel to the client as cookies; the body only carries the rest.
#[derive(Debug)]
pub struct CompletedAuth {
    pub user: UserSummary,
    pub session_id: String,
    pub expires_in: u64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Outcome of a login attempt that passed the password check.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Password (and MFA, when required) verified; session created.
    Complete(Box<CompletedAuth>),
    /// MFA enabled; a challenge token bridges to code entry.
    MfaRequired { temp_token: String },
    /// User's role mandates MFA but it is not enrolled yet.
    MfaSetupRequired { temp_token: String },
}

/// Result of a token refresh: new access token for the same session.
#[derive(Debug)]
pub struct RefreshedAuth {
    pub user: UserSummary,
    pub session_id: String,
    pub expires_in: u64,
    pub access_token: String,
}

/// Login response body; one of the three outcome shapes.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LoginResponse {
    #[serde(rename_all = "camelCase")]
    Complete {
        user: UserSummary,
        session_id: String,
        expires_in: u64,
    },
    #[serde(rename_all = "camelCase")]
    MfaRequired { mfa_required: bool, temp_token: String },
    #[serde(rename_all = "camelCase")]
    MfaSetupRequired {
        mfa_setup_required: bool,
        temp_token: String,
    },
}

/// Token refresh response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub user: UserSummary,
    pub session_id: String,
    pub expires_in: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
