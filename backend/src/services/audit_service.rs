//! Write-only sinks for audit records and domain events.
//!
//! The auth subsystem never reads these back; it emits a record for every
//! authentication outcome and moves on. Reasons are redacted to stable codes
//! so no secret material or internal identifiers leak into log pipelines.

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
}

/// One authentication-related audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// e.g. `login`, `mfa_verify`, `logout`, `password_change`
    pub action: &'static str,
    pub outcome: AuditOutcome,
    /// Redacted reason code; never free text from an error chain.
    pub reason: Option<&'static str>,
    /// Lower-cased login email when the user could not be resolved to an id.
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
}

impl AuditEvent {
    pub fn success(action: &'static str) -> Self {
        Self {
            action,
            outcome: AuditOutcome::Success,
            reason: None,
            email: None,
            user_id: None,
            session_id: None,
            ip_address: None,
        }
    }

    pub fn failure(action: &'static str, reason: &'static str) -> Self {
        Self {
            action,
            outcome: AuditOutcome::Failure,
            reason: Some(reason),
            email: None,
            user_id: None,
            session_id: None,
            ip_address: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn ip(mut self, ip: Option<String>) -> Self {
        self.ip_address = ip;
        self
    }
}

/// Audit sink backed by structured tracing output under the `audit` target.
/// Persistence is wired up by the log pipeline, not by this subsystem.
#[derive(Debug, Clone, Default)]
pub struct AuditSink;

impl AuditSink {
    pub fn record(&self, event: &AuditEvent) {
        match event.outcome {
            AuditOutcome::Success => info!(
                target: "audit",
                action = event.action,
                outcome = "success",
                user_id = event.user_id.as_deref(),
                session_id = event.session_id.as_deref(),
                email = event.email.as_deref(),
                ip = event.ip_address.as_deref(),
            ),
            AuditOutcome::Failure => warn!(
                target: "audit",
                action = event.action,
                outcome = "failure",
                reason = event.reason,
                user_id = event.user_id.as_deref(),
                email = event.email.as_deref(),
                ip = event.ip_address.as_deref(),
            ),
        }
    }
}

/// Domain events other parts of the clinic application subscribe to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    UserLoggedIn { user_id: String, session_id: String },
    UserLoggedOut { user_id: String, session_id: String },
    MfaEnabled { user_id: String },
    MfaDisabled { user_id: String },
    PasswordChanged { user_id: String, sessions_revoked: u64 },
}

/// Write-only publisher; downstream consumers live outside this subsystem.
#[derive(Debug, Clone, Default)]
pub struct EventPublisher;

impl EventPublisher {
    pub fn publish(&self, event: &DomainEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            info!(target: "events", %payload, "domain event");
        }
    }
}
