//! Authentication module for managing user accounts, sessions, and access control.
//!
//! This module provides the public interface for authentication-related
//! functionality: the login state machine, MFA enrollment and verification,
//! session-backed token validation, permission resolution, and the account
//! lockout guard.

pub mod handlers;
pub mod lockout;
pub mod mfa;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod service;
