//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, token signing secrets and lifetimes, and
//! the account-lockout and MFA enforcement policy.

use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub server_port: u16,
    /// HS256 secret for access and MFA challenge/setup tokens.
    pub access_token_secret: String,
    /// HS256 secret for refresh tokens; distinct from the access secret.
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub mfa_challenge_ttl_seconds: u64,
    pub mfa_setup_ttl_seconds: u64,
    pub lockout_threshold: u32,
    pub lockout_window_minutes: i64,
    /// Role codes that may not log in without MFA enabled.
    pub mfa_required_roles: Vec<String>,
    /// Issuer shown in authenticator apps.
    pub totp_issuer: String,
    pub cookie_secure: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let access_token_secret =
            env::var("ACCESS_TOKEN_SECRET").context("ACCESS_TOKEN_SECRET not set")?;

        let refresh_token_secret =
            env::var("REFRESH_TOKEN_SECRET").context("REFRESH_TOKEN_SECRET not set")?;

        let access_token_ttl_seconds = env::var("ACCESS_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .context("ACCESS_TOKEN_TTL_SECONDS must be a valid number")?;

        let refresh_token_ttl_seconds = env::var("REFRESH_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "604800".to_string())
            .parse::<u64>()
            .context("REFRESH_TOKEN_TTL_SECONDS must be a valid number")?;

        let mfa_challenge_ttl_seconds = env::var("MFA_CHALLENGE_TTL_SECONDS")
            .unwrap_or_else(|_| "600".to_string())
            .parse::<u64>()
            .context("MFA_CHALLENGE_TTL_SECONDS must be a valid number")?;

        let mfa_setup_ttl_seconds = env::var("MFA_SETUP_TTL_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .context("MFA_SETUP_TTL_SECONDS must be a valid number")?;

        let lockout_threshold = env::var("LOCKOUT_THRESHOLD")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("LOCKOUT_THRESHOLD must be a valid number")?;

        let lockout_window_minutes = env::var("LOCKOUT_WINDOW_MINUTES")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()
            .context("LOCKOUT_WINDOW_MINUTES must be a valid number")?;

        let mfa_required_roles = env::var("MFA_REQUIRED_ROLES")
            .unwrap_or_else(|_| "admin".to_string())
            .split(',')
            .map(|role| role.trim().to_string())
            .filter(|role| !role.is_empty())
            .collect();

        let totp_issuer = env::var("TOTP_ISSUER").unwrap_or_else(|_| "CliniGate".to_string());

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            server_port,
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            mfa_challenge_ttl_seconds,
            mfa_setup_ttl_seconds,
            lockout_threshold,
            lockout_window_minutes,
            mfa_required_roles,
            totp_issuer,
            cookie_secure,
        })
    }

    /// Fixed configuration for unit tests; no environment access.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            server_port: 0,
            access_token_secret: "test-access-secret".to_string(),
            refresh_token_secret: "test-refresh-secret".to_string(),
            access_token_ttl_seconds: 900,
            refresh_token_ttl_seconds: 604_800,
            mfa_challenge_ttl_seconds: 600,
            mfa_setup_ttl_seconds: 900,
            lockout_threshold: 5,
            lockout_window_minutes: 15,
            mfa_required_roles: vec!["admin".to_string()],
            totp_issuer: "CliniGate".to_string(),
            cookie_secure: false,
        }
    }
}
