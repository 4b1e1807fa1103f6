//! JWT token utilities for authentication and authorization.
//!
//! Provides secure token creation, validation, and claims management for the
//! four token families the auth subsystem issues: access, refresh, MFA
//! challenge, and MFA setup. Refresh tokens are signed with a secret distinct
//! from the other three, so a leaked access-signing key can never mint a
//! long-lived credential.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::errors::{AuthError, AuthResult};

/// Closed set of token families. Verification requires the caller to name the
/// kind it expects; a cryptographically valid token of another kind is
/// rejected the same way a forged one is.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    MfaChallenge,
    MfaSetup,
}

/// JWT claims shared by all token kinds; per-kind fields are optional and
/// omitted from kinds that do not carry them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub token_type: TokenKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Role-code snapshot (access tokens only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Permission-code snapshot (access tokens only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub mfa_verified: bool,
    /// Login email (challenge/setup tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Client metadata for anomaly comparison (challenge/setup tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token issued at timestamp
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p == code)
    }
}

/// Client metadata captured at the HTTP edge and carried through the flow.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Token issuer and verifier for all four token families.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
    challenge_ttl: Duration,
    setup_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        TokenIssuer {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            validation,
            access_ttl: Duration::seconds(config.access_token_ttl_seconds as i64),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl_seconds as i64),
            challenge_ttl: Duration::seconds(config.mfa_challenge_ttl_seconds as i64),
            setup_ttl: Duration::seconds(config.mfa_setup_ttl_seconds as i64),
        }
    }

    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl.num_seconds() as u64
    }

    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.refresh_ttl.num_seconds() as u64
    }

    /// Generate an access token carrying the role/permission snapshot.
    pub fn issue_access(
        &self,
        user_id: &str,
        session_id: &str,
        roles: Vec<String>,
        permissions: Vec<String>,
        mfa_verified: bool,
    ) -> AuthResult<String> {
        let claims = self.base_claims(user_id, TokenKind::Access, self.access_ttl);
        let claims = Claims {
            session_id: Some(session_id.to_string()),
            roles,
            permissions,
            mfa_verified,
            ..claims
        };
        self.sign(&claims, &self.access_encoding)
    }

    /// Generate a refresh token; carries only the subject and session id.
    pub fn issue_refresh(&self, user_id: &str, session_id: &str) -> AuthResult<String> {
        let claims = self.base_claims(user_id, TokenKind::Refresh, self.refresh_ttl);
        let claims = Claims {
            session_id: Some(session_id.to_string()),
            ..claims
        };
        self.sign(&claims, &self.refresh_encoding)
    }

    /// Short-lived token bridging password success to MFA code entry.
    pub fn issue_mfa_challenge(
        &self,
        user_id: &str,
        email: &str,
        client: &ClientMeta,
    ) -> AuthResult<String> {
        let claims = self.base_claims(user_id, TokenKind::MfaChallenge, self.challenge_ttl);
        let claims = Claims {
            email: Some(email.to_string()),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            ..claims
        };
        self.sign(&claims, &self.access_encoding)
    }

    /// Short-lived token bridging password success to first MFA enrollment.
    pub fn issue_mfa_setup(
        &self,
        user_id: &str,
        email: &str,
        client: &ClientMeta,
    ) -> AuthResult<String> {
        let claims = self.base_claims(user_id, TokenKind::MfaSetup, self.setup_ttl);
        let claims = Claims {
            email: Some(email.to_string()),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
            ..claims
        };
        self.sign(&claims, &self.access_encoding)
    }

    /// Validate and decode a token, insisting on an expected kind.
    ///
    /// Fails closed: bad signature, expiry, malformed payload, and kind
    /// mismatch all surface as `InvalidToken`.
    pub fn verify(&self, token: &str, expected: TokenKind) -> AuthResult<Claims> {
        let decoding_key = match expected {
            TokenKind::Refresh => &self.refresh_decoding,
            _ => &self.access_decoding,
        };

        let claims = decode::<Claims>(token, decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)?;

        if claims.token_type != expected {
            return Err(AuthError::InvalidToken);
        }

        Ok(claims)
    }

    /// Hex SHA-256 digest of a token, stored in the session record instead of
    /// the token itself.
    pub fn fingerprint(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn base_claims(&self, user_id: &str, kind: TokenKind, ttl: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            sub: user_id.to_string(),
            token_type: kind,
            session_id: None,
            roles: Vec::new(),
            permissions: Vec::new(),
            mfa_verified: false,
            email: None,
            ip_address: None,
            user_agent: None,
            exp: (now + ttl).timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    fn sign(&self, claims: &Claims, key: &EncodingKey) -> AuthResult<String> {
        encode(&Header::default(), claims, key)
            .map_err(|e| AuthError::internal(format!("Token generation failed: {}", e)))
    }
}
