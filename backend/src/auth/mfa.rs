//! Multi-factor authentication manager.
//!
//! Issues TOTP secrets and single-use backup codes, verifies 6-digit codes
//! with a ±1 time-step tolerance, and flips the user's MFA state. Enrollment
//! never enables MFA by itself: `mfa_enabled` only flips after the first
//! successful verification, so a botched authenticator scan cannot lock the
//! user out. The stored secret is authoritative; a re-enroll invalidates any
//! code derived from an earlier secret.

use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::database::models::User;
use crate::errors::{AuthError, AuthResult};
use crate::repositories::user_repository::UserRepository;

const BACKUP_CODE_COUNT: usize = 10;
const TOTP_DIGITS: usize = 6;
const TOTP_STEP: u64 = 30;
/// Accepted clock drift, in time steps, on either side of now.
const TOTP_SKEW: u8 = 1;

/// How a login-time code matched; backup-code use is audited distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaMethod {
    Totp,
    BackupCode,
}

/// Enrollment payload returned to the user exactly once.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaEnrollment {
    pub secret: String,
    pub otpauth_url: String,
    pub qr_code_data_url: String,
    pub backup_codes: Vec<String>,
}

pub struct MfaManager<'a> {
    pool: &'a SqlitePool,
    issuer: String,
}

impl<'a> MfaManager<'a> {
    pub fn new(pool: &'a SqlitePool, issuer: String) -> Self {
        Self { pool, issuer }
    }

    /// Generates a fresh secret and backup codes and stores them pending.
    /// Overwrites prior pending state; fails on an already-enabled account.
    pub async fn enroll(&self, user: &User) -> AuthResult<MfaEnrollment> {
        if user.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }

        let secret_b32 = Secret::generate_secret().to_encoded().to_string();
        let totp = self.build_totp(&secret_b32, &user.email)?;

        let backup_codes = generate_backup_codes();
        let hashes: Vec<String> = backup_codes.iter().map(|c| hash_code(c)).collect();
        let hashes_json = serde_json::to_string(&hashes)
            .map_err(|e| AuthError::internal(format!("Backup code encoding failed: {}", e)))?;

        UserRepository::new(self.pool)
            .set_pending_mfa(&user.id, &secret_b32, &hashes_json)
            .await?;

        let qr = totp
            .get_qr_base64()
            .map_err(|e| AuthError::internal(format!("QR code generation failed: {}", e)))?;

        Ok(MfaEnrollment {
            secret: secret_b32,
            otpauth_url: totp.get_url(),
            qr_code_data_url: format!("data:image/png;base64,{}", qr),
            backup_codes,
        })
    }

    /// Verifies the first code against the pending secret and enables MFA.
    pub async fn verify_setup(&self, user: &User, code: &str) -> AuthResult<()> {
        if user.mfa_enabled {
            return Err(AuthError::MfaAlreadyEnabled);
        }

        let secret = user.mfa_secret.as_deref().ok_or(AuthError::MfaNotEnabled)?;
        if !self.check_totp(secret, &user.email, code)? {
            return Err(AuthError::InvalidMfaCode);
        }

        UserRepository::new(self.pool).enable_mfa(&user.id).await?;
        Ok(())
    }

    /// Checks a login-time code against TOTP first, then the backup-code
    /// set. A matched backup code is removed immediately (single use).
    pub async fn verify_code(&self, user: &User, code: &str) -> AuthResult<MfaMethod> {
        if !user.mfa_enabled {
            return Err(AuthError::MfaNotEnabled);
        }

        let secret = user.mfa_secret.as_deref().ok_or(AuthError::MfaNotEnabled)?;
        if self.check_totp(secret, &user.email, code)? {
            return Ok(MfaMethod::Totp);
        }

        if self.consume_backup_code(user, code).await? {
            return Ok(MfaMethod::BackupCode);
        }

        Err(AuthError::InvalidMfaCode)
    }

    /// Clears all MFA state after a valid TOTP or backup code.
    pub async fn disable(&self, user: &User, code: &str) -> AuthResult<()> {
        self.verify_code(user, code).await?;
        UserRepository::new(self.pool).disable_mfa(&user.id).await?;
        Ok(())
    }

    fn check_totp(&self, secret_b32: &str, account: &str, code: &str) -> AuthResult<bool> {
        if code.len() != TOTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
            return Ok(false);
        }

        let totp = self.build_totp(secret_b32, account)?;
        totp.check_current(code)
            .map_err(|e| AuthError::internal(format!("System time error: {}", e)))
    }

    fn build_totp(&self, secret_b32: &str, account: &str) -> AuthResult<TOTP> {
        let secret = Secret::Encoded(secret_b32.to_string())
            .to_bytes()
            .map_err(|_| AuthError::internal("Stored TOTP secret is malformed"))?;

        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| AuthError::internal(format!("TOTP construction failed: {}", e)))
    }

    /// Removes the matching digest from the stored set and persists the
    /// remainder. Returns false when nothing matched.
    async fn consume_backup_code(&self, user: &User, code: &str) -> AuthResult<bool> {
        let mut hashes = user.backup_code_hashes();
        if hashes.is_empty() {
            return Ok(false);
        }

        let digest = hash_code(code);
        let before = hashes.len();
        hashes.retain(|h| h != &digest);
        if hashes.len() == before {
            return Ok(false);
        }

        let remaining = serde_json::to_string(&hashes)
            .map_err(|e| AuthError::internal(format!("Backup code encoding failed: {}", e)))?;
        UserRepository::new(self.pool)
            .set_backup_codes(&user.id, &remaining)
            .await?;

        Ok(true)
    }
}

fn generate_backup_codes() -> Vec<String> {
    let mut rng = rand::thread_rng();
    (0..BACKUP_CODE_COUNT)
        .map(|_| format!("{:08x}", rng.r#gen::<u32>()))
        .collect()
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::user_repository::CreateUser;

    async fn seed_user(pool: &SqlitePool) -> User {
        UserRepository::new(pool)
            .create_user(CreateUser {
                email: "mfa@clinic.test".into(),
                first_name: "Em".into(),
                last_name: "Effay".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
    }

    async fn reload(pool: &SqlitePool, id: &str) -> User {
        UserRepository::new(pool)
            .get_user_by_id(id)
            .await
            .unwrap()
            .unwrap()
    }

    fn current_code(manager: &MfaManager<'_>, secret: &str, account: &str) -> String {
        manager
            .build_totp(secret, account)
            .unwrap()
            .generate_current()
            .unwrap()
    }

    #[tokio::test]
    async fn enroll_then_verify_setup_enables_mfa() {
        let pool = test_pool().await;
        let manager = MfaManager::new(&pool, "CliniGate".into());
        let user = seed_user(&pool).await;

        let enrollment = manager.enroll(&user).await.unwrap();
        assert_eq!(enrollment.backup_codes.len(), BACKUP_CODE_COUNT);
        assert!(enrollment.otpauth_url.starts_with("otpauth://totp/"));
        assert!(enrollment.qr_code_data_url.starts_with("data:image/png;base64,"));

        let pending = reload(&pool, &user.id).await;
        assert!(!pending.mfa_enabled);

        let code = current_code(&manager, &enrollment.secret, &user.email);
        manager.verify_setup(&pending, &code).await.unwrap();

        let enabled = reload(&pool, &user.id).await;
        assert!(enabled.mfa_enabled);

        // Second setup verification against the enabled account must fail.
        assert!(matches!(
            manager.verify_setup(&enabled, &code).await,
            Err(AuthError::MfaAlreadyEnabled)
        ));
    }

    #[tokio::test]
    async fn stale_secret_fails_after_re_enroll() {
        let pool = test_pool().await;
        let manager = MfaManager::new(&pool, "CliniGate".into());
        let user = seed_user(&pool).await;

        let first = manager.enroll(&user).await.unwrap();
        let user = reload(&pool, &user.id).await;
        let second = manager.enroll(&user).await.unwrap();
        assert_ne!(first.secret, second.secret);

        // A code from the first secret must fail closed against the stored one.
        let stale = current_code(&manager, &first.secret, &user.email);
        let user = reload(&pool, &user.id).await;
        let result = manager.verify_setup(&user, &stale).await;
        assert!(matches!(result, Err(AuthError::InvalidMfaCode)));
    }

    #[tokio::test]
    async fn backup_code_is_single_use() {
        let pool = test_pool().await;
        let manager = MfaManager::new(&pool, "CliniGate".into());
        let user = seed_user(&pool).await;

        let enrollment = manager.enroll(&user).await.unwrap();
        let user = reload(&pool, &user.id).await;
        let code = current_code(&manager, &enrollment.secret, &user.email);
        manager.verify_setup(&user, &code).await.unwrap();

        let user = reload(&pool, &user.id).await;
        let backup = enrollment.backup_codes[0].clone();
        assert_eq!(
            manager.verify_code(&user, &backup).await.unwrap(),
            MfaMethod::BackupCode
        );

        let user = reload(&pool, &user.id).await;
        assert_eq!(user.backup_code_hashes().len(), BACKUP_CODE_COUNT - 1);
        assert!(matches!(
            manager.verify_code(&user, &backup).await,
            Err(AuthError::InvalidMfaCode)
        ));
    }

    #[tokio::test]
    async fn disable_requires_a_valid_code_and_clears_state() {
        let pool = test_pool().await;
        let manager = MfaManager::new(&pool, "CliniGate".into());
        let user = seed_user(&pool).await;

        let enrollment = manager.enroll(&user).await.unwrap();
        let user = reload(&pool, &user.id).await;
        let code = current_code(&manager, &enrollment.secret, &user.email);
        manager.verify_setup(&user, &code).await.unwrap();

        let user = reload(&pool, &user.id).await;
        assert!(matches!(
            manager.disable(&user, "000000").await,
            Err(AuthError::InvalidMfaCode)
        ));

        let code = current_code(&manager, &enrollment.secret, &user.email);
        manager.disable(&user, &code).await.unwrap();

        let cleared = reload(&pool, &user.id).await;
        assert!(!cleared.mfa_enabled);
        assert!(cleared.mfa_secret.is_none());
        assert!(cleared.backup_codes.is_none());
    }
}
