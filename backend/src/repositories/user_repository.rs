//! Database repository for user credential-state operations.
//!
//! Provides the reads and writes the auth subsystem needs on the User record:
//! lookup, lockout counters, MFA secret/backup-code state, and password
//! updates. Broader user administration lives outside this subsystem.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::User;

/// Parameters for inserting a user record (registration is handled elsewhere;
/// this exists for bootstrap and test fixtures).
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, is_active, \
     mfa_enabled, mfa_secret, backup_codes, failed_login_attempts, locked_until, \
     last_login_at, department_id, employee_id, created_at, updated_at";

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, password_hash, is_active, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(user.email.to_lowercase())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        let created = self.get_user_by_id(&id).await?;
        created.ok_or_else(|| anyhow::anyhow!("user {} missing after insert", id))
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Lookup by email; the stored email is always lower-cased.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Atomically increments the failed-attempt counter and returns the new
    /// count. Two concurrent failures both land; neither under-counts.
    pub async fn record_failed_attempt(&self, id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "UPDATE users SET failed_login_attempts = failed_login_attempts + 1, \
             updated_at = ? WHERE id = ? RETURNING failed_login_attempts",
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    pub async fn lock_until(&self, id: &str, until: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET locked_until = ?, updated_at = ? WHERE id = ?")
            .bind(until)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Successful password check: counter back to zero, lock cleared.
    pub async fn reset_login_state(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn record_login(&self, id: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Stores a freshly generated secret and backup-code digests without
    /// enabling MFA. Overwrites any prior pending state; the stored secret is
    /// authoritative over anything a caller cached.
    pub async fn set_pending_mfa(
        &self,
        id: &str,
        secret: &str,
        backup_codes_json: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET mfa_secret = ?, backup_codes = ?, mfa_enabled = 0, \
             updated_at = ? WHERE id = ?",
        )
        .bind(secret)
        .bind(backup_codes_json)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn enable_mfa(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE users SET mfa_enabled = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn disable_mfa(&self, id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET mfa_enabled = 0, mfa_secret = NULL, backup_codes = NULL, \
             updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replaces the stored backup-code digest set (after a single-use match).
    pub async fn set_backup_codes(&self, id: &str, backup_codes_json: &str) -> Result<()> {
        sqlx::query("UPDATE users SET backup_codes = ?, updated_at = ? WHERE id = ?")
            .bind(backup_codes_json)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    pub async fn update_password_hash(&self, id: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
