//! Account lockout guard.
//!
//! Tracks consecutive failed password attempts per user and enforces a
//! temporary lock once the configured threshold is reached. While locked,
//! password comparison is skipped entirely, so the lock leaks no timing
//! signal and wastes no hashing work.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::database::models::User;
use crate::errors::{AuthError, AuthResult};
use crate::repositories::user_repository::UserRepository;

pub struct LockoutGuard {
    threshold: u32,
    window_minutes: i64,
}

impl LockoutGuard {
    pub fn new(threshold: u32, window_minutes: i64) -> Self {
        Self {
            threshold,
            window_minutes,
        }
    }

    /// Gate applied before any password comparison.
    pub fn ensure_not_locked(&self, user: &User) -> AuthResult<()> {
        if let Some(locked_until) = user.locked_until {
            if locked_until > Utc::now() {
                return Err(AuthError::AccountLocked);
            }
        }
        Ok(())
    }

    /// Registers a failed password attempt. The counter increment is atomic
    /// at the database, so concurrent failures never under-count; the lock
    /// starts the moment the returned count reaches the threshold.
    pub async fn register_failure(&self, pool: &SqlitePool, user_id: &str) -> AuthResult<()> {
        let repo = UserRepository::new(pool);
        let attempts = repo.record_failed_attempt(user_id).await?;

        if attempts >= self.threshold as i64 {
            let until = Utc::now() + Duration::minutes(self.window_minutes);
            repo.lock_until(user_id, until).await?;
        }

        Ok(())
    }

    /// A successful password check clears the counter and any lock.
    pub async fn reset(&self, pool: &SqlitePool, user_id: &str) -> AuthResult<()> {
        UserRepository::new(pool).reset_login_state(user_id).await?;
        Ok(())
    }
}
