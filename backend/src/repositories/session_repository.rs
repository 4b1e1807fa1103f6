//! Database repository for session records.
//!
//! One row per completed login. Rows are the authoritative revocation
//! source: middleware and the refresh flow point-read them on every request
//! so a revoked session is rejected immediately, with no caching in between.

use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::database::models::{NewSession, Session};

pub struct SessionRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

const SESSION_COLUMNS: &str = "id, user_id, access_token_hash, refresh_token_hash, mfa_verified, \
     ip_address, user_agent, expires_at, revoked_at, revoked_reason, last_activity_at, created_at";

impl<'a> SessionRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, session: NewSession) -> Result<Session> {
        let id = session.id;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO sessions (id, user_id, access_token_hash, refresh_token_hash, \
             mfa_verified, ip_address, user_agent, expires_at, last_activity_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&session.user_id)
        .bind(&session.access_token_hash)
        .bind(&session.refresh_token_hash)
        .bind(session.mfa_verified)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        let created = self.find_by_id(&id).await?;
        created.ok_or_else(|| anyhow::anyhow!("session {} missing after insert", id))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    pub async fn find_by_refresh_fingerprint(&self, hash: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE refresh_token_hash = ?"
        ))
        .bind(hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(session)
    }

    /// Bumps `last_activity_at` and stores the fingerprint of the newly
    /// minted access token.
    pub async fn touch(&self, id: &str, access_token_hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET last_activity_at = ?, access_token_hash = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(access_token_hash)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    pub async fn revoke(&self, id: &str, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE sessions SET revoked_at = ?, revoked_reason = ? \
             WHERE id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Revokes every live session a user holds, across all devices.
    pub async fn revoke_all(&self, user_id: &str, reason: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET revoked_at = ?, revoked_reason = ? \
             WHERE user_id = ? AND revoked_at IS NULL",
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
