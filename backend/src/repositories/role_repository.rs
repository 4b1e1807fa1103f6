//! Database repository for roles, permissions, and role assignments.
//!
//! Read side feeds the permission resolver: only assignments that are active
//! and inside their validity window, through roles that are themselves
//! active, contribute anything. Write side covers the administrative
//! grant/revoke operations; revocation flips flags rather than deleting rows
//! so the audit trail is preserved.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::Role;

pub struct RoleRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Role codes currently granted to a user: assignment active, `now`
    /// inside `[valid_from, valid_until]`, role active.
    pub async fn valid_role_codes(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<String>> {
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT r.code FROM role_assignments ra \
             JOIN roles r ON ra.role_id = r.id \
             WHERE ra.user_id = ? AND ra.is_active = 1 AND r.is_active = 1 \
             AND ra.valid_from <= ? \
             AND (ra.valid_until IS NULL OR ra.valid_until >= ?) \
             ORDER BY r.code",
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(codes)
    }

    /// Union of permission codes reachable through the user's currently-valid
    /// roles. A permission granted by two roles appears once.
    pub async fn valid_permission_codes(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let codes: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT p.code FROM role_assignments ra \
             JOIN roles r ON ra.role_id = r.id \
             JOIN role_permissions rp ON rp.role_id = r.id \
             JOIN permissions p ON p.id = rp.permission_id \
             WHERE ra.user_id = ? AND ra.is_active = 1 AND r.is_active = 1 \
             AND ra.valid_from <= ? \
             AND (ra.valid_until IS NULL OR ra.valid_until >= ?) \
             ORDER BY p.code",
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(codes)
    }

    pub async fn get_role_by_code(&self, code: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, code, name, is_active, created_at FROM roles WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    pub async fn create_role(&self, code: &str, name: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO roles (id, code, name, is_active, created_at) VALUES (?, ?, ?, 1, ?)")
            .bind(&id)
            .bind(code)
            .bind(name)
            .bind(Utc::now())
            .execute(self.pool)
            .await?;

        Ok(id)
    }

    pub async fn create_permission(&self, code: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO permissions (id, code, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(code)
            .bind(Utc::now())
            .execute(self.pool)
            .await?;

        Ok(id)
    }

    pub async fn grant_permission(&self, role_id: &str, permission_id: &str) -> Result<()> {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(permission_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Grants a role for a validity window; `valid_until = None` is
    /// open-ended.
    pub async fn assign_role(
        &self,
        user_id: &str,
        role_id: &str,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO role_assignments (id, user_id, role_id, is_active, valid_from, \
             valid_until, created_at) VALUES (?, ?, ?, 1, ?, ?, ?)",
        )
        .bind(&id)
        .bind(user_id)
        .bind(role_id)
        .bind(valid_from)
        .bind(valid_until)
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// Revokes an assignment in place; the row stays for auditing.
    pub async fn revoke_assignment(&self, assignment_id: &str) -> Result<()> {
        sqlx::query(
            "UPDATE role_assignments SET is_active = 0, revoked_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(assignment_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
