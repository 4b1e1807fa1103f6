//! Effective-permission resolution across simultaneously held roles.
//!
//! A user's access is the set union of every permission reachable through
//! currently-valid, active role assignments whose role is itself active.
//! Access is strictly additive: no role can subtract a permission another
//! role grants.

use sqlx::SqlitePool;

use crate::errors::AuthResult;
use crate::repositories::role_repository::RoleRepository;

/// Snapshot of a user's roles and permissions at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAccess {
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl ResolvedAccess {
    pub fn has_role(&self, code: &str) -> bool {
        self.roles.iter().any(|r| r == code)
    }

    pub fn has_permission(&self, code: &str) -> bool {
        self.permissions.iter().any(|p| p == code)
    }

    pub fn has_any_permission(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.has_permission(code))
    }

    pub fn has_all_permissions(&self, codes: &[&str]) -> bool {
        codes.iter().all(|code| self.has_permission(code))
    }

    /// True when any held role appears in the given enforcement list.
    pub fn intersects(&self, role_codes: &[String]) -> bool {
        self.roles.iter().any(|r| role_codes.contains(r))
    }
}

pub struct PermissionResolver<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads the user's currently-valid role codes and the deduplicated
    /// union of permissions those roles grant.
    pub async fn resolve(&self, user_id: &str) -> AuthResult<ResolvedAccess> {
        let repo = RoleRepository::new(self.pool);
        let now = chrono::Utc::now();

        let roles = repo.valid_role_codes(user_id, now).await?;
        let permissions = repo.valid_permission_codes(user_id, now).await?;

        Ok(ResolvedAccess { roles, permissions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::user_repository::{CreateUser, UserRepository};
    use chrono::{Duration, Utc};

    fn access(roles: &[&str], permissions: &[&str]) -> ResolvedAccess {
        ResolvedAccess {
            roles: roles.iter().map(|s| s.to_string()).collect(),
            permissions: permissions.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn derived_checks() {
        let access = access(&["doctor"], &["patients:*:read", "patients:*:write"]);

        assert!(access.has_permission("patients:*:read"));
        assert!(!access.has_permission("billing:*:write"));
        assert!(access.has_any_permission(&["billing:*:write", "patients:*:read"]));
        assert!(access.has_all_permissions(&["patients:*:read", "patients:*:write"]));
        assert!(!access.has_all_permissions(&["patients:*:read", "billing:*:write"]));
        assert!(access.intersects(&["doctor".to_string(), "admin".to_string()]));
        assert!(!access.intersects(&["admin".to_string()]));
    }

    async fn seed_user(pool: &SqlitePool) -> String {
        let users = UserRepository::new(pool);
        users
            .create_user(CreateUser {
                email: "resolver@clinic.test".into(),
                first_name: "Res".into(),
                last_name: "Olver".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn union_across_roles_counts_each_permission_once() {
        let pool = test_pool().await;
        let roles = RoleRepository::new(&pool);
        let user_id = seed_user(&pool).await;

        let doctor = roles.create_role("doctor", "Doctor").await.unwrap();
        let triage = roles.create_role("triage", "Triage").await.unwrap();
        let read = roles.create_permission("patients:*:read").await.unwrap();
        let write = roles.create_permission("patients:*:write").await.unwrap();
        roles.grant_permission(&doctor, &read).await.unwrap();
        roles.grant_permission(&doctor, &write).await.unwrap();
        // Both roles grant read; the union must count it once.
        roles.grant_permission(&triage, &read).await.unwrap();

        let now = Utc::now();
        roles.assign_role(&user_id, &doctor, now - Duration::days(1), None).await.unwrap();
        roles.assign_role(&user_id, &triage, now - Duration::days(1), None).await.unwrap();

        let resolved = PermissionResolver::new(&pool).resolve(&user_id).await.unwrap();
        assert_eq!(resolved.roles, vec!["doctor", "triage"]);
        assert_eq!(resolved.permissions, vec!["patients:*:read", "patients:*:write"]);
    }

    #[tokio::test]
    async fn expired_revoked_and_inactive_assignments_contribute_nothing() {
        let pool = test_pool().await;
        let roles = RoleRepository::new(&pool);
        let user_id = seed_user(&pool).await;

        let doctor = roles.create_role("doctor", "Doctor").await.unwrap();
        let admin = roles.create_role("admin", "Administrator").await.unwrap();
        let audit = roles.create_role("auditor", "Auditor").await.unwrap();
        let read = roles.create_permission("patients:*:read").await.unwrap();
        let manage = roles.create_permission("users:*:manage").await.unwrap();
        let export = roles.create_permission("reports:*:export").await.unwrap();
        roles.grant_permission(&doctor, &read).await.unwrap();
        roles.grant_permission(&admin, &manage).await.unwrap();
        roles.grant_permission(&audit, &export).await.unwrap();

        let now = Utc::now();
        roles
            .assign_role(&user_id, &doctor, now - Duration::days(1), None)
            .await
            .unwrap();
        // Expired window.
        roles
            .assign_role(&user_id, &admin, now - Duration::days(30), Some(now - Duration::days(1)))
            .await
            .unwrap();
        // Revoked assignment.
        let revoked = roles
            .assign_role(&user_id, &audit, now - Duration::days(1), None)
            .await
            .unwrap();
        roles.revoke_assignment(&revoked).await.unwrap();

        let resolved = PermissionResolver::new(&pool).resolve(&user_id).await.unwrap();
        assert_eq!(resolved.roles, vec!["doctor"]);
        assert_eq!(resolved.permissions, vec!["patients:*:read"]);
    }

    #[tokio::test]
    async fn inactive_role_is_filtered_even_with_a_live_assignment() {
        let pool = test_pool().await;
        let roles = RoleRepository::new(&pool);
        let user_id = seed_user(&pool).await;

        let doctor = roles.create_role("doctor", "Doctor").await.unwrap();
        let read = roles.create_permission("patients:*:read").await.unwrap();
        roles.grant_permission(&doctor, &read).await.unwrap();
        roles
            .assign_role(&user_id, &doctor, Utc::now() - Duration::days(1), None)
            .await
            .unwrap();

        sqlx::query("UPDATE roles SET is_active = 0 WHERE id = ?")
            .bind(&doctor)
            .execute(&pool)
            .await
            .unwrap();

        let resolved = PermissionResolver::new(&pool).resolve(&user_id).await.unwrap();
        assert!(resolved.roles.is_empty());
        assert!(resolved.permissions.is_empty());
    }
}
