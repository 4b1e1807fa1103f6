//! Core business logic for the authentication system.
//!
//! `AuthService` is the login orchestrator: it composes the credential
//! store, password hasher, lockout guard, permission resolver, MFA manager,
//! token issuer, and session store into the login / refresh / logout /
//! password-change state machine. Every collaborator is injected at
//! construction; nothing is resolved inside a request path.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::lockout::LockoutGuard;
use crate::auth::mfa::{MfaEnrollment, MfaManager, MfaMethod};
use crate::auth::models::*;
use crate::auth::permissions::{PermissionResolver, ResolvedAccess};
use crate::config::Config;
use crate::database::models::{NewSession, User};
use crate::errors::{AuthError, AuthResult};
use crate::repositories::session_repository::SessionRepository;
use crate::repositories::user_repository::UserRepository;
use crate::services::audit_service::{AuditEvent, AuditSink, DomainEvent, EventPublisher};
use crate::utils::jwt::{ClientMeta, TokenIssuer, TokenKind};
use crate::utils::password;

pub struct AuthService<'a> {
    pool: &'a SqlitePool,
    config: Config,
    tokens: TokenIssuer,
    mfa: MfaManager<'a>,
    lockout: LockoutGuard,
    audit: AuditSink,
    events: EventPublisher,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService instance with config from the environment.
    pub fn new(pool: &'a SqlitePool) -> AuthResult<Self> {
        let config = Config::from_env()
            .map_err(|e| AuthError::internal(format!("Config error: {}", e)))?;
        Ok(Self::with_config(pool, config))
    }

    pub fn with_config(pool: &'a SqlitePool, config: Config) -> Self {
        let tokens = TokenIssuer::new(&config);
        let mfa = MfaManager::new(pool, config.totp_issuer.clone());
        let lockout = LockoutGuard::new(config.lockout_threshold, config.lockout_window_minutes);

        AuthService {
            pool,
            config,
            tokens,
            mfa,
            lockout,
            audit: AuditSink,
            events: EventPublisher,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn refresh_ttl_seconds(&self) -> u64 {
        self.tokens.refresh_ttl_seconds()
    }

    pub fn cookie_secure(&self) -> bool {
        self.config.cookie_secure
    }

    /// Authenticate a user and either complete the login or hand back an MFA
    /// bridge token. No session exists until the flow fully completes.
    pub async fn login(
        &self,
        request: LoginRequest,
        client: &ClientMeta,
    ) -> AuthResult<LoginOutcome> {
        validate_payload(&request)?;
        let email = request.email.trim().to_lowercase();

        let users = UserRepository::new(self.pool);
        let user = match users.get_user_by_email(&email).await? {
            // Missing and inactive collapse into one generic failure so the
            // endpoint cannot be used to enumerate accounts.
            Some(user) if user.is_active => user,
            _ => {
                self.audit.record(
                    &AuditEvent::failure("login", "invalid_credentials")
                        .email(&email)
                        .ip(client.ip_address.clone()),
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Locked accounts skip password comparison entirely.
        if self.lockout.ensure_not_locked(&user).is_err() {
            self.audit.record(
                &AuditEvent::failure("login", "account_locked")
                    .user(&user.id)
                    .ip(client.ip_address.clone()),
            );
            return Err(AuthError::AccountLocked);
        }

        if !password::verify_password(&request.password, &user.password_hash)? {
            self.lockout.register_failure(self.pool, &user.id).await?;
            self.audit.record(
                &AuditEvent::failure("login", "invalid_credentials")
                    .user(&user.id)
                    .ip(client.ip_address.clone()),
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.lockout.reset(self.pool, &user.id).await?;

        let access = PermissionResolver::new(self.pool).resolve(&user.id).await?;

        if access.intersects(&self.config.mfa_required_roles) && !user.mfa_enabled {
            let temp_token = self.tokens.issue_mfa_setup(&user.id, &user.email, client)?;
            self.audit.record(
                &AuditEvent::success("login_mfa_setup_required")
                    .user(&user.id)
                    .ip(client.ip_address.clone()),
            );
            return Ok(LoginOutcome::MfaSetupRequired { temp_token });
        }

        if user.mfa_enabled {
            let temp_token = self.tokens.issue_mfa_challenge(&user.id, &user.email, client)?;
            self.audit.record(
                &AuditEvent::success("login_mfa_challenge")
                    .user(&user.id)
                    .ip(client.ip_address.clone()),
            );
            return Ok(LoginOutcome::MfaRequired { temp_token });
        }

        let auth = self.complete_login(&user, &access, client, false).await?;
        Ok(LoginOutcome::Complete(Box::new(auth)))
    }

    /// Completes an MFA step: setup verification when MFA is not yet
    /// enabled, a login challenge when it is. Accepts setup, challenge, or
    /// access tokens; anything else is a type-confusion failure.
    pub async fn verify_mfa(
        &self,
        temp_token: &str,
        code: &str,
        client: &ClientMeta,
    ) -> AuthResult<CompletedAuth> {
        let claims = self.verify_any(
            temp_token,
            &[TokenKind::MfaSetup, TokenKind::MfaChallenge, TokenKind::Access],
        )?;
        let user = self.load_active_user(&claims.sub).await?;

        if user.mfa_enabled {
            match self.mfa.verify_code(&user, code).await {
                Ok(MfaMethod::Totp) => {
                    self.audit
                        .record(&AuditEvent::success("mfa_verify_totp").user(&user.id));
                }
                Ok(MfaMethod::BackupCode) => {
                    self.audit
                        .record(&AuditEvent::success("mfa_verify_backup_code").user(&user.id));
                }
                Err(err) => {
                    self.audit.record(
                        &AuditEvent::failure("mfa_verify", "invalid_mfa_code").user(&user.id),
                    );
                    return Err(err);
                }
            }
        } else {
            if let Err(err) = self.mfa.verify_setup(&user, code).await {
                self.audit
                    .record(&AuditEvent::failure("mfa_setup_verify", err.code()).user(&user.id));
                return Err(err);
            }
            self.audit
                .record(&AuditEvent::success("mfa_setup_verify").user(&user.id));
            self.events.publish(&DomainEvent::MfaEnabled {
                user_id: user.id.clone(),
            });
        }

        let access = PermissionResolver::new(self.pool).resolve(&user.id).await?;
        self.complete_login(&user, &access, client, true).await
    }

    /// Starts MFA enrollment from a logged-in session or a setup token.
    pub async fn enroll_mfa(&self, token: &str) -> AuthResult<MfaEnrollment> {
        let claims = self.verify_any(token, &[TokenKind::Access, TokenKind::MfaSetup])?;
        let user = self.load_active_user(&claims.sub).await?;
        self.mfa.enroll(&user).await
    }

    pub async fn disable_mfa(&self, user_id: &str, code: &str) -> AuthResult<()> {
        let user = self.load_active_user(user_id).await?;
        match self.mfa.disable(&user, code).await {
            Ok(()) => {
                self.audit
                    .record(&AuditEvent::success("mfa_disable").user(user_id));
                self.events.publish(&DomainEvent::MfaDisabled {
                    user_id: user_id.to_string(),
                });
                Ok(())
            }
            Err(err) => {
                self.audit
                    .record(&AuditEvent::failure("mfa_disable", err.code()).user(user_id));
                Err(err)
            }
        }
    }

    /// Exchange a refresh token for a new access token on the same session.
    /// The session record is the authoritative revocation source; the token
    /// signature alone is never sufficient. Refresh tokens are not rotated.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedAuth> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;

        let sessions = SessionRepository::new(self.pool);
        let session = sessions
            .find_by_refresh_fingerprint(&TokenIssuer::fingerprint(refresh_token))
            .await?
            .ok_or(AuthError::SessionRevokedOrExpired)?;

        if session.is_revoked() || session.is_expired(Utc::now()) {
            self.audit.record(
                &AuditEvent::failure("refresh", "session_revoked_or_expired")
                    .user(&session.user_id)
                    .session(&session.id),
            );
            return Err(AuthError::SessionRevokedOrExpired);
        }

        // Forged or stale token: signature verified but subject disagrees
        // with the stored session.
        if session.user_id != claims.sub {
            self.audit
                .record(&AuditEvent::failure("refresh", "subject_mismatch").session(&session.id));
            return Err(AuthError::InvalidToken);
        }

        let user = match self.load_active_user(&session.user_id).await {
            Ok(user) => user,
            Err(_) => return Err(AuthError::SessionRevokedOrExpired),
        };

        let access = PermissionResolver::new(self.pool).resolve(&user.id).await?;
        let access_token = self.tokens.issue_access(
            &user.id,
            &session.id,
            access.roles.clone(),
            access.permissions.clone(),
            session.mfa_verified,
        )?;

        sessions
            .touch(&session.id, &TokenIssuer::fingerprint(&access_token))
            .await?;

        self.audit.record(
            &AuditEvent::success("refresh")
                .user(&user.id)
                .session(&session.id),
        );

        Ok(RefreshedAuth {
            user: UserSummary::new(&user, &access),
            session_id: session.id,
            expires_in: self.tokens.access_ttl_seconds(),
            access_token,
        })
    }

    /// Revokes the presented session. Accepts an access token or an MFA
    /// challenge token (a challenge has no session yet; revocation is a
    /// no-op but the logout still succeeds).
    pub async fn logout(&self, token: &str, reason: Option<String>) -> AuthResult<()> {
        let claims = self.verify_any(token, &[TokenKind::Access, TokenKind::MfaChallenge])?;
        let reason = reason.unwrap_or_else(|| "logout".to_string());

        if let Some(session_id) = &claims.session_id {
            SessionRepository::new(self.pool)
                .revoke(session_id, &reason)
                .await?;
            self.events.publish(&DomainEvent::UserLoggedOut {
                user_id: claims.sub.clone(),
                session_id: session_id.clone(),
            });
            self.audit.record(
                &AuditEvent::success("logout")
                    .user(&claims.sub)
                    .session(session_id),
            );
        } else {
            self.audit
                .record(&AuditEvent::success("logout").user(&claims.sub));
        }

        Ok(())
    }

    /// Changes the password and revokes every session the user holds,
    /// including ones created from other devices.
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> AuthResult<()> {
        validate_payload(&request)?;
        let user = self.load_active_user(user_id).await?;

        if !password::verify_password(&request.current_password, &user.password_hash)? {
            self.audit.record(
                &AuditEvent::failure("password_change", "invalid_credentials").user(user_id),
            );
            return Err(AuthError::InvalidCredentials);
        }

        if password::verify_password(&request.new_password, &user.password_hash)? {
            return Err(AuthError::PasswordReuse);
        }

        password::validate_strength(&request.new_password)?;

        let new_hash = password::hash_password(&request.new_password)?;
        UserRepository::new(self.pool)
            .update_password_hash(user_id, &new_hash)
            .await?;

        let revoked = SessionRepository::new(self.pool)
            .revoke_all(user_id, "password_change")
            .await?;

        self.audit
            .record(&AuditEvent::success("password_change").user(user_id));
        self.events.publish(&DomainEvent::PasswordChanged {
            user_id: user_id.to_string(),
            sessions_revoked: revoked,
        });

        Ok(())
    }

    /// Current-user projection for `/me`.
    pub async fn me(&self, user_id: &str) -> AuthResult<UserSummary> {
        let user = self.load_active_user(user_id).await?;
        let access = PermissionResolver::new(self.pool).resolve(&user.id).await?;
        Ok(UserSummary::new(&user, &access))
    }

    /// Step 7 of the login state machine: mint both tokens, persist the
    /// session, stamp `last_login_at`, and emit the audit/domain events.
    async fn complete_login(
        &self,
        user: &User,
        access: &ResolvedAccess,
        client: &ClientMeta,
        mfa_verified: bool,
    ) -> AuthResult<CompletedAuth> {
        let session_id = Uuid::new_v4().to_string();

        let access_token = self.tokens.issue_access(
            &user.id,
            &session_id,
            access.roles.clone(),
            access.permissions.clone(),
            mfa_verified,
        )?;
        let refresh_token = self.tokens.issue_refresh(&user.id, &session_id)?;

        let sessions = SessionRepository::new(self.pool);
        let session = sessions
            .create(NewSession {
                id: session_id,
                user_id: user.id.clone(),
                access_token_hash: TokenIssuer::fingerprint(&access_token),
                refresh_token_hash: TokenIssuer::fingerprint(&refresh_token),
                mfa_verified,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                expires_at: Utc::now()
                    + Duration::seconds(self.tokens.refresh_ttl_seconds() as i64),
            })
            .await?;

        UserRepository::new(self.pool).record_login(&user.id).await?;

        self.audit.record(
            &AuditEvent::success("login")
                .user(&user.id)
                .session(&session.id)
                .ip(client.ip_address.clone()),
        );
        self.events.publish(&DomainEvent::UserLoggedIn {
            user_id: user.id.clone(),
            session_id: session.id.clone(),
        });

        Ok(CompletedAuth {
            user: UserSummary::new(user, access),
            session_id: session.id,
            expires_in: self.tokens.access_ttl_seconds(),
            access_token,
            refresh_token,
        })
    }

    /// Accepts the first kind that verifies; fails closed otherwise.
    fn verify_any(
        &self,
        token: &str,
        kinds: &[TokenKind],
    ) -> AuthResult<crate::utils::jwt::Claims> {
        for kind in kinds {
            if let Ok(claims) = self.tokens.verify(token, *kind) {
                return Ok(claims);
            }
        }
        Err(AuthError::InvalidToken)
    }

    async fn load_active_user(&self, user_id: &str) -> AuthResult<User> {
        let user = UserRepository::new(self.pool)
            .get_user_by_id(user_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or(AuthError::InvalidToken)?;
        Ok(user)
    }
}

/// Flattens `validator` field errors into a single validation failure.
fn validate_payload<T: Validate>(payload: &T) -> AuthResult<()> {
    if let Err(validation_errors) = payload.validate() {
        let error_messages: Vec<String> = validation_errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    format!(
                        "{}: {}",
                        field,
                        error.message.as_ref().unwrap_or(&"Invalid value".into())
                    )
                })
            })
            .collect();
        return Err(AuthError::validation(error_messages.join(", ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use crate::repositories::role_repository::RoleRepository;
    use crate::repositories::user_repository::CreateUser;

    const PASSWORD: &str = "P@ssw0rd123!";

    async fn seed_user(pool: &SqlitePool, email: &str) -> User {
        UserRepository::new(pool)
            .create_user(CreateUser {
                email: email.into(),
                first_name: "Ada".into(),
                last_name: "Okafor".into(),
                password_hash: password::hash_password(PASSWORD).unwrap(),
            })
            .await
            .unwrap()
    }

    async fn grant_role(pool: &SqlitePool, user_id: &str, role_code: &str, permission: &str) {
        let roles = RoleRepository::new(pool);
        let role_id = roles.create_role(role_code, role_code).await.unwrap();
        let perm_id = roles.create_permission(permission).await.unwrap();
        roles.grant_permission(&role_id, &perm_id).await.unwrap();
        roles
            .assign_role(user_id, &role_id, Utc::now() - Duration::days(1), None)
            .await
            .unwrap();
    }

    async fn session_count(pool: &SqlitePool, revoked: bool) -> i64 {
        let sql = if revoked {
            "SELECT COUNT(*) FROM sessions WHERE revoked_at IS NOT NULL"
        } else {
            "SELECT COUNT(*) FROM sessions WHERE revoked_at IS NULL"
        };
        sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
    }

    fn login_request(email: &str, pass: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: pass.into(),
        }
    }

    #[tokio::test]
    async fn login_without_mfa_completes_and_creates_a_session() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "a@x.com").await;
        grant_role(&pool, &user.id, "nurse", "patients:*:read").await;

        let outcome = service
            .login(login_request("A@X.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap();

        let auth = match outcome {
            LoginOutcome::Complete(auth) => auth,
            other => panic!("expected completion, got {:?}", other),
        };
        assert_eq!(auth.user.roles, vec!["nurse"]);
        assert_eq!(auth.user.permissions, vec!["patients:*:read"]);
        assert_eq!(session_count(&pool, false).await, 1);

        let stored = UserRepository::new(&pool)
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn unknown_and_inactive_users_fail_identically() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "inactive@x.com").await;
        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(&user.id)
            .execute(&pool)
            .await
            .unwrap();

        for email in ["missing@x.com", "inactive@x.com"] {
            let err = service
                .login(login_request(email, PASSWORD), &ClientMeta::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn fifth_failure_locks_and_the_sixth_attempt_fails_even_with_correct_password() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        seed_user(&pool, "a@x.com").await;

        for _ in 0..5 {
            let err = service
                .login(login_request("a@x.com", "wrong-password"), &ClientMeta::default())
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        let err = service
            .login(login_request("a@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));
        assert_eq!(session_count(&pool, false).await, 0);
    }

    #[tokio::test]
    async fn success_resets_the_failure_counter() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "a@x.com").await;

        for _ in 0..3 {
            let _ = service
                .login(login_request("a@x.com", "wrong-password"), &ClientMeta::default())
                .await;
        }
        service
            .login(login_request("a@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap();

        let stored = UserRepository::new(&pool)
            .get_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.failed_login_attempts, 0);
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn mfa_required_role_without_enrollment_gets_setup_outcome_and_no_session() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "admin@x.com").await;
        grant_role(&pool, &user.id, "admin", "users:*:manage").await;

        let outcome = service
            .login(login_request("admin@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap();

        let temp_token = match outcome {
            LoginOutcome::MfaSetupRequired { temp_token } => temp_token,
            other => panic!("expected setup-required, got {:?}", other),
        };
        assert_eq!(session_count(&pool, false).await, 0);

        // The bridge token is a setup token, not an access token.
        assert!(service.tokens().verify(&temp_token, TokenKind::MfaSetup).is_ok());
        assert!(service.tokens().verify(&temp_token, TokenKind::Access).is_err());
    }

    #[tokio::test]
    async fn mfa_setup_token_flows_through_enroll_and_verify_to_a_full_session() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "admin@x.com").await;
        grant_role(&pool, &user.id, "admin", "users:*:manage").await;

        let temp_token = match service
            .login(login_request("admin@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap()
        {
            LoginOutcome::MfaSetupRequired { temp_token } => temp_token,
            other => panic!("expected setup-required, got {:?}", other),
        };

        let enrollment = service.enroll_mfa(&temp_token).await.unwrap();
        let code = totp_rs::TOTP::new(
            totp_rs::Algorithm::SHA1,
            6,
            1,
            30,
            totp_rs::Secret::Encoded(enrollment.secret.clone()).to_bytes().unwrap(),
            Some("CliniGate".into()),
            "admin@x.com".into(),
        )
        .unwrap()
        .generate_current()
        .unwrap();

        let auth = service
            .verify_mfa(&temp_token, &code, &ClientMeta::default())
            .await
            .unwrap();
        assert_eq!(session_count(&pool, false).await, 1);

        let session = SessionRepository::new(&pool)
            .find_by_id(&auth.session_id)
            .await
            .unwrap()
            .unwrap();
        assert!(session.mfa_verified);

        // Subsequent logins now always demand the challenge step.
        let outcome = service
            .login(login_request("admin@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::MfaRequired { .. }));
    }

    #[tokio::test]
    async fn wrong_challenge_code_is_rejected_without_a_session() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "doc@x.com").await;
        grant_role(&pool, &user.id, "admin", "users:*:manage").await;

        let setup_token = match service
            .login(login_request("doc@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap()
        {
            LoginOutcome::MfaSetupRequired { temp_token } => temp_token,
            other => panic!("expected setup-required, got {:?}", other),
        };
        let _ = service.enroll_mfa(&setup_token).await.unwrap();

        let err = service
            .verify_mfa(&setup_token, "000000", &ClientMeta::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidMfaCode));
        assert_eq!(session_count(&pool, false).await, 0);
    }

    #[tokio::test]
    async fn refresh_works_until_logout_revokes_the_session() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "a@x.com").await;
        grant_role(&pool, &user.id, "nurse", "patients:*:read").await;

        let auth = match service
            .login(login_request("a@x.com", PASSWORD), &ClientMeta::default())
            .await
            .unwrap()
        {
            LoginOutcome::Complete(auth) => auth,
            other => panic!("expected completion, got {:?}", other),
        };

        let refreshed = service.refresh(&auth.refresh_token).await.unwrap();
        assert_eq!(refreshed.session_id, auth.session_id);
        assert!(service
            .tokens()
            .verify(&refreshed.access_token, TokenKind::Access)
            .is_ok());

        service.logout(&auth.access_token, None).await.unwrap();

        // Revoked session must never authorize another refresh, even though
        // the refresh token itself is still cryptographically valid.
        let err = service.refresh(&auth.refresh_token).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionRevokedOrExpired));
    }

    #[tokio::test]
    async fn change_password_revokes_every_session_for_the_user() {
        let pool = test_pool().await;
        let service = AuthService::with_config(&pool, Config::for_tests());
        let user = seed_user(&pool, "a@x.com").await;

        for _ in 0..2 {
            service
                .login(login_request("a@x.com", PASSWORD), &ClientMeta::default())
                .await
                .unwrap();
        }
        assert_eq!(session_count(&pool, false).await, 2);

        // Wrong current password.
        let err = service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: "wrong".into(),
                    new_password: "N3w-P@ssword!".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Identical new password.
        let err = service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: PASSWORD.into(),
                    new_password: PASSWORD.into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::PasswordReuse));

        // Weak new password.
        let err = service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: PASSWORD.into(),
                    new_password: "weak".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword));
        assert_eq!(session_count(&pool, false).await, 2);

        service
            .change_password(
                &user.id,
                ChangePasswordRequest {
                    current_password: PASSWORD.into(),
                    new_password: "N3w-P@ssword!".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(session_count(&pool, false).await, 0);
        assert_eq!(session_count(&pool, true).await, 2);

        service
            .login(login_request("a@x.com", "N3w-P@ssword!"), &ClientMeta::default())
            .await
            .unwrap();
    }
}
