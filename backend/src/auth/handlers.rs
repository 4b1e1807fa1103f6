//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, token refresh,
//! logout, MFA management, and password changes, parse request data, and
//! interact with the `auth::service` for core business logic. Access and
//! refresh tokens travel as httpOnly cookies; response bodies carry only
//! non-secret session metadata.

use axum::{
    extract::{Extension, Json},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json as ResponseJson, Response},
};
use cookie::time::Duration as CookieDuration;
use cookie::{Cookie, SameSite};
use sqlx::SqlitePool;

use crate::api::common::auth_error_to_http;
use crate::auth::middleware::{ACCESS_COOKIE, REFRESH_COOKIE, cookie_token, request_token};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::utils::jwt::{Claims, ClientMeta};

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;
    let client = client_meta(&headers);

    let outcome = auth_service
        .login(payload, &client)
        .await
        .map_err(auth_error_to_http)?;

    Ok(match outcome {
        LoginOutcome::Complete(auth) => completed_auth_response(&auth_service, *auth),
        LoginOutcome::MfaRequired { temp_token } => ResponseJson(LoginResponse::MfaRequired {
            mfa_required: true,
            temp_token,
        })
        .into_response(),
        LoginOutcome::MfaSetupRequired { temp_token } => {
            ResponseJson(LoginResponse::MfaSetupRequired {
                mfa_setup_required: true,
                temp_token,
            })
            .into_response()
        }
    })
}

/// Handle token refresh request; the refresh token is read from its cookie.
#[axum::debug_handler]
pub async fn refresh(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    let refresh_token = cookie_token(&headers, REFRESH_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "Missing refresh token".to_string()))?;

    let refreshed = auth_service
        .refresh(&refresh_token)
        .await
        .map_err(auth_error_to_http)?;

    let secure = auth_service.cookie_secure();
    let expires_in = refreshed.expires_in;
    let access_token = refreshed.access_token.clone();

    let mut response = ResponseJson(RefreshResponse {
        user: refreshed.user,
        session_id: refreshed.session_id,
        expires_in,
    })
    .into_response();

    append_cookie(
        &mut response,
        auth_cookie(ACCESS_COOKIE, &access_token, expires_in as i64, secure),
    );
    Ok(response)
}

/// Handle logout request; accepts an access or MFA challenge token.
#[axum::debug_handler]
pub async fn logout(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    let token = request_token(&headers, ACCESS_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "Missing token".to_string()))?;
    let reason = payload.and_then(|Json(body)| body.reason);

    auth_service
        .logout(&token, reason)
        .await
        .map_err(auth_error_to_http)?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    clear_auth_cookies(&mut response, auth_service.cookie_secure());
    Ok(response)
}

/// Get current user information from token
#[axum::debug_handler]
pub async fn me(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<ResponseJson<UserSummary>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    let summary = auth_service
        .me(&claims.sub)
        .await
        .map_err(auth_error_to_http)?;

    Ok(ResponseJson(summary))
}

/// Begin MFA enrollment; accepts an access token or an MFA setup token.
#[axum::debug_handler]
pub async fn mfa_enable(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    let token = request_token(&headers, ACCESS_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "Missing token".to_string()))?;

    let enrollment = auth_service
        .enroll_mfa(&token)
        .await
        .map_err(auth_error_to_http)?;

    Ok(ResponseJson(enrollment).into_response())
}

/// Complete MFA setup or a login challenge; returns a full auth result.
#[axum::debug_handler]
pub async fn mfa_verify(
    Extension(pool): Extension<SqlitePool>,
    headers: HeaderMap,
    Json(payload): Json<VerifyMfaRequest>,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;
    let client = client_meta(&headers);

    let token = request_token(&headers, ACCESS_COOKIE)
        .ok_or((StatusCode::UNAUTHORIZED, "Missing token".to_string()))?;

    let auth = auth_service
        .verify_mfa(&token, &payload.code, &client)
        .await
        .map_err(auth_error_to_http)?;

    Ok(completed_auth_response(&auth_service, auth))
}

/// Disable MFA; requires an authenticated session and a valid code.
#[axum::debug_handler]
pub async fn mfa_disable(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DisableMfaRequest>,
) -> Result<ResponseJson<MessageResponse>, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    auth_service
        .disable_mfa(&claims.sub, &payload.code)
        .await
        .map_err(auth_error_to_http)?;

    Ok(ResponseJson(MessageResponse {
        message: "Multi-factor authentication disabled".to_string(),
    }))
}

/// Change password; revokes every session for the user.
#[axum::debug_handler]
pub async fn change_password(
    Extension(pool): Extension<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Response, (StatusCode, String)> {
    let auth_service = AuthService::new(&pool).map_err(auth_error_to_http)?;

    auth_service
        .change_password(&claims.sub, payload)
        .await
        .map_err(auth_error_to_http)?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    clear_auth_cookies(&mut response, auth_service.cookie_secure());
    Ok(response)
}

/// Builds the completion body and attaches both token cookies.
fn completed_auth_response(service: &AuthService<'_>, auth: CompletedAuth) -> Response {
    let secure = service.cookie_secure();
    let access_ttl = auth.expires_in as i64;
    let refresh_ttl = service.refresh_ttl_seconds() as i64;

    let mut response = ResponseJson(LoginResponse::Complete {
        user: auth.user,
        session_id: auth.session_id,
        expires_in: auth.expires_in,
    })
    .into_response();

    append_cookie(
        &mut response,
        auth_cookie(ACCESS_COOKIE, &auth.access_token, access_ttl, secure),
    );
    append_cookie(
        &mut response,
        auth_cookie(REFRESH_COOKIE, &auth.refresh_token, refresh_ttl, secure),
    );
    response
}

fn auth_cookie(name: &str, value: &str, max_age_seconds: i64, secure: bool) -> String {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .path("/")
        .build()
        .to_string()
}

fn clear_auth_cookies(response: &mut Response, secure: bool) {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        append_cookie(response, auth_cookie(name, "", 0, secure));
    }
}

fn append_cookie(response: &mut Response, cookie: String) {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().append(SET_COOKIE, value);
    }
}

/// Client metadata captured for session records and temp-token claims.
fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    ClientMeta {
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_cookies_are_http_only_strict_and_scoped_to_root() {
        let cookie = auth_cookie(ACCESS_COOKIE, "token-value", 900, true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=900"));
    }

    #[test]
    fn forwarded_header_yields_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent, None);
    }
}
