//! Middleware for protecting authenticated routes and handling authorization.
//!
//! Validates bearer access tokens and enforces the session-revocation rule:
//! the session record is point-read on every request, so a token whose
//! session was revoked or expired is rejected immediately even though its
//! signature still verifies.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, header::COOKIE},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::repositories::session_repository::SessionRepository;
use crate::utils::jwt::{TokenIssuer, TokenKind};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Access-token authentication middleware.
pub async fn jwt_auth(mut request: Request, next: Next) -> Result<Response, StatusCode> {
    let token =
        request_token(request.headers(), ACCESS_COOKIE).ok_or(StatusCode::UNAUTHORIZED)?;

    let config = Config::from_env().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let issuer = TokenIssuer::new(&config);

    let claims = issuer
        .verify(&token, TokenKind::Access)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let pool = request
        .extensions()
        .get::<SqlitePool>()
        .cloned()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let session_id = claims
        .session_id
        .clone()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let session = SessionRepository::new(&pool)
        .find_by_id(&session_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    match session {
        Some(session) if !session.is_revoked() && !session.is_expired(Utc::now()) => {}
        _ => return Err(StatusCode::UNAUTHORIZED),
    }

    // Add claims to request extensions for use in handlers
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Bearer header first, then the access cookie.
pub fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers, cookie_name))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

pub fn cookie_token(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let mut split = part.trim().splitn(2, '=');
        if split.next() == Some(name) {
            return split.next().map(|v| v.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(
            COOKIE,
            HeaderValue::from_static("access_token=def; refresh_token=ghi"),
        );

        assert_eq!(request_token(&headers, ACCESS_COOKIE).as_deref(), Some("abc"));
        assert_eq!(cookie_token(&headers, REFRESH_COOKIE).as_deref(), Some("ghi"));
    }

    #[test]
    fn malformed_authorization_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
