//! Cookie-backed session. The `user_id` cookie holds the internal user id as a
//! plain, unsigned value; its presence is the only authentication signal.
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::error::AppError;

pub const USER_ID_COOKIE: &str = "user_id";
pub const ACCESS_TOKEN_COOKIE: &str = "kakao_access_token";
pub const SESSION_MAX_AGE_DAYS: i64 = 7;

/// The user id from the session cookie, if any. Blank values count as absent.
pub fn current_user(jar: &CookieJar) -> Option<String> {
    jar.get(USER_ID_COOKIE)
        .map(|c| c.value().trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

pub fn access_token(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

pub fn user_cookie(user_id: impl Into<String>, secure: bool) -> Cookie<'static> {
    base_cookie(USER_ID_COOKIE, user_id.into(), secure, Duration::days(SESSION_MAX_AGE_DAYS))
}

pub fn access_token_cookie(token: impl Into<String>, expires_in_secs: i64, secure: bool) -> Cookie<'static> {
    base_cookie(ACCESS_TOKEN_COOKIE, token.into(), secure, Duration::seconds(expires_in_secs))
}

fn base_cookie(name: &'static str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Removes both session cookies from the jar.
pub fn clear(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"))
        .remove(Cookie::build(USER_ID_COOKIE).path("/"))
}

/// Extractor for handlers that require a logged-in user; rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        current_user(&jar)
            .map(CurrentUser)
            .ok_or_else(AppError::auth_required)
    }
}
