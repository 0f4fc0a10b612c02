use std::{future::Future, time::Duration};

use axum::{
    Json,
    extract::{Query, Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use crate::{
    config::GuardConfig,
    error::{IdentityError, LoginError, LoginFailure, PersistenceError},
    message::{LogoutResponse, SessionStatus},
    services::{identity::AccessToken, user_store::UserRecord},
    session,
    state::SharedState,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

fn login_redirect(login_path: &str, failure: LoginFailure) -> Redirect {
    Redirect::to(&format!("{}?error={}", login_path, failure.code()))
}

async fn bounded<T, E>(
    limit: Duration,
    on_timeout: E,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(on_timeout))
}

/// Sends the browser to the provider's consent screen.
pub async fn login_handler(State(state): State<SharedState>) -> Response {
    match state.identity.authorize_url(&state.config.redirect_uri()) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "cannot start kakao login");
            login_redirect(&state.config.guard.login_path, LoginFailure::AuthFailed).into_response()
        }
    }
}

pub async fn callback_handler(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let login_path = state.config.guard.login_path.as_str();

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        tracing::warn!(provider_error = ?params.error, "kakao callback without authorization code");
        return login_redirect(login_path, LoginFailure::NoCode).into_response();
    };

    let (token, user) = match complete_login(&state, &code).await {
        Ok(done) => done,
        Err(e) => {
            tracing::error!(error = %e, "kakao login failed");
            return login_redirect(login_path, e.failure()).into_response();
        }
    };

    tracing::info!(user_id = %user.id, kakao_id = user.kakao_id, "login succeeded");
    let secure = state.config.secure_cookies();
    let jar = jar
        .add(session::access_token_cookie(
            token.access_token,
            token.expires_in,
            secure,
        ))
        .add(session::user_cookie(user.id.to_string(), secure));

    (jar, Redirect::to("/")).into_response()
}

/// Code exchange, profile fetch and user upsert, each bounded by the call timeout.
async fn complete_login(
    state: &SharedState,
    code: &str,
) -> Result<(AccessToken, UserRecord), LoginError> {
    let limit = state.config.external_call_timeout;
    let redirect_uri = state.config.redirect_uri();

    let token = bounded(
        limit,
        IdentityError::Timeout,
        state.identity.exchange_code(code, &redirect_uri),
    )
    .await?;
    tracing::debug!("kakao access token issued");

    let profile = bounded(
        limit,
        IdentityError::Timeout,
        state.identity.fetch_profile(&token.access_token),
    )
    .await?;
    tracing::debug!(kakao_id = profile.id, "kakao profile fetched");

    let user = bounded(limit, PersistenceError::Timeout, state.users.upsert(&profile)).await?;
    Ok((token, user))
}

pub async fn logout_handler(State(state): State<SharedState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = session::access_token(&jar) {
        let revoke = bounded(
            state.config.external_call_timeout,
            IdentityError::Timeout,
            state.identity.revoke(&token),
        );
        if let Err(e) = revoke.await {
            tracing::warn!(error = %e, "kakao logout failed, clearing cookies anyway");
        }
    }

    tracing::info!("logged out, session cookies cleared");
    (session::clear(jar), Json(LogoutResponse { success: true }))
}

pub async fn check_handler(jar: CookieJar) -> Json<SessionStatus> {
    let user_id = session::current_user(&jar);
    Json(SessionStatus {
        is_logged_in: user_id.is_some(),
        user_id,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Pass,
    RedirectToLogin,
    RedirectHome,
}

pub fn is_protected(path: &str, guard: &GuardConfig) -> bool {
    guard.protected_paths.iter().any(|p| {
        if p == "/" {
            path == "/"
        } else {
            path.starts_with(p.as_str())
        }
    })
}

pub fn guard_decision(path: &str, authenticated: bool, guard: &GuardConfig) -> GuardDecision {
    if !authenticated && is_protected(path, guard) {
        GuardDecision::RedirectToLogin
    } else if authenticated && path == guard.login_path {
        GuardDecision::RedirectHome
    } else {
        GuardDecision::Pass
    }
}

/// Cookie-presence route guard for page paths. No token validation happens here.
pub async fn route_guard(State(state): State<SharedState>, jar: CookieJar, req: Request, next: Next) -> Response {
    let authenticated = session::current_user(&jar).is_some();
    match guard_decision(req.uri().path(), authenticated, &state.config.guard) {
        GuardDecision::Pass => next.run(req).await,
        GuardDecision::RedirectToLogin => Redirect::to(&state.config.guard.login_path).into_response(),
        GuardDecision::RedirectHome => Redirect::to("/").into_response(),
    }
}
