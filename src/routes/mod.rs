// src/routes/mod.rs
pub mod auth;
pub mod chat;

use crate::state::SharedState;
use axum::{
    Router, middleware,
    routing::{get, post},
};
use auth::{callback_handler, check_handler, login_handler, logout_handler, route_guard};
use chat::chat_handler;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub fn create_router(state: SharedState) -> Router {
    let api_routes = Router::new()
        .route("/chat", post(chat_handler))
        .route("/logout", post(logout_handler))
        .route("/check", get(check_handler))
        .route("/auth/kakao/login", get(login_handler))
        .route("/auth/kakao/callback", get(callback_handler))
        .route("/health", get(|| async { "OK" }));

    // Pages are served from `public/` behind the cookie guard.
    let login_page = format!("public{}.html", state.config.guard.login_path);
    let pages = Router::new()
        .route_service(&state.config.guard.login_path, ServeFile::new(login_page))
        .fallback_service(ServeDir::new("public"))
        .layer(middleware::from_fn_with_state(state.clone(), route_guard));

    api_routes
        .merge(pages)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
}
