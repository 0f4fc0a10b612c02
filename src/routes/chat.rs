use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse},
    session::CurrentUser,
    state::SharedState,
};

pub async fn chat_handler(
    State(state): State<SharedState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::Internal(rejection.body_text()))?;

    let response = state.orchestrator.handle(&user_id, request).await?;
    Ok(Json(response))
}
