use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::message::ErrorResponse;

pub const MSG_MESSAGE_REQUIRED: &str = "메시지가 필요합니다";
pub const MSG_AUTH_REQUIRED: &str = "인증이 필요합니다";
pub const MSG_SERVER_ERROR: &str = "서버 오류가 발생했습니다";

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn message_required() -> Self {
        AppError::BadRequest(MSG_MESSAGE_REQUIRED.to_string())
    }

    pub fn auth_required() -> Self {
        AppError::Unauthorized(MSG_AUTH_REQUIRED.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) | AppError::Unauthorized(msg) => msg,
            AppError::Internal(detail) => {
                tracing::error!(%detail, "chat request failed");
                MSG_SERVER_ERROR.to_string()
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("vector search misconfigured: {0}")]
    Config(String),
    #[error("embedding dimension mismatch: got {got}, index expects {expected}")]
    DimensionMismatch { got: usize, expected: usize },
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("retrieval timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("chat completion returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("chat completion returned no content")]
    EmptyCompletion,
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("KAKAO_CLIENT_ID is not configured")]
    MissingClientId,
    #[error("{step} failed with status {status}: {body}")]
    Status {
        step: &'static str,
        status: u16,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid provider url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("identity provider call timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user store timed out")]
    Timeout,
}

/// Query codes attached to the login redirect when the OAuth flow aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    NoCode,
    AuthFailed,
    DbError,
}

impl LoginFailure {
    pub fn code(self) -> &'static str {
        match self {
            LoginFailure::NoCode => "no_code",
            LoginFailure::AuthFailed => "auth_failed",
            LoginFailure::DbError => "db_error",
        }
    }
}

/// Any failure between receiving the authorization code and storing the user.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl LoginError {
    pub fn failure(&self) -> LoginFailure {
        match self {
            LoginError::Identity(_) => LoginFailure::AuthFailed,
            LoginError::Persistence(_) => LoginFailure::DbError,
        }
    }
}
