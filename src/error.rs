//! Crate-wide error taxonomy.
//!
//! Every failure propagates to the caller with no partial result: a store
//! failure or a fallback failure aborts the whole request even when a
//! historical-only answer was already computed.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Any record store read/write failure.
    #[error("record store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Transport or structural failure of the generative fallback.
    #[error("generative fallback error: {0}")]
    Fallback(#[from] FallbackError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("missing or invalid authorization token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("password hashing error")]
    PasswordHash,

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// Failure modes of the generative fallback call.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("fallback returned status {0}")]
    Status(u16),

    #[error("fallback response was not valid JSON: {0}")]
    Malformed(String),

    #[error("fallback did not respond within {0} seconds")]
    Timeout(u64),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Store(_) | AppError::Fallback(_) | AppError::PasswordHash => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::InvalidCredentials | AppError::Unauthorized | AppError::Token(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status().is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(self.status()).json(json!({
            "success": false,
            "detail": self.to_string(),
        }))
    }
}
