//! Request-level error type and its mapping onto HTTP responses.
//!
//! Every failure leaves the service as a status code plus a `{ "message": .. }`
//! body. Internal failures are logged and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::repo::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    InvalidCredentials(&'static str),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    DuplicateKey(String),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Server error")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials(_) | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateKey(email) => AppError::DuplicateKey(email),
            StoreError::NotFound => AppError::NotFound("User not found"),
            StoreError::Database(e) => AppError::Internal(e.into()),
            StoreError::Internal(e) => AppError::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(e) = &self {
            tracing::error!(error = ?e, "internal error");
        }
        let status = self.status();
        let body = ErrorBody {
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
