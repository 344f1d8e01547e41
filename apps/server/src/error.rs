//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pulldeck_core::PullDeckError;
use pulldeck_types::ErrorResponse;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] PullDeckError),

    #[error("{0}")]
    Unauthorized(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Core(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Core(PullDeckError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Core(PullDeckError::AlreadyRunning(_)) => StatusCode::CONFLICT,
            ApiError::Core(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::debug!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse {
            err: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn maps_core_errors_to_status() {
        let cases = [
            (
                ApiError::from(PullDeckError::InvalidUrl("ftp://x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(PullDeckError::InvalidTarget {
                    path: PathBuf::from("/nope"),
                    reason: "does not exist".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(PullDeckError::NotFound(7)),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(PullDeckError::AlreadyRunning(7)),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PullDeckError::ServerError { status: 502 }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Unauthorized("no session".into()),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{}", error);
        }
    }
}
