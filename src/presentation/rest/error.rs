use crate::domain::StreamError;
use crate::presentation::websocket::error_code;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
    pub status: StatusCode,
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn bad_request(code: i32, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError {
            code: 5000,
            message: message.into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StreamError> for ApiError {
    fn from(error: StreamError) -> Self {
        let status = match &error {
            StreamError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            StreamError::InvalidTier(_) | StreamError::InvalidTopic(_) => StatusCode::BAD_REQUEST,
            StreamError::ClientNotFound(_) => StatusCode::NOT_FOUND,
            StreamError::DuplicateClient(_) => StatusCode::CONFLICT,
            StreamError::EngineClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        ApiError {
            code: error_code(&error),
            message: error.to_string(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code,
            msg: self.message,
        });
        (self.status, body).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "API Error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
