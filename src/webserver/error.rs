//! Boundary error type (§6, §7). Every handler returns `ApiResult<T>`; any
//! failure becomes a JSON `{error, message}` pair with the right status, and
//! nothing from inside the crate (stack traces, SQL text) ever leaks out.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    TooManyRequests,
    Internal(anyhow::Error),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason.clone()),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid API key".to_string()),
            ApiError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded".to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            crate::logger::error(crate::logger::LogTag::Webserver, &format!("handler failed: {}", e));
        }
        let (status, message) = self.status_and_message();
        let error = match status {
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::TOO_MANY_REQUESTS => "rate_limited",
            _ => "internal_error",
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
