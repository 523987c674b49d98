//! API error responses.
//!
//! Every error is rendered as `{"error": ...}` with the matching status.

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::movies::{StoreError, Validator};

/// Errors a handler or middleware can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request
    #[error("{0}")]
    BadRequest(String),

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// Input decoded but broke one or more field rules
    #[error("validation failed")]
    Validation(Validator),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Anything else; the detail is logged, never sent to the client
    #[error("internal error: {0}")]
    Internal(String),
}

/// Message sent for every 5xx response.
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::EditConflict => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::NotFound,
            StoreError::EditConflict => ApiError::EditConflict,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(errors) => json!({ "error": errors }),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                json!({ "error": SERVER_ERROR_MESSAGE })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked.
pub fn panic_response(panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    let mut response = ApiError::Internal(format!("handler panicked: {}", detail)).into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}
