//! Gateway error type and its HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{ IntoResponse, Response },
};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: No token provided")]
    AuthenticationMissing,

    #[error("Unauthorized: Invalid token")]
    AuthenticationInvalid,

    #[error("Topic, platform, and tone are required")]
    Validation,

    /// A store read failed. The string is the operation label shown to the caller.
    #[error("Failed to fetch {0}")]
    Fetch(&'static str),

    /// Any collaborator failure while generating. Carries the cause for `details`.
    #[error("Failed to generate content")]
    Generation(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthenticationMissing => StatusCode::UNAUTHORIZED,
            ApiError::AuthenticationInvalid => StatusCode::FORBIDDEN,
            ApiError::Validation => StatusCode::BAD_REQUEST,
            ApiError::Fetch(_) | ApiError::Generation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = match &self {
            ApiError::Generation(cause) => Some(cause.clone()),
            _ => None,
        };
        let body = Json(ErrorBody {
            error: self.to_string(),
            details,
        });
        (self.status(), body).into_response()
    }
}
