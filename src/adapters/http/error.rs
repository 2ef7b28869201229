use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::domain::errors::DomainError;

/// Error returned by the JSON handlers, rendered as `{ "error": "..." }`.
#[derive(Debug)]
pub enum ApiError {
    Domain(DomainError),
    Multipart(MultipartError),
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        ApiError::Domain(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        DomainError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DomainError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        DomainError::OperationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Domain(e) => (status_for(&e), e.to_string()),
            ApiError::Multipart(e) => (e.status(), e.body_text()),
        };
        if status.is_server_error() {
            error!(%status, "{message}");
        } else {
            warn!(%status, "{message}");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}
