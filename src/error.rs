//! HTTP error responses.
//!
//! Validation, not-found and conflict errors become structured responses.
//! Storage failures are logged and answered with a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::store::StoreError;
use crate::validation::FieldErrors;

pub const DUPLICATE_CODE_MESSAGE: &str = "A coupon with this code already exists";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Missing, or owned by another shop. The two are indistinguishable.
    #[error("not found")]
    NotFound,

    #[error("unknown action")]
    UnknownAction,

    #[error("missing or invalid session")]
    Unauthorized,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field } => {
                AppError::Validation(FieldErrors::single(field, DUPLICATE_CODE_MESSAGE))
            }
            other => AppError::Store(other),
        }
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::UnknownAction => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Unknown action" })),
            )
                .into_response(),
            AppError::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            AppError::Store(err) => {
                error!("Storage failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
