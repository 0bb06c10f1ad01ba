use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::model::InvalidRecordId;
use crate::schema::SchemaError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database not available")]
    StoreUnavailable,

    #[error("Invalid id")]
    InvalidId(#[from] InvalidRecordId),

    /// Request body or query string did not match the expected shape.
    #[error("{message}")]
    Shape { status: StatusCode, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Record failed schema validation")]
    Schema(#[from] SchemaError),

    #[error("Internal server error")]
    Store(#[from] StoreError),

    #[error("Export failed")]
    Export(#[from] csv::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidId(_) => StatusCode::BAD_REQUEST,
            ApiError::Shape { status, .. } => *status,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::StoreUnavailable
            | ApiError::Schema(_)
            | ApiError::Store(_)
            | ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Shape {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Shape {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Store(err) => tracing::error!(error = %err, "Store operation failed"),
            ApiError::Export(err) => tracing::error!(error = %err, "CSV export failed"),
            ApiError::Schema(err) => tracing::warn!(error = %err, "Record rejected by schema"),
            _ => {}
        }
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
