use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use corner_analysis::AnalysisError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("limit {limit} exceeds maximum of {max}")]
    LimitTooLarge { limit: usize, max: usize },

    #[error(transparent)]
    InvalidConfig(#[from] AnalysisError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::LimitTooLarge { .. } | ApiError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
