//! Maps `engine::EngineError` onto HTTP status codes for the edge server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::EngineError;
use serde_json::json;

pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::MapperNotLoaded => StatusCode::CONFLICT,
            EngineError::PropertyUnknown(_) | EngineError::MapperUnknown(_) => StatusCode::NOT_FOUND,
            EngineError::PropertyReadOnly(_) | EngineError::PropertyComputed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Mapper(_) => StatusCode::BAD_REQUEST,
            EngineError::Driver(_) => StatusCode::BAD_GATEWAY,
            EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
