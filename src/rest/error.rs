// rest/error.rs — TaskError → HTTP response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::tasks::TaskError;

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        match self {
            TaskError::Unauthorized => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "This action is unauthorized." })),
            )
                .into_response(),
            TaskError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({
                    "message": "The given data was invalid.",
                    "errors": errors,
                })),
            )
                .into_response(),
            TaskError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "Resource not found." })),
            )
                .into_response(),
            TaskError::Database(e) => {
                error!(err = %e, "request failed on storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Server error." })),
                )
                    .into_response()
            }
        }
    }
}
