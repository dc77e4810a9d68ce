use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use fraudwatch_infra::ProcessError;

/// Client errors carry their message; everything else is a generic 500.
pub fn process_error_to_response(err: ProcessError) -> axum::response::Response {
    match err {
        ProcessError::NotFound(user_id) => json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("user {user_id} not found"),
        ),
        ProcessError::Consistency(_) | ProcessError::Store(_) => internal_error(),
    }
}

pub fn internal_error() -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "error processing event",
    )
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
