//! Event submission.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::app::dto::{EventRequest, EventResponse};
use crate::app::{errors, services::AppServices};

/// POST /event
///
/// Body: `{"amount": "12.34", "type": "deposit" | "withdraw", "user_id": 1, "t": 10}`
///
/// Responds `{"alert": bool, "alert_codes": [..], "user_id": 1}`.
pub async fn submit_event(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<EventRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };

    let event = match request.into_event() {
        Ok(event) => event,
        Err(message) => return errors::validation_error(message),
    };

    match services.process_event(&event).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(EventResponse::new(event.user_id, &outcome)),
        )
            .into_response(),
        Err(err) => errors::process_error_to_response(err),
    }
}
