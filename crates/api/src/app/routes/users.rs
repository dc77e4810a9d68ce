//! Read-only inspection of a user's recorded events.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::error;

use fraudwatch_core::UserId;
use fraudwatch_infra::event_store::Pagination;

use crate::app::dto::{event_to_json, EventListQuery};
use crate::app::{errors, services::AppServices};

/// GET /users/:user_id/events?limit=50&offset=0
///
/// Events most recent first. `limit` defaults to 50 and is capped at 1000.
/// An unknown user simply has no events.
pub async fn list_user_events(
    Extension(services): Extension<Arc<AppServices>>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<EventListQuery>, QueryRejection>,
) -> axum::response::Response {
    let Path(raw_user_id) = match path {
        Ok(path) => path,
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };
    let user_id = match UserId::new(raw_user_id) {
        Ok(id) => id,
        Err(_) => return errors::validation_error("user_id must be greater than 0"),
    };

    let pagination = Pagination::new(query.limit, query.offset);
    match services.user_events(user_id, pagination).await {
        Ok(page) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "user_id": user_id.get(),
                "events": page.events.iter().map(event_to_json).collect::<Vec<_>>(),
                "total": page.total,
                "pagination": {
                    "limit": page.pagination.limit,
                    "offset": page.pagination.offset,
                },
                "has_more": page.has_more,
            })),
        )
            .into_response(),
        Err(err) => {
            error!(%user_id, error = %err, "failed to list events");
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "error listing events",
            )
        }
    }
}
