use axum::{
    routing::{get, post},
    Router,
};

pub mod events;
pub mod system;
pub mod users;

/// Router for the event submission and inspection endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/event", post(events::submit_event))
        .route("/users/:user_id/events", get(users::list_user_events))
}
