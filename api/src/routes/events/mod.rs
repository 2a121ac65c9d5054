use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

mod common;
mod get;
mod post;

pub use common::{
    CheckInBody, CreateEventRequest, EventResponse, PingBody, PingResponse,
};
pub use get::{get_event, list_records};
pub use post::{cancel_event, check_in, create_event, ingest_ping};

pub fn events_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_event))
        .route("/{event_id}", get(get_event))
        .route("/{event_id}/cancel", post(cancel_event))
        .route("/{event_id}/check-in", post(check_in))
        .route("/{event_id}/pings", post(ingest_ping))
        .route("/{event_id}/records", get(list_records))
}
