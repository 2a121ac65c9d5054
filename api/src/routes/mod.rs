//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe
//! - `/locations` → geofence registration
//! - `/events` → event administration, check-in, location pings and records

use crate::routes::{events::events_routes, health::health_routes, locations::locations_routes};
use crate::state::AppState;
use axum::Router;

pub mod common;
pub mod events;
pub mod health;
pub mod locations;

/// Builds the complete `/api` router with its state applied.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/locations", locations_routes())
        .nest("/events", events_routes())
        .with_state(app_state)
}
