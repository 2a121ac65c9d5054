use crate::state::AppState;
use axum::{Router, routing::post};

mod common;
mod post;

pub use common::{CreateLocationRequest, LocationResponse};
pub use post::create_location;

pub fn locations_routes() -> Router<AppState> {
    Router::new().route("/", post(create_location))
}
