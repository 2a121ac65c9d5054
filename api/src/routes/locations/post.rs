use axum::{Json, extract::State, http::StatusCode};
use services::geofence::{Boundary, GeofenceError};
use services::location;
use validator::Validate;

use super::common::{CreateLocationRequest, LocationResponse};
use crate::response::{ApiResponse, ApiResult, error_response};
use crate::routes::common::format_validation_errors;
use crate::state::AppState;

/// POST /api/locations
///
/// Registers a geofence.
///
/// ### Request Body
/// ```json
/// {
///   "name": "Main Gym",
///   "boundary": { "type": "circle", "center": { "lat": 14.1498, "lon": 120.9555 }, "radius_meters": 50 }
/// }
/// ```
/// or a polygon: `{ "type": "polygon", "rings": [[{ "lat": .., "lon": .. }, ...]] }`.
/// Further rings are holes.
///
/// ### Responses
/// - `201 Created` with the stored location
/// - `400 Bad Request` when the name is invalid
/// - `422 Unprocessable Entity` when the boundary is malformed
pub async fn create_location(
    State(state): State<AppState>,
    Json(req): Json<CreateLocationRequest>,
) -> ApiResult<LocationResponse> {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&validation_errors))),
        );
    }

    let boundary: Boundary = match serde_json::from_value(req.boundary) {
        Ok(b) => b,
        Err(e) => return error_response(GeofenceError::Malformed(e.to_string()).into()),
    };

    match location::create_location(state.db(), &req.name, &boundary).await {
        Ok(model) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                LocationResponse::from(model),
                "Location created",
            )),
        ),
        Err(e) => error_response::<LocationResponse>(e),
    }
}
