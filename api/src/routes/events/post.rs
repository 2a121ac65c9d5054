use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use services::check_in::CheckInRequest;
use services::event;
use services::presence::PingRequest;
use validator::Validate;

use super::common::{CheckInBody, CreateEventRequest, EventResponse, PingBody, PingResponse};
use crate::response::{ApiResponse, ApiResult, error_response};
use crate::routes::common::{RecordResponse, format_validation_errors};
use crate::state::AppState;

/// POST /api/events
///
/// Creates an event. Its initial status follows the schedule at creation time.
///
/// ### Request Body
/// ```json
/// {
///   "name": "Orientation",
///   "registration_location_id": 1,
///   "venue_location_id": 2,
///   "registration_open_at": "2025-10-01T07:30:00Z",
///   "start_at": "2025-10-01T08:00:00Z",
///   "end_at": "2025-10-01T09:00:00Z",
///   "eligibility": { "section_ids": [3, 4] },
///   "facial_verification_enabled": false,
///   "location_monitoring_enabled": true
/// }
/// ```
///
/// ### Responses
/// - `201 Created`
/// - `400 Bad Request` on an invalid name or schedule
/// - `404 Not Found` when a location does not exist
pub async fn create_event(
    State(state): State<AppState>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<EventResponse> {
    if let Err(validation_errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&validation_errors))),
        );
    }

    match event::create_event(state.db(), req.into(), Utc::now()).await {
        Ok(ev) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(EventResponse::from(ev), "Event created")),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/events/{event_id}/cancel
///
/// ### Responses
/// - `200 OK` with the cancelled event
/// - `404 Not Found`
/// - `409 Conflict` once the event has concluded or was already cancelled
pub async fn cancel_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> ApiResult<EventResponse> {
    match event::cancel_event(state.db(), event_id).await {
        Ok(ev) => (
            StatusCode::OK,
            Json(ApiResponse::success(EventResponse::from(ev), "Event cancelled")),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/events/{event_id}/check-in
///
/// ### Request Body
/// ```json
/// { "student_id": 7, "claimed_location_id": 1, "latitude": 14.152, "longitude": 120.958, "face_sample": null }
/// ```
///
/// ### Responses
/// - `201 Created` with the new attendance record (`registered` or `late`)
/// - `403 Forbidden` outside the geofence, outside the audience, or on a failed face match
/// - `404 Not Found` for an unknown event or student
/// - `409 Conflict` when check-in is closed, the location is wrong, or the student already checked in
/// - `502 Bad Gateway` when the face verification service fails
pub async fn check_in(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(body): Json<CheckInBody>,
) -> ApiResult<RecordResponse> {
    let req = CheckInRequest {
        event_id,
        student_id: body.student_id,
        claimed_location_id: body.claimed_location_id,
        latitude: body.latitude,
        longitude: body.longitude,
        face_sample: body.face_sample,
    };

    match state.check_in_gate().check_in(req).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                RecordResponse::from(record),
                "Attendance recorded",
            )),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/events/{event_id}/pings
///
/// Ingests a location update while the event is ongoing.
///
/// ### Request Body
/// ```json
/// { "student_id": 7, "claimed_location_id": 2, "latitude": 14.1498, "longitude": 120.9555, "client_timestamp": "2025-10-01T08:12:00Z" }
/// ```
///
/// ### Responses
/// - `200 OK` with `{ inside, recorded_at, flagged_outside }`
/// - `404 Not Found` for an unknown event or a student without a record
/// - `409 Conflict` when the event is not ongoing, monitoring is off, the claimed location is not the venue, or the record is settled
/// - `400 Bad Request` when a field is missing or malformed, `client_timestamp` included
/// - `422 Unprocessable Entity` on invalid coordinates
pub async fn ingest_ping(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    payload: Result<Json<PingBody>, JsonRejection>,
) -> ApiResult<PingResponse> {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(rejection.body_text())),
            );
        }
    };

    let req = PingRequest {
        event_id,
        student_id: body.student_id,
        claimed_location_id: body.claimed_location_id,
        latitude: body.latitude,
        longitude: body.longitude,
        client_timestamp: body.client_timestamp,
    };

    match state.presence().ingest_ping(req).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                PingResponse::from(outcome),
                "Location recorded",
            )),
        ),
        Err(e) => error_response(e),
    }
}
