use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use services::event;

use super::common::EventResponse;
use crate::response::{ApiResponse, ApiResult, error_response};
use crate::routes::common::RecordResponse;
use crate::state::AppState;

/// GET /api/events/{event_id}
///
/// ### Responses
/// - `200 OK` with the event
/// - `404 Not Found`
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> ApiResult<EventResponse> {
    match event::find_event(state.db(), event_id).await {
        Ok(ev) => (
            StatusCode::OK,
            Json(ApiResponse::success(EventResponse::from(ev), "Event retrieved")),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /api/events/{event_id}/records
///
/// Attendance records of the event ordered by student id. After finalization
/// this includes the synthetic `absent` records of students who never checked
/// in.
///
/// ### Responses
/// - `200 OK` with the records
/// - `404 Not Found`
pub async fn list_records(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> ApiResult<Vec<RecordResponse>> {
    match event::list_records(state.db(), event_id).await {
        Ok(records) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                records.into_iter().map(RecordResponse::from).collect(),
                "Attendance records retrieved",
            )),
        ),
        Err(e) => error_response(e),
    }
}
