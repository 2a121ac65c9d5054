use axum::{Json, http::StatusCode};
use serde::Serialize;
use services::AttendanceError;
use tracing::error;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// Error responses carry `T::default()` as `data`.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
        }
    }
}

/// What handlers return.
pub type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

/// HTTP status for a service error.
pub fn status_for(err: &AttendanceError) -> StatusCode {
    use AttendanceError::*;

    match err {
        Validation(_) => StatusCode::BAD_REQUEST,
        Geofence(_) => StatusCode::UNPROCESSABLE_ENTITY,

        EventNotFound(_) | LocationNotFound(_) | StudentNotFound(_) | RecordNotFound { .. } => {
            StatusCode::NOT_FOUND
        }

        NotInAudience(_) | OutsideGeofence | FaceNotVerified(_) => StatusCode::FORBIDDEN,

        EventNotOngoing(_)
        | MonitoringDisabled
        | LocationMismatch { .. }
        | IneligibleRecordStatus(_)
        | CheckInClosed(_)
        | AlreadyCheckedIn
        | EventNotCancellable(_)
        | EventNotConcluded(_) => StatusCode::CONFLICT,

        FaceService(_) => StatusCode::BAD_GATEWAY,
        Database(_) | Corrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a service error into a response. Infrastructure failures are
/// logged here and reported without internal detail.
pub fn error_response<T>(err: AttendanceError) -> ApiResult<T>
where
    T: Serialize + Default,
{
    let status = status_for(&err);

    let message = if err.is_rejection() {
        err.to_string()
    } else {
        error!(error = %err, "Request failed");
        match err {
            AttendanceError::FaceService(_) => "Face verification service unavailable".to_owned(),
            _ => "Internal server error".to_owned(),
        }
    };

    (status, Json(ApiResponse::error(message)))
}
