use db::models::{attendance_record::AttendanceStatus, event::EventStatus};
use sea_orm::DbErr;
use thiserror::Error;

use crate::geofence::GeofenceError;

/// Every way an attendance operation can be refused or fail.
///
/// Validation and state errors are raised before any write, so a caller that
/// receives one can assume nothing was persisted.
#[derive(Debug, Error)]
pub enum AttendanceError {
    // --- validation ---
    #[error("{0}")]
    Validation(String),

    #[error("invalid geofence: {0}")]
    Geofence(#[from] GeofenceError),

    // --- lookups ---
    #[error("event {0} not found")]
    EventNotFound(i64),

    #[error("location {0} not found")]
    LocationNotFound(i64),

    #[error("student {0} not found")]
    StudentNotFound(i64),

    #[error("no attendance record for student {student_id} at event {event_id}")]
    RecordNotFound { event_id: i64, student_id: i64 },

    // --- state ---
    #[error("event is {0}, location updates are only accepted while it is ongoing")]
    EventNotOngoing(EventStatus),

    #[error("location monitoring is disabled for this event")]
    MonitoringDisabled,

    #[error("location {claimed} is not accepted here (expected {expected})")]
    LocationMismatch { claimed: i64, expected: i64 },

    #[error("attendance record is {0}, location updates are no longer accepted")]
    IneligibleRecordStatus(AttendanceStatus),

    #[error("check-in is not open while the event is {0}")]
    CheckInClosed(EventStatus),

    #[error("attendance already recorded")]
    AlreadyCheckedIn,

    #[error("student {0} is not eligible for this event")]
    NotInAudience(i64),

    #[error("you are outside the allowed area")]
    OutsideGeofence,

    #[error("face verification failed: {0}")]
    FaceNotVerified(String),

    #[error("event cannot be cancelled while it is {0}")]
    EventNotCancellable(EventStatus),

    #[error("event is {0}, attendance can only be finalized once it has concluded")]
    EventNotConcluded(EventStatus),

    // --- infrastructure ---
    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("face verification service unavailable: {0}")]
    FaceService(String),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

impl AttendanceError {
    /// True for refusals caused by the request or the current state, as
    /// opposed to infrastructure failures worth retrying.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            AttendanceError::Database(_) | AttendanceError::FaceService(_) | AttendanceError::Corrupt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
