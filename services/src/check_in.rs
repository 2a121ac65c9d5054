//! Creates a student's attendance record when they check in.
//!
//! A check-in is accepted during registration at the registration location, or
//! while the event runs at the venue. Every gate is evaluated before anything
//! is written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus},
    event::{self, EventStatus},
    student,
};
use sea_orm::{DbConn, EntityTrait};
use tracing::{info, warn};

use crate::eligibility::{EligibilityCriteria, is_eligible};
use crate::error::{AttendanceError, Result};
use crate::face::FaceVerifier;
use crate::geofence::validate_coordinates;
use crate::location::load_location;
use crate::record_lock::RecordLocks;

#[derive(Debug, Clone)]
pub struct CheckInRequest {
    pub event_id: i64,
    pub student_id: i64,
    pub claimed_location_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Live face sample; required when the event enables facial verification.
    pub face_sample: Option<String>,
}

pub struct CheckInGate {
    db: DbConn,
    records: Arc<RecordLocks>,
    verifier: Option<Arc<dyn FaceVerifier>>,
    face_match_threshold: f64,
}

impl CheckInGate {
    pub fn new(
        db: DbConn,
        records: Arc<RecordLocks>,
        verifier: Option<Arc<dyn FaceVerifier>>,
        face_match_threshold: f64,
    ) -> Self {
        Self {
            db,
            records,
            verifier,
            face_match_threshold,
        }
    }

    pub async fn check_in(&self, req: CheckInRequest) -> Result<attendance_record::Model> {
        self.check_in_at(req, Utc::now()).await
    }

    pub async fn check_in_at(
        &self,
        req: CheckInRequest,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model> {
        validate_coordinates(req.latitude, req.longitude)?;

        let ev = event::Entity::find_by_id(req.event_id)
            .one(&self.db)
            .await?
            .ok_or(AttendanceError::EventNotFound(req.event_id))?;

        let expected = check_in_location(&ev, now)?;
        if req.claimed_location_id != expected {
            return Err(AttendanceError::LocationMismatch {
                claimed: req.claimed_location_id,
                expected,
            });
        }

        let student = student::Entity::find_by_id(req.student_id)
            .one(&self.db)
            .await?
            .ok_or(AttendanceError::StudentNotFound(req.student_id))?;

        let criteria = EligibilityCriteria::from_json(&ev.eligibility)?;
        if !is_eligible(&self.db, &criteria, &student).await? {
            return Err(AttendanceError::NotInAudience(student.id));
        }

        let (_, boundary) = load_location(&self.db, expected).await?;
        if !boundary.contains(req.latitude, req.longitude) {
            return Err(AttendanceError::OutsideGeofence);
        }

        if attendance_record::Model::find(&self.db, ev.id, student.id)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        if ev.facial_verification_enabled {
            self.verify_face(&student, req.face_sample.as_deref()).await?;
        }

        let _guard = self.records.lock((ev.id, student.id)).await;
        if attendance_record::Model::find(&self.db, ev.id, student.id)
            .await?
            .is_some()
        {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let status = if now > ev.start_at {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Registered
        };

        let record =
            attendance_record::Model::create(&self.db, ev.id, student.id, expected, status, Some(now))
                .await?;

        info!(
            event_id = ev.id,
            student_id = student.id,
            status = %status,
            "Student checked in"
        );

        Ok(record)
    }

    async fn verify_face(&self, student: &student::Model, sample: Option<&str>) -> Result<()> {
        let sample = sample
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AttendanceError::FaceNotVerified("no face sample provided".into()))?;
        let reference = student
            .face_encoding
            .as_deref()
            .ok_or_else(|| AttendanceError::FaceNotVerified("no reference face on file".into()))?;
        let verifier = self
            .verifier
            .as_ref()
            .ok_or_else(|| AttendanceError::FaceService("face verification is not configured".into()))?;

        let result = verifier.verify(sample, reference).await?;
        if !result.matched {
            warn!(student_id = student.id, "Face did not match stored reference");
            return Err(AttendanceError::FaceNotVerified("face does not match".into()));
        }
        if !result.passes(self.face_match_threshold) {
            warn!(
                student_id = student.id,
                confidence = result.confidence,
                "Face match below threshold"
            );
            return Err(AttendanceError::FaceNotVerified(format!(
                "match confidence {:.2} is below {:.2}",
                result.confidence, self.face_match_threshold
            )));
        }
        Ok(())
    }
}

/// Location a check-in must happen at, given the event's phase.
fn check_in_location(ev: &event::Model, now: DateTime<Utc>) -> Result<i64> {
    match ev.status {
        EventStatus::Registration => Ok(ev.registration_location_id),
        EventStatus::Ongoing if now < ev.end_at => Ok(ev.venue_location_id),
        EventStatus::Ongoing => Err(AttendanceError::CheckInClosed(EventStatus::Concluded)),
        other => Err(AttendanceError::CheckInClosed(other)),
    }
}
