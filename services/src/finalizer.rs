//! Computes final attendance for a concluded event.
//!
//! Each record's ping log is reduced to the share of the event spent inside
//! the venue, which decides `present`, `idle` or `absent`. Students in the
//! audience who never checked in get a synthetic `absent` record. Running the
//! finalizer again on an unchanged event writes nothing.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use db::models::attendance_record::{self, AttendanceStatus, append_reason};
use db::models::event::{self, EventStatus};
use db::models::location_ping;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DbErr};
use tracing::{debug, info, warn};

use crate::eligibility::{EligibilityCriteria, resolve_audience};
use crate::error::{AttendanceError, Result};

/// Minimum inside ratio for `present`.
pub const PRESENT_THRESHOLD: f64 = 0.70;
/// Minimum inside ratio for `idle`; anything lower is `absent`.
pub const IDLE_THRESHOLD: f64 = 0.30;

pub const NO_PINGS_REASON: &str = "no location updates";
pub const NO_RECORD_REASON: &str = "no attendance recorded";

/// Outcome of evaluating one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub status: AttendanceStatus,
    pub inside_ratio: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    pub event_id: i64,
    pub evaluated: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub absentees_created: usize,
    pub failed: usize,
}

/// Time spent inside the venue within `[start, end]`.
///
/// Each ping's inside flag holds until the next ping; the last ping
/// contributes nothing.
pub fn inside_duration(
    samples: &[(DateTime<Utc>, bool)],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Duration {
    let mut sorted = samples.to_vec();
    sorted.sort_by_key(|(at, _)| *at);

    let clamp = |t: DateTime<Utc>| t.clamp(start, end);

    sorted
        .windows(2)
        .filter(|pair| pair[0].1)
        .map(|pair| clamp(pair[1].0) - clamp(pair[0].0))
        .fold(Duration::zero(), |acc, d| acc + d)
}

/// Decides the final status of one record from its ping log.
pub fn decide(
    time_in: Option<DateTime<Utc>>,
    pings: &[location_ping::Model],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Verdict {
    if pings.is_empty() {
        return Verdict {
            status: AttendanceStatus::Absent,
            inside_ratio: 0.0,
            reason: NO_PINGS_REASON.to_owned(),
        };
    }

    let total = end - start;
    let inside_ratio = if total <= Duration::zero() {
        0.0
    } else {
        let samples: Vec<_> = pings.iter().map(|p| (p.recorded_at, p.inside)).collect();
        let inside = inside_duration(&samples, start, end);
        inside.num_milliseconds() as f64 / total.num_milliseconds() as f64
    };

    let share = format!("inside venue for {:.1}% of the event", inside_ratio * 100.0);

    let (status, reason) = if inside_ratio >= PRESENT_THRESHOLD {
        match time_in {
            Some(arrived) if arrived > start => (
                AttendanceStatus::Late,
                format!("arrived late at {} UTC; {share}", arrived.format("%H:%M:%S")),
            ),
            _ => (AttendanceStatus::Present, share),
        }
    } else if inside_ratio >= IDLE_THRESHOLD {
        (AttendanceStatus::Idle, share)
    } else {
        (AttendanceStatus::Absent, share)
    };

    Verdict {
        status,
        inside_ratio,
        reason,
    }
}

/// Finalizes attendance for `event`.
///
/// Per-record failures are logged and counted in the report; only failures
/// that prevent the run as a whole are returned as errors.
pub async fn finalize_event<C: ConnectionTrait>(
    db: &C,
    event: &event::Model,
    now: DateTime<Utc>,
) -> Result<FinalizeReport> {
    if !matches!(event.status, EventStatus::Concluded | EventStatus::Finalized) {
        return Err(AttendanceError::EventNotConcluded(event.status));
    }

    let criteria = EligibilityCriteria::from_json(&event.eligibility)?;
    let records = attendance_record::Model::find_for_event(db, event.id).await?;

    let mut report = FinalizeReport {
        event_id: event.id,
        evaluated: records.len(),
        ..Default::default()
    };
    let mut recorded = BTreeSet::new();

    for record in records {
        let student_id = record.student_id;
        recorded.insert(student_id);

        match settle_record(db, event, record, now).await {
            Ok(true) => report.updated += 1,
            Ok(false) => report.unchanged += 1,
            Err(e) => {
                warn!(event_id = event.id, student_id, error = %e, "Failed to finalize attendance record");
                report.failed += 1;
            }
        }
    }

    let audience = resolve_audience(db, &criteria).await?;
    for student_id in audience.difference(&recorded) {
        match attendance_record::Model::insert_absent_if_missing(
            db,
            event.id,
            *student_id,
            event.venue_location_id,
            NO_RECORD_REASON,
        )
        .await
        {
            Ok(true) => report.absentees_created += 1,
            Ok(false) => debug!(event_id = event.id, student_id, "Absent record already exists"),
            Err(e) => {
                warn!(event_id = event.id, student_id, error = %e, "Failed to create absent record");
                report.failed += 1;
            }
        }
    }

    info!(
        event_id = event.id,
        evaluated = report.evaluated,
        updated = report.updated,
        unchanged = report.unchanged,
        absentees = report.absentees_created,
        failed = report.failed,
        "Attendance finalized"
    );

    Ok(report)
}

/// Writes the verdict for one record if it changes the stored status.
async fn settle_record<C: ConnectionTrait>(
    db: &C,
    event: &event::Model,
    record: attendance_record::Model,
    now: DateTime<Utc>,
) -> std::result::Result<bool, DbErr> {
    let pings = location_ping::Model::find_for_record(db, record.event_id, record.student_id).await?;
    let verdict = decide(record.time_in, &pings, event.start_at, event.end_at);

    if verdict.status == record.status {
        return Ok(false);
    }

    let reason = append_reason(record.reason.as_deref(), &verdict.reason);
    let mut active: attendance_record::ActiveModel = record.into();
    active.status = Set(verdict.status);
    active.time_out = Set(Some(now));
    active.reason = Set(Some(reason));
    active.updated_at = Set(now);
    active.update(db).await?;

    Ok(true)
}
