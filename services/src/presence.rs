//! Location ping ingestion while an event is running.
//!
//! Each ping is checked, evaluated against the venue geofence and appended to
//! the record's ping log. Work on one `(event_id, student_id)` record is
//! serialized by an in-process keyed lock; different students never wait on
//! each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::models::{attendance_record, event::{self, EventStatus}, location_ping};
use sea_orm::{ConnectionTrait, DbConn, EntityTrait, TransactionTrait};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AttendanceError, Result};
use crate::geofence::validate_coordinates;
use crate::location::load_location;
use crate::record_lock::RecordLocks;

/// Consecutive outside pings that trigger an audit note.
pub const OUTSIDE_STREAK: usize = 3;
pub const OUTSIDE_STREAK_NOTE: &str = "outside venue for 3 consecutive location updates";

#[derive(Debug, Clone)]
pub struct PingRequest {
    pub event_id: i64,
    pub student_id: i64,
    pub claimed_location_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    /// Client clock, stored for audit only.
    pub client_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PingOutcome {
    pub inside: bool,
    pub recorded_at: DateTime<Utc>,
    /// This ping completed an outside streak and the note was appended.
    pub flagged_outside: bool,
}

pub struct PresenceTracker {
    db: DbConn,
    records: Arc<RecordLocks>,
}

impl PresenceTracker {
    pub fn new(db: DbConn, records: Arc<RecordLocks>) -> Self {
        Self { db, records }
    }

    pub async fn ingest_ping(&self, req: PingRequest) -> Result<PingOutcome> {
        self.ingest_ping_at(req, Utc::now()).await
    }

    /// Ingests a ping as if received at `now`.
    pub async fn ingest_ping_at(&self, req: PingRequest, now: DateTime<Utc>) -> Result<PingOutcome> {
        validate_coordinates(req.latitude, req.longitude)?;

        let ev = event::Entity::find_by_id(req.event_id)
            .one(&self.db)
            .await?
            .ok_or(AttendanceError::EventNotFound(req.event_id))?;

        ensure_accepting_pings(&ev, now)?;

        if req.claimed_location_id != ev.venue_location_id {
            return Err(AttendanceError::LocationMismatch {
                claimed: req.claimed_location_id,
                expected: ev.venue_location_id,
            });
        }

        ensure_record_active(&self.db, req.event_id, req.student_id).await?;

        let (_, venue) = load_location(&self.db, ev.venue_location_id).await?;
        let inside = venue.contains(req.latitude, req.longitude);

        let _guard = self.records.lock((req.event_id, req.student_id)).await;
        let txn = self.db.begin().await?;

        // the record may have changed while waiting for the lock
        let record = ensure_record_active(&txn, req.event_id, req.student_id).await?;

        let last = location_ping::Model::latest_for_record(&txn, req.event_id, req.student_id, 1).await?;
        let recorded_at = last
            .first()
            .map_or(now, |p| p.recorded_at.max(now));

        location_ping::Model::create(
            &txn,
            location_ping::NewPing {
                event_id: req.event_id,
                student_id: req.student_id,
                recorded_at,
                client_recorded_at: req.client_timestamp,
                latitude: req.latitude,
                longitude: req.longitude,
                inside,
            },
        )
        .await?;

        let recent = location_ping::Model::latest_for_record(
            &txn,
            req.event_id,
            req.student_id,
            OUTSIDE_STREAK as u64,
        )
        .await?;
        let flagged_outside = outside_streak(&recent);

        if flagged_outside {
            let note = format!(
                "{OUTSIDE_STREAK_NOTE} (at {})",
                recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            record.annotate(&txn, &note).await?;
            info!(
                event_id = req.event_id,
                student_id = req.student_id,
                "Student outside venue for consecutive updates"
            );
        }

        txn.commit().await?;

        debug!(
            event_id = req.event_id,
            student_id = req.student_id,
            inside,
            "Location ping recorded"
        );

        Ok(PingOutcome {
            inside,
            recorded_at,
            flagged_outside,
        })
    }
}

fn ensure_accepting_pings(ev: &event::Model, now: DateTime<Utc>) -> Result<()> {
    if ev.status != EventStatus::Ongoing {
        return Err(AttendanceError::EventNotOngoing(ev.status));
    }
    // the sweep may not have caught up yet
    if now >= ev.end_at {
        return Err(AttendanceError::EventNotOngoing(EventStatus::Concluded));
    }
    if !ev.location_monitoring_enabled {
        return Err(AttendanceError::MonitoringDisabled);
    }
    Ok(())
}

async fn ensure_record_active<C: ConnectionTrait>(
    db: &C,
    event_id: i64,
    student_id: i64,
) -> Result<attendance_record::Model> {
    let record = attendance_record::Model::find(db, event_id, student_id)
        .await?
        .ok_or(AttendanceError::RecordNotFound { event_id, student_id })?;

    if !record.status.accepts_pings() {
        return Err(AttendanceError::IneligibleRecordStatus(record.status));
    }
    Ok(record)
}

/// `recent` is newest first. True when the newest `OUTSIDE_STREAK` pings are
/// all outside; every further outside ping extends the streak and is noted too.
fn outside_streak(recent: &[location_ping::Model]) -> bool {
    recent.len() >= OUTSIDE_STREAK && recent[..OUTSIDE_STREAK].iter().all(|p| !p.inside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityCriteria;
    use crate::factories::{self, FAR_AWAY, Fixture, Timeline, VENUE_CENTER};
    use chrono::Duration;
    use db::models::attendance_record::AttendanceStatus;
    use db::test_utils::setup_test_db;
    use sea_orm::DatabaseConnection;

    struct Setup {
        db: DatabaseConnection,
        t: Timeline,
        fx: Fixture,
        ev: event::Model,
        student_id: i64,
        tracker: PresenceTracker,
    }

    async fn ongoing_with_record() -> Setup {
        let db = setup_test_db().await;
        let t = Timeline::starting_at(factories::base_time(), Duration::minutes(60));
        let fx = Fixture::new(&db).await;
        let ev = fx
            .event(&db, &t, EventStatus::Ongoing, EligibilityCriteria::all_students())
            .await;
        let s = fx.student(&db, "2025-0001").await;
        fx.record(&db, &ev, &s, AttendanceStatus::Registered, t.at(-10)).await;
        let tracker = PresenceTracker::new(db.clone(), Arc::new(RecordLocks::new()));

        Setup {
            db,
            t,
            fx,
            ev,
            student_id: s.id,
            tracker,
        }
    }

    impl Setup {
        fn request(&self, inside: bool) -> PingRequest {
            let at = if inside { VENUE_CENTER } else { FAR_AWAY };
            PingRequest {
                event_id: self.ev.id,
                student_id: self.student_id,
                claimed_location_id: self.ev.venue_location_id,
                latitude: at.lat,
                longitude: at.lon,
                client_timestamp: self.t.start_at,
            }
        }

        async fn reason(&self) -> Option<String> {
            attendance_record::Model::find(&self.db, self.ev.id, self.student_id)
                .await
                .unwrap()
                .unwrap()
                .reason
        }
    }

    #[tokio::test]
    async fn records_inside_and_outside_pings() {
        let s = ongoing_with_record().await;

        let a = s.tracker.ingest_ping_at(s.request(true), s.t.at(5)).await.unwrap();
        let b = s.tracker.ingest_ping_at(s.request(false), s.t.at(6)).await.unwrap();

        assert!(a.inside);
        assert!(!b.inside);
        let log = location_ping::Model::find_for_record(&s.db, s.ev.id, s.student_id)
            .await
            .unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].recorded_at, s.t.at(5));
    }

    #[tokio::test]
    async fn server_timestamps_never_go_backwards() {
        let s = ongoing_with_record().await;

        s.tracker.ingest_ping_at(s.request(true), s.t.at(10)).await.unwrap();
        let out = s.tracker.ingest_ping_at(s.request(true), s.t.at(4)).await.unwrap();

        assert_eq!(out.recorded_at, s.t.at(10));
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected_first() {
        let s = ongoing_with_record().await;
        let mut req = s.request(true);
        req.latitude = 91.0;
        req.event_id = 999;

        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Geofence(_)));
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let s = ongoing_with_record().await;
        let mut req = s.request(true);
        req.event_id = 999;

        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotFound(999)));
    }

    #[tokio::test]
    async fn event_must_be_ongoing() {
        let s = ongoing_with_record().await;
        event::Model::compare_and_set_status(&s.db, s.ev.id, EventStatus::Ongoing, EventStatus::Concluded)
            .await
            .unwrap();

        let err = s.tracker.ingest_ping_at(s.request(true), s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotOngoing(EventStatus::Concluded)));
    }

    #[tokio::test]
    async fn pings_after_the_end_are_rejected_before_the_sweep_runs() {
        let s = ongoing_with_record().await;

        let err = s.tracker.ingest_ping_at(s.request(true), s.t.end_at).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotOngoing(EventStatus::Concluded)));
    }

    #[tokio::test]
    async fn monitoring_must_be_enabled() {
        let s = ongoing_with_record().await;
        let mut new = s.fx.new_event(&s.t, EventStatus::Ongoing, EligibilityCriteria::all_students());
        new.location_monitoring_enabled = false;
        let quiet = event::Model::create(&s.db, new).await.unwrap();

        let mut req = s.request(true);
        req.event_id = quiet.id;
        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::MonitoringDisabled));
    }

    #[tokio::test]
    async fn claimed_location_must_be_the_venue() {
        let s = ongoing_with_record().await;
        let mut req = s.request(true);
        req.claimed_location_id = s.fx.lobby.id;

        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::LocationMismatch { .. }));
    }

    #[tokio::test]
    async fn student_needs_a_record() {
        let s = ongoing_with_record().await;
        let other = s.fx.student(&s.db, "2025-0002").await;
        let mut req = s.request(true);
        req.student_id = other.id;

        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn settled_records_take_no_more_pings() {
        let s = ongoing_with_record().await;
        let other = s.fx.student(&s.db, "2025-0002").await;
        s.fx.record(&s.db, &s.ev, &other, AttendanceStatus::Idle, s.t.at(-5)).await;
        let mut req = s.request(true);
        req.student_id = other.id;

        let err = s.tracker.ingest_ping_at(req, s.t.at(5)).await.unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::IneligibleRecordStatus(AttendanceStatus::Idle)
        ));
    }

    #[tokio::test]
    async fn every_ping_of_an_outside_streak_is_noted_without_changing_status() {
        let s = ongoing_with_record().await;

        let mut flags = Vec::new();
        for m in 1..=5 {
            let out = s.tracker.ingest_ping_at(s.request(false), s.t.at(m)).await.unwrap();
            flags.push(out.flagged_outside);
        }
        assert_eq!(flags, [false, false, true, true, true]);

        let reason = s.reason().await.unwrap();
        assert_eq!(reason.matches(OUTSIDE_STREAK_NOTE).count(), 3);
        assert!(reason.contains("2025-10-01 08:03:00 UTC"), "{reason}");
        assert!(reason.contains("2025-10-01 08:05:00 UTC"), "{reason}");

        let record = attendance_record::Model::find(&s.db, s.ev.id, s.student_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, AttendanceStatus::Registered);
    }

    #[tokio::test]
    async fn inside_ping_breaks_the_streak() {
        let s = ongoing_with_record().await;

        let pattern = [false, false, false, true, false, false, false];
        let mut flags = Vec::new();
        for (m, inside) in pattern.into_iter().enumerate() {
            let out = s
                .tracker
                .ingest_ping_at(s.request(inside), s.t.at(m as i64 + 1))
                .await
                .unwrap();
            flags.push(out.flagged_outside);
        }

        assert_eq!(flags, [false, false, true, false, false, false, true]);
        let reason = s.reason().await.unwrap();
        assert_eq!(reason.matches(OUTSIDE_STREAK_NOTE).count(), 2);
    }

    #[tokio::test]
    async fn concurrent_pings_for_one_student_are_all_kept() {
        let s = ongoing_with_record().await;
        let tracker = Arc::new(s.tracker);
        let now = s.t.at(15);

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let tracker = tracker.clone();
                let mut req = PingRequest {
                    event_id: s.ev.id,
                    student_id: s.student_id,
                    claimed_location_id: s.ev.venue_location_id,
                    latitude: VENUE_CENTER.lat,
                    longitude: VENUE_CENTER.lon,
                    client_timestamp: now,
                };
                if i % 2 == 1 {
                    req.latitude = FAR_AWAY.lat;
                }
                tokio::spawn(async move { tracker.ingest_ping_at(req, now).await })
            })
            .collect();

        for outcome in futures::future::join_all(tasks).await {
            outcome.unwrap().unwrap();
        }

        let log = location_ping::Model::find_for_record(&s.db, s.ev.id, s.student_id)
            .await
            .unwrap();
        assert_eq!(log.len(), 10);
        assert_eq!(log.iter().filter(|p| p.inside).count(), 5);
    }
}
