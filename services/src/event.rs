//! Event administration.

use chrono::{DateTime, Utc};
use db::models::{
    attendance_record,
    event::{self, EventStatus, NewEvent},
    location,
};
use sea_orm::{DbConn, EntityTrait};
use tracing::info;

use crate::eligibility::EligibilityCriteria;
use crate::error::{AttendanceError, Result};
use crate::lifecycle::scheduled_status;

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub name: String,
    pub registration_location_id: i64,
    pub venue_location_id: i64,
    pub registration_open_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub eligibility: EligibilityCriteria,
    pub facial_verification_enabled: bool,
    pub location_monitoring_enabled: bool,
}

/// Validates and stores a new event. Its initial status follows the schedule
/// as of `now`.
pub async fn create_event(db: &DbConn, req: CreateEvent, now: DateTime<Utc>) -> Result<event::Model> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AttendanceError::Validation("event name cannot be empty".into()));
    }
    if req.registration_open_at > req.start_at {
        return Err(AttendanceError::Validation(
            "registration must open no later than the event start".into(),
        ));
    }
    if req.start_at > req.end_at {
        return Err(AttendanceError::Validation(
            "event cannot end before it starts".into(),
        ));
    }

    for id in [req.registration_location_id, req.venue_location_id] {
        if location::Entity::find_by_id(id).one(db).await?.is_none() {
            return Err(AttendanceError::LocationNotFound(id));
        }
    }

    let status = scheduled_status(req.registration_open_at, req.start_at, req.end_at, now);
    let new = NewEvent {
        name: name.to_owned(),
        registration_location_id: req.registration_location_id,
        venue_location_id: req.venue_location_id,
        registration_open_at: req.registration_open_at,
        start_at: req.start_at,
        end_at: req.end_at,
        status,
        eligibility: req.eligibility.to_json(),
        facial_verification_enabled: req.facial_verification_enabled,
        location_monitoring_enabled: req.location_monitoring_enabled,
    };

    let ev = event::Model::create(db, new).await?;
    info!(event_id = ev.id, status = %ev.status, "Event created");
    Ok(ev)
}

pub async fn find_event(db: &DbConn, event_id: i64) -> Result<event::Model> {
    event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or(AttendanceError::EventNotFound(event_id))
}

/// Cancels an event that has not concluded yet.
pub async fn cancel_event(db: &DbConn, event_id: i64) -> Result<event::Model> {
    loop {
        let ev = find_event(db, event_id).await?;
        if !ev.status.is_open() {
            return Err(AttendanceError::EventNotCancellable(ev.status));
        }

        if event::Model::compare_and_set_status(db, event_id, ev.status, EventStatus::Cancelled).await? {
            info!(event_id, from = %ev.status, "Event cancelled");
            return find_event(db, event_id).await;
        }
        // the status sweep moved it first; re-read and try again
    }
}

/// Attendance records of an event, ordered by student id.
pub async fn list_records(db: &DbConn, event_id: i64) -> Result<Vec<attendance_record::Model>> {
    find_event(db, event_id).await?;
    Ok(attendance_record::Model::find_for_event(db, event_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factories::{self, Fixture, Timeline};
    use chrono::Duration;
    use db::models::attendance_record::AttendanceStatus;
    use db::test_utils::setup_test_db;

    fn request(fx: &Fixture, t: &Timeline) -> CreateEvent {
        CreateEvent {
            name: "Orientation".into(),
            registration_location_id: fx.lobby.id,
            venue_location_id: fx.venue.id,
            registration_open_at: t.registration_open_at,
            start_at: t.start_at,
            end_at: t.end_at,
            eligibility: EligibilityCriteria::all_students(),
            facial_verification_enabled: false,
            location_monitoring_enabled: true,
        }
    }

    fn timeline() -> Timeline {
        Timeline::starting_at(factories::base_time(), Duration::minutes(60))
    }

    #[tokio::test]
    async fn initial_status_follows_the_schedule() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;

        let early = create_event(&db, request(&fx, &t), t.at(-120)).await.unwrap();
        let during = create_event(&db, request(&fx, &t), t.at(10)).await.unwrap();

        assert_eq!(early.status, EventStatus::Upcoming);
        assert_eq!(during.status, EventStatus::Ongoing);
    }

    #[tokio::test]
    async fn schedule_must_be_ordered() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;

        let mut req = request(&fx, &t);
        req.registration_open_at = t.at(5);
        let err = create_event(&db, req, t.at(-60)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));

        let mut req = request(&fx, &t);
        req.end_at = t.at(-1);
        let err = create_event(&db, req, t.at(-60)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));
    }

    #[tokio::test]
    async fn locations_must_exist() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;

        let mut req = request(&fx, &t);
        req.venue_location_id = 404;
        let err = create_event(&db, req, t.at(-60)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::LocationNotFound(404)));
    }

    #[tokio::test]
    async fn open_events_can_be_cancelled() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;
        let ev = create_event(&db, request(&fx, &t), t.at(-10)).await.unwrap();

        let cancelled = cancel_event(&db, ev.id).await.unwrap();
        assert_eq!(cancelled.status, EventStatus::Cancelled);

        let err = cancel_event(&db, ev.id).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotCancellable(EventStatus::Cancelled)));
    }

    #[tokio::test]
    async fn concluded_events_cannot_be_cancelled() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;
        let ev = fx
            .event(&db, &t, EventStatus::Concluded, EligibilityCriteria::all_students())
            .await;

        let err = cancel_event(&db, ev.id).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotCancellable(EventStatus::Concluded)));
    }

    #[tokio::test]
    async fn records_are_listed_by_student() {
        let db = setup_test_db().await;
        let t = timeline();
        let fx = Fixture::new(&db).await;
        let a = fx.student(&db, "2025-0001").await;
        let b = fx.student(&db, "2025-0002").await;
        let ev = fx
            .event(&db, &t, EventStatus::Ongoing, EligibilityCriteria::all_students())
            .await;
        fx.record(&db, &ev, &b, AttendanceStatus::Late, t.at(3)).await;
        fx.record(&db, &ev, &a, AttendanceStatus::Registered, t.at(-3)).await;

        let records = list_records(&db, ev.id).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.student_id).collect();
        assert_eq!(ids, [a.id, b.id]);

        let err = list_records(&db, 999).await.unwrap_err();
        assert!(matches!(err, AttendanceError::EventNotFound(999)));
    }
}
