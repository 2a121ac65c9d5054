//! Fixtures for tests in this crate and in the API crate.

use chrono::{DateTime, Duration, TimeZone, Utc};
use db::models::{
    attendance_record::{self, AttendanceStatus},
    event::{self, EventStatus, NewEvent},
    location, location_ping, student,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};

use crate::eligibility::EligibilityCriteria;
use crate::geofence::{Boundary, Point};
use crate::location::create_location;

/// 2025-10-01 08:00:00 UTC.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Registration opens 30 minutes before the start.
#[derive(Debug, Clone, Copy)]
pub struct Timeline {
    pub registration_open_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Timeline {
    pub fn starting_at(start_at: DateTime<Utc>, length: Duration) -> Self {
        Self {
            registration_open_at: start_at - Duration::minutes(30),
            start_at,
            end_at: start_at + length,
        }
    }

    /// `minutes` relative to the start (negative before it).
    pub fn at(&self, minutes: i64) -> DateTime<Utc> {
        self.start_at + Duration::minutes(minutes)
    }
}

/// An unsaved event model on `t`, for pure lifecycle checks.
pub fn event_model(t: &Timeline, status: EventStatus) -> event::Model {
    event::Model {
        id: 0,
        name: "Fixture".into(),
        registration_location_id: 0,
        venue_location_id: 0,
        registration_open_at: t.registration_open_at,
        start_at: t.start_at,
        end_at: t.end_at,
        status,
        eligibility: EligibilityCriteria::all_students().to_json(),
        facial_verification_enabled: false,
        location_monitoring_enabled: true,
        created_at: t.registration_open_at,
        updated_at: t.registration_open_at,
    }
}

pub const VENUE_CENTER: Point = Point {
    lat: 14.1498,
    lon: 120.9555,
};
pub const VENUE_RADIUS_METERS: f64 = 50.0;

pub const LOBBY_CENTER: Point = Point {
    lat: 14.1520,
    lon: 120.9580,
};
pub const LOBBY_RADIUS_METERS: f64 = 30.0;

/// Roughly a kilometre north of the venue.
pub const FAR_AWAY: Point = Point {
    lat: 14.1588,
    lon: 120.9555,
};

/// A registration lobby and a venue, both circular.
pub struct Fixture {
    pub lobby: location::Model,
    pub venue: location::Model,
}

impl Fixture {
    pub async fn new(db: &DatabaseConnection) -> Self {
        let lobby = Boundary::circle(LOBBY_CENTER, LOBBY_RADIUS_METERS).expect("valid lobby");
        let venue = Boundary::circle(VENUE_CENTER, VENUE_RADIUS_METERS).expect("valid venue");

        Self {
            lobby: create_location(db, "Lobby", &lobby).await.expect("create lobby"),
            venue: create_location(db, "Venue", &venue).await.expect("create venue"),
        }
    }

    /// Insert payload with monitoring on and face verification off.
    pub fn new_event(&self, t: &Timeline, status: EventStatus, criteria: EligibilityCriteria) -> NewEvent {
        NewEvent {
            name: "Orientation".into(),
            registration_location_id: self.lobby.id,
            venue_location_id: self.venue.id,
            registration_open_at: t.registration_open_at,
            start_at: t.start_at,
            end_at: t.end_at,
            status,
            eligibility: criteria.to_json(),
            facial_verification_enabled: false,
            location_monitoring_enabled: true,
        }
    }

    pub async fn event(
        &self,
        db: &DatabaseConnection,
        t: &Timeline,
        status: EventStatus,
        criteria: EligibilityCriteria,
    ) -> event::Model {
        event::Model::create(db, self.new_event(t, status, criteria))
            .await
            .expect("create event")
    }

    pub async fn student(&self, db: &DatabaseConnection, number: &str) -> student::Model {
        student::Model::create(db, number, "Test Student", None, None)
            .await
            .expect("create student")
    }

    pub async fn record(
        &self,
        db: &DatabaseConnection,
        ev: &event::Model,
        student: &student::Model,
        status: AttendanceStatus,
        time_in: DateTime<Utc>,
    ) -> attendance_record::Model {
        attendance_record::Model::create(db, ev.id, student.id, ev.registration_location_id, status, Some(time_in))
            .await
            .expect("create attendance record")
    }
}

pub async fn ping(
    db: &DatabaseConnection,
    event_id: i64,
    student_id: i64,
    at: DateTime<Utc>,
    inside: bool,
) -> location_ping::Model {
    let at_point = if inside { VENUE_CENTER } else { FAR_AWAY };
    location_ping::Model::create(
        db,
        location_ping::NewPing {
            event_id,
            student_id,
            recorded_at: at,
            client_recorded_at: at,
            latitude: at_point.lat,
            longitude: at_point.lon,
            inside,
        },
    )
    .await
    .expect("create ping")
}

pub async fn reload_event(db: &DatabaseConnection, id: i64) -> event::Model {
    event::Entity::find_by_id(id)
        .one(db)
        .await
        .expect("query event")
        .expect("event exists")
}

/// Makes every later update of `student_id`'s attendance records fail inside SQLite.
pub async fn block_record_updates(db: &DatabaseConnection, student_id: i64) {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER block_record_updates_{student_id} \
         BEFORE UPDATE ON attendance_records \
         WHEN OLD.student_id = {student_id} \
         BEGIN SELECT RAISE(ABORT, 'record is locked'); END;"
    ))
    .await
    .expect("create blocking trigger");
}
