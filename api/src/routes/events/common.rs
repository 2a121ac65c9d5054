use chrono::{DateTime, Utc};
use db::models::event;
use serde::{Deserialize, Serialize};
use services::eligibility::EligibilityCriteria;
use services::event::CreateEvent;
use services::presence::PingOutcome;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub registration_location_id: i64,
    pub venue_location_id: i64,
    pub registration_open_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub eligibility: EligibilityCriteria,
    #[serde(default)]
    pub facial_verification_enabled: bool,
    #[serde(default = "enabled")]
    pub location_monitoring_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl From<CreateEventRequest> for CreateEvent {
    fn from(r: CreateEventRequest) -> Self {
        Self {
            name: r.name,
            registration_location_id: r.registration_location_id,
            venue_location_id: r.venue_location_id,
            registration_open_at: r.registration_open_at,
            start_at: r.start_at,
            end_at: r.end_at,
            eligibility: r.eligibility,
            facial_verification_enabled: r.facial_verification_enabled,
            location_monitoring_enabled: r.location_monitoring_enabled,
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EventResponse {
    pub id: i64,
    pub name: String,
    pub registration_location_id: i64,
    pub venue_location_id: i64,
    pub registration_open_at: String,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub eligibility: serde_json::Value,
    pub facial_verification_enabled: bool,
    pub location_monitoring_enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<event::Model> for EventResponse {
    fn from(m: event::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            registration_location_id: m.registration_location_id,
            venue_location_id: m.venue_location_id,
            registration_open_at: m.registration_open_at.to_rfc3339(),
            start_at: m.start_at.to_rfc3339(),
            end_at: m.end_at.to_rfc3339(),
            status: m.status.to_string(),
            eligibility: serde_json::from_str(&m.eligibility).unwrap_or_default(),
            facial_verification_enabled: m.facial_verification_enabled,
            location_monitoring_enabled: m.location_monitoring_enabled,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    pub student_id: i64,
    pub claimed_location_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub face_sample: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PingBody {
    pub student_id: i64,
    pub claimed_location_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub client_timestamp: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize)]
pub struct PingResponse {
    pub inside: bool,
    pub recorded_at: String,
    pub flagged_outside: bool,
}

impl From<PingOutcome> for PingResponse {
    fn from(o: PingOutcome) -> Self {
        Self {
            inside: o.inside,
            recorded_at: o.recorded_at.to_rfc3339(),
            flagged_outside: o.flagged_outside,
        }
    }
}
