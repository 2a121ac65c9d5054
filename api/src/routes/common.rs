//! Response models shared by several route groups.

use db::models::attendance_record;
use serde::Serialize;
use validator::ValidationErrors;

/// Joins the messages of every failed field into one line.
pub fn format_validation_errors(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| {
            errs.iter()
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Default, Serialize)]
pub struct RecordResponse {
    pub event_id: i64,
    pub student_id: i64,
    pub location_id: i64,
    pub status: String,
    pub time_in: Option<String>,
    pub time_out: Option<String>,
    pub reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<attendance_record::Model> for RecordResponse {
    fn from(r: attendance_record::Model) -> Self {
        Self {
            event_id: r.event_id,
            student_id: r.student_id,
            location_id: r.location_id,
            status: r.status.to_string(),
            time_in: r.time_in.map(|t| t.to_rfc3339()),
            time_out: r.time_out.map(|t| t.to_rfc3339()),
            reason: r.reason,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}
