use db::models::location;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    /// Parsed separately so a bad shape gets a geofence error instead of a
    /// generic body rejection.
    pub boundary: serde_json::Value,
}

#[derive(Debug, Default, Serialize)]
pub struct LocationResponse {
    pub id: i64,
    pub name: String,
    pub boundary: serde_json::Value,
    pub created_at: String,
}

impl From<location::Model> for LocationResponse {
    fn from(m: location::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            boundary: serde_json::from_str(&m.boundary).unwrap_or_default(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}
