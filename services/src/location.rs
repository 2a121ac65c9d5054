use db::models::location;
use sea_orm::{ConnectionTrait, DbConn, EntityTrait};

use crate::error::{AttendanceError, Result};
use crate::geofence::Boundary;

/// Stores a new geofence. The boundary was validated when it was built.
pub async fn create_location(db: &DbConn, name: &str, boundary: &Boundary) -> Result<location::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AttendanceError::Validation("location name cannot be empty".into()));
    }

    Ok(location::Model::create(db, name, boundary.to_json()).await?)
}

/// Loads a location together with its parsed boundary.
pub async fn load_location<C: ConnectionTrait>(db: &C, id: i64) -> Result<(location::Model, Boundary)> {
    let model = location::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(AttendanceError::LocationNotFound(id))?;

    let boundary = Boundary::from_json(&model.boundary)
        .map_err(|e| AttendanceError::Corrupt(format!("location {id}: {e}")))?;

    Ok((model, boundary))
}
