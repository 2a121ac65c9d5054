use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, QueryOrder};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One student's attendance at one event. The composite key guarantees a
/// single record per `(event_id, student_id)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    /// Location the student registered at.
    pub location_id: i64,
    pub status: AttendanceStatus,
    pub time_in: Option<DateTime<Utc>>,
    pub time_out: Option<DateTime<Utc>>,
    /// Audit trail; notes are only ever appended.
    #[sea_orm(column_type = "Text", nullable)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    #[sea_orm(string_value = "registered")]
    Registered,
    #[sea_orm(string_value = "late")]
    Late,
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "idle")]
    Idle,
    #[sea_orm(string_value = "absent")]
    Absent,
}

impl AttendanceStatus {
    /// Whether a record in this status may still receive location pings.
    pub fn accepts_pings(self) -> bool {
        matches!(
            self,
            AttendanceStatus::Registered | AttendanceStatus::Late | AttendanceStatus::Present
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Appends `note` to an existing reason, keeping earlier notes intact.
pub fn append_reason(current: Option<&str>, note: &str) -> String {
    match current {
        Some(existing) if !existing.trim().is_empty() => format!("{existing}; {note}"),
        _ => note.to_owned(),
    }
}

impl Model {
    pub async fn create<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
        student_id: i64,
        location_id: i64,
        status: AttendanceStatus,
        time_in: Option<DateTime<Utc>>,
    ) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            event_id: Set(event_id),
            student_id: Set(student_id),
            location_id: Set(location_id),
            status: Set(status),
            time_in: Set(time_in),
            time_out: Set(None),
            reason: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
    }

    pub async fn find<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
        student_id: i64,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find_by_id((event_id, student_id)).one(db).await
    }

    pub async fn find_for_event<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    /// Inserts an `absent` record unless one already exists for the pair.
    ///
    /// Returns `true` when a row was written.
    pub async fn insert_absent_if_missing<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
        student_id: i64,
        location_id: i64,
        reason: &str,
    ) -> Result<bool, DbErr> {
        let now = Utc::now();
        let active = ActiveModel {
            event_id: Set(event_id),
            student_id: Set(student_id),
            location_id: Set(location_id),
            status: Set(AttendanceStatus::Absent),
            time_in: Set(None),
            time_out: Set(None),
            reason: Set(Some(reason.to_owned())),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = Entity::insert(active)
            .on_conflict(
                OnConflict::columns([Column::EventId, Column::StudentId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        Ok(inserted > 0)
    }

    /// Appends an audit note to `reason` without touching the status.
    pub async fn annotate<C: ConnectionTrait>(self, db: &C, note: &str) -> Result<Model, DbErr> {
        let reason = append_reason(self.reason.as_deref(), note);
        let mut active: ActiveModel = self.into();
        active.reason = Set(Some(reason));
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_reason_keeps_history() {
        assert_eq!(append_reason(None, "first"), "first");
        assert_eq!(append_reason(Some(""), "first"), "first");
        assert_eq!(append_reason(Some("first"), "second"), "first; second");
    }

    #[test]
    fn only_active_statuses_accept_pings() {
        assert!(AttendanceStatus::Registered.accepts_pings());
        assert!(AttendanceStatus::Late.accepts_pings());
        assert!(AttendanceStatus::Present.accepts_pings());
        assert!(!AttendanceStatus::Idle.accepts_pings());
        assert!(!AttendanceStatus::Absent.accepts_pings());
    }
}
