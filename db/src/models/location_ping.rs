use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, QueryOrder, QuerySelect};

/// A single location sample appended to an attendance record's ping log.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "location_pings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub event_id: i64,
    pub student_id: i64,
    /// Server-assigned; never earlier than the previous ping of the same record.
    pub recorded_at: DateTime<Utc>,
    /// Timestamp reported by the client, kept for audit only.
    pub client_recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Containment result computed at ingestion time.
    pub inside: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert payload for a ping.
#[derive(Debug, Clone, Copy)]
pub struct NewPing {
    pub event_id: i64,
    pub student_id: i64,
    pub recorded_at: DateTime<Utc>,
    pub client_recorded_at: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub inside: bool,
}

impl Model {
    pub async fn create<C: ConnectionTrait>(db: &C, ping: NewPing) -> Result<Model, DbErr> {
        ActiveModel {
            event_id: Set(ping.event_id),
            student_id: Set(ping.student_id),
            recorded_at: Set(ping.recorded_at),
            client_recorded_at: Set(ping.client_recorded_at),
            latitude: Set(ping.latitude),
            longitude: Set(ping.longitude),
            inside: Set(ping.inside),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Full ping log of one record, oldest first.
    pub async fn find_for_record<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
        student_id: i64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::StudentId.eq(student_id))
            .order_by_asc(Column::RecordedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// The `limit` most recent pings of one record, newest first.
    pub async fn latest_for_record<C: ConnectionTrait>(
        db: &C,
        event_id: i64,
        student_id: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::EventId.eq(event_id))
            .filter(Column::StudentId.eq(student_id))
            .order_by_desc(Column::RecordedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }
}
