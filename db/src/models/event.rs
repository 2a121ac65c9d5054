use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::Set, QueryOrder, sea_query::Expr};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A scheduled event whose attendance is tracked.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// Geofence students must be inside to register.
    pub registration_location_id: i64,
    /// Geofence pings are evaluated against while the event runs.
    pub venue_location_id: i64,
    pub registration_open_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: EventStatus,
    /// Serialized eligibility criteria.
    #[sea_orm(column_type = "Text")]
    pub eligibility: String,
    pub facial_verification_enabled: bool,
    pub location_monitoring_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle phase of an event.
///
/// Variants are declared in lifecycle order; `Cancelled` sits outside it.
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
pub enum EventStatus {
    #[sea_orm(string_value = "upcoming")]
    Upcoming,
    #[sea_orm(string_value = "registration")]
    Registration,
    #[sea_orm(string_value = "ongoing")]
    Ongoing,
    #[sea_orm(string_value = "concluded")]
    Concluded,
    #[sea_orm(string_value = "finalized")]
    Finalized,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl EventStatus {
    /// Position in the forward lifecycle. `None` for `Cancelled`.
    pub fn rank(self) -> Option<u8> {
        match self {
            EventStatus::Upcoming => Some(0),
            EventStatus::Registration => Some(1),
            EventStatus::Ongoing => Some(2),
            EventStatus::Concluded => Some(3),
            EventStatus::Finalized => Some(4),
            EventStatus::Cancelled => None,
        }
    }

    /// States that can still be cancelled or advanced by the status sweep.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            EventStatus::Upcoming | EventStatus::Registration | EventStatus::Ongoing
        )
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::RegistrationLocationId",
        to = "super::location::Column::Id"
    )]
    RegistrationLocation,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::VenueLocationId",
        to = "super::location::Column::Id"
    )]
    VenueLocation,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert payload for a new event. Validation happens in the service layer.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub registration_location_id: i64,
    pub venue_location_id: i64,
    pub registration_open_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: EventStatus,
    pub eligibility: String,
    pub facial_verification_enabled: bool,
    pub location_monitoring_enabled: bool,
}

impl Model {
    pub async fn create(db: &DbConn, new: NewEvent) -> Result<Model, DbErr> {
        let now = Utc::now();

        ActiveModel {
            name: Set(new.name),
            registration_location_id: Set(new.registration_location_id),
            venue_location_id: Set(new.venue_location_id),
            registration_open_at: Set(new.registration_open_at),
            start_at: Set(new.start_at),
            end_at: Set(new.end_at),
            status: Set(new.status),
            eligibility: Set(new.eligibility),
            facial_verification_enabled: Set(new.facial_verification_enabled),
            location_monitoring_enabled: Set(new.location_monitoring_enabled),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find_by_status(db: &DbConn, statuses: &[EventStatus]) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(Column::Status.is_in(statuses.iter().copied()))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Moves the event from `from` to `to` only if it is still in `from`.
    ///
    /// Returns `false` when another writer changed the status first.
    pub async fn compare_and_set_status<C: ConnectionTrait>(
        db: &C,
        id: i64,
        from: EventStatus,
        to: EventStatus,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(to))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(from))
            .exec(db)
            .await?;

        Ok(res.rows_affected == 1)
    }
}
