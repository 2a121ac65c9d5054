use sea_orm::entity::prelude::*;
use sea_orm::Set;

/// A student as known to the organizational directory.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Institutional student number.
    pub student_number: String,
    pub name: String,
    /// Section the student is enrolled in, if any.
    pub section_id: Option<i64>,
    /// Stored reference encoding for face verification.
    #[serde(skip_serializing)]
    pub face_encoding: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::section::Entity",
        from = "Column::SectionId",
        to = "super::section::Column::Id"
    )]
    Section,
}

impl Related<super::section::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Section.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(
        db: &DbConn,
        student_number: &str,
        name: &str,
        section_id: Option<i64>,
        face_encoding: Option<&str>,
    ) -> Result<Model, DbErr> {
        ActiveModel {
            student_number: Set(student_number.to_owned()),
            name: Set(name.to_owned()),
            section_id: Set(section_id),
            face_encoding: Set(face_encoding.map(str::to_owned)),
            ..Default::default()
        }
        .insert(db)
        .await
    }
}
