//! Resolves who is expected to attend an event.
//!
//! Criteria broaden eligibility: every listed section, course and cluster adds
//! its students to the audience. A student reachable through several paths is
//! counted once.

use std::collections::BTreeSet;

use db::models::{course, section, student};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::error::{AttendanceError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    #[serde(default)]
    pub all_students: bool,
    #[serde(default)]
    pub section_ids: BTreeSet<i64>,
    #[serde(default)]
    pub course_ids: BTreeSet<i64>,
    #[serde(default)]
    pub cluster_ids: BTreeSet<i64>,
}

impl EligibilityCriteria {
    pub fn all_students() -> Self {
        Self {
            all_students: true,
            ..Default::default()
        }
    }

    /// True when the criteria select nobody.
    pub fn is_empty(&self) -> bool {
        !self.all_students
            && self.section_ids.is_empty()
            && self.course_ids.is_empty()
            && self.cluster_ids.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AttendanceError::Corrupt(format!("eligibility criteria: {e}")))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Every section selected by the criteria, directly or through a course or cluster.
async fn selected_sections<C: ConnectionTrait>(
    db: &C,
    criteria: &EligibilityCriteria,
) -> std::result::Result<BTreeSet<i64>, DbErr> {
    let mut course_ids = criteria.course_ids.clone();
    if !criteria.cluster_ids.is_empty() {
        let under_clusters: Vec<i64> = course::Entity::find()
            .select_only()
            .column(course::Column::Id)
            .filter(course::Column::ClusterId.is_in(criteria.cluster_ids.iter().copied()))
            .into_tuple()
            .all(db)
            .await?;
        course_ids.extend(under_clusters);
    }

    let mut section_ids = criteria.section_ids.clone();
    if !course_ids.is_empty() {
        let under_courses: Vec<i64> = section::Entity::find()
            .select_only()
            .column(section::Column::Id)
            .filter(section::Column::CourseId.is_in(course_ids))
            .into_tuple()
            .all(db)
            .await?;
        section_ids.extend(under_courses);
    }

    Ok(section_ids)
}

/// Resolves the full audience of an event.
pub async fn resolve_audience<C: ConnectionTrait>(
    db: &C,
    criteria: &EligibilityCriteria,
) -> std::result::Result<BTreeSet<i64>, DbErr> {
    let query = student::Entity::find()
        .select_only()
        .column(student::Column::Id);

    if criteria.all_students {
        let ids: Vec<i64> = query.into_tuple().all(db).await?;
        return Ok(ids.into_iter().collect());
    }

    let sections = selected_sections(db, criteria).await?;
    if sections.is_empty() {
        return Ok(BTreeSet::new());
    }

    let ids: Vec<i64> = query
        .filter(student::Column::SectionId.is_in(sections))
        .into_tuple()
        .all(db)
        .await?;

    Ok(ids.into_iter().collect())
}

/// Whether one student belongs to the audience, without resolving all of it.
pub async fn is_eligible<C: ConnectionTrait>(
    db: &C,
    criteria: &EligibilityCriteria,
    student: &student::Model,
) -> std::result::Result<bool, DbErr> {
    if criteria.all_students {
        return Ok(true);
    }
    let Some(section_id) = student.section_id else {
        return Ok(false);
    };
    if criteria.section_ids.contains(&section_id) {
        return Ok(true);
    }
    if criteria.course_ids.is_empty() && criteria.cluster_ids.is_empty() {
        return Ok(false);
    }

    let Some(section) = section::Entity::find_by_id(section_id).one(db).await? else {
        return Ok(false);
    };
    if criteria.course_ids.contains(&section.course_id) {
        return Ok(true);
    }

    let cluster_id: Option<i64> = course::Entity::find_by_id(section.course_id)
        .select_only()
        .column(course::Column::ClusterId)
        .into_tuple()
        .one(db)
        .await?;

    Ok(cluster_id.is_some_and(|id| criteria.cluster_ids.contains(&id)))
}
