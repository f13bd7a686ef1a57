//! Defect rows — the central entity of the tracker.
//!
//! status_id always references one of the four seeded workflow statuses;
//! status/assignee/due_date are only mutated through the lifecycle service.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::defects;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = defects)]
pub struct Defect {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub project_id: i64,
    pub stage_id: Option<i64>,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub priority_id: i64,
    pub status_id: i64,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = defects)]
pub struct NewDefect {
    pub title: String,
    pub description: String,
    pub project_id: i64,
    pub stage_id: Option<i64>,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
    pub priority_id: i64,
    pub status_id: i64,
    pub due_date: Option<NaiveDate>,
}
