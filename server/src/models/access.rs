//! Per-user-per-project access grants.
//!
//! At most one row per (user, project); toggling access flips has_access
//! rather than inserting duplicates. Absence of a row means no access.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::project_access;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = project_access)]
pub struct ProjectAccess {
    pub id: i64,
    pub user_id: i64,
    pub project_id: i64,
    pub has_access: bool,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize)]
#[diesel(table_name = project_access)]
pub struct NewProjectAccess {
    pub user_id: i64,
    pub project_id: i64,
    pub has_access: bool,
}
