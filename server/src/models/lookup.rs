//! Status and priority lookup rows.
//!
//! Both tables are seeded at boot; the workflow depends on the status rows
//! existing (see `seeder`).

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{priorities, statuses};

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = statuses)]
pub struct Status {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = priorities)]
pub struct Priority {
    pub id: i64,
    pub name: String,
}
