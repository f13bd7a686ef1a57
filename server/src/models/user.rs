//! User rows — provisioning data for display names and assignment.
//!
//! Credentials and token issuance live in the upstream auth gateway; this
//! table only carries what the tracker needs to resolve principals.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::users;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}
