//! Status and priority resolution.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::ServerError;
use crate::models::lookup::{Priority, Status};
use crate::schema::{priorities, statuses};

/// Resolve a status by id. Unknown id is a caller error (NotFound).
pub async fn status_by_id(
    conn: &mut AsyncPgConnection,
    status_id: i64,
) -> Result<Status, ServerError> {
    let status = statuses::table
        .find(status_id)
        .first::<Status>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;
    Ok(status)
}

/// Resolve a well-known status by name.
///
/// The seeded workflow rows are load-bearing; a missing row means the
/// deployment is broken, not that the caller asked for something wrong.
pub async fn status_by_name(
    conn: &mut AsyncPgConnection,
    name: &'static str,
) -> Result<Status, ServerError> {
    let status = statuses::table
        .filter(statuses::name.eq(name))
        .first::<Status>(conn)
        .await
        .optional()?
        .ok_or(ServerError::SeedDataMissing(name))?;
    Ok(status)
}

pub async fn priority_by_id(
    conn: &mut AsyncPgConnection,
    priority_id: i64,
) -> Result<Priority, ServerError> {
    let priority = priorities::table
        .find(priority_id)
        .first::<Priority>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;
    Ok(priority)
}

pub async fn list_statuses(conn: &mut AsyncPgConnection) -> Result<Vec<Status>, ServerError> {
    let results = statuses::table
        .order(statuses::id.asc())
        .load::<Status>(conn)
        .await?;
    Ok(results)
}

pub async fn list_priorities(conn: &mut AsyncPgConnection) -> Result<Vec<Priority>, ServerError> {
    let results = priorities::table
        .order(priorities::id.asc())
        .load::<Priority>(conn)
        .await?;
    Ok(results)
}
