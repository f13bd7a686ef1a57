//! KPI queries for the tracker dashboard.

use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;

use crate::error::ServerError;

/// Defect count per workflow status.
#[derive(Debug, Serialize, QueryableByName)]
pub struct DefectsByStatus {
    #[diesel(sql_type = Text)]
    pub status: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

pub async fn query_defects_by_status(
    conn: &mut AsyncPgConnection,
) -> Result<Vec<DefectsByStatus>, ServerError> {
    let results = diesel::sql_query(
        "SELECT s.name AS status, COUNT(d.id) AS count \
         FROM statuses s \
         LEFT JOIN defects d ON d.status_id = s.id \
         GROUP BY s.id, s.name \
         ORDER BY s.id",
    )
    .load(conn)
    .await?;
    Ok(results)
}

/// Closed-defect count per assignee — who resolved how many.
#[derive(Debug, Serialize, QueryableByName)]
pub struct ClosedByAssignee {
    #[diesel(sql_type = Text)]
    pub assignee: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

pub async fn query_closed_by_assignee(
    conn: &mut AsyncPgConnection,
) -> Result<Vec<ClosedByAssignee>, ServerError> {
    let results = diesel::sql_query(
        "SELECT u.full_name AS assignee, COUNT(*) AS count \
         FROM defects d \
         JOIN users u ON u.id = d.assignee_id \
         JOIN statuses s ON s.id = d.status_id \
         WHERE s.name = 'Closed' \
         GROUP BY u.id, u.full_name \
         ORDER BY count DESC",
    )
    .load(conn)
    .await?;
    Ok(results)
}

/// Closed-defect count per project.
#[derive(Debug, Serialize, QueryableByName)]
pub struct ClosedByProject {
    #[diesel(sql_type = Text)]
    pub project: String,
    #[diesel(sql_type = BigInt)]
    pub count: i64,
}

pub async fn query_closed_by_project(
    conn: &mut AsyncPgConnection,
) -> Result<Vec<ClosedByProject>, ServerError> {
    let results = diesel::sql_query(
        "SELECT p.name AS project, COUNT(*) AS count \
         FROM defects d \
         JOIN projects p ON p.id = d.project_id \
         JOIN statuses s ON s.id = d.status_id \
         WHERE s.name = 'Closed' \
         GROUP BY p.id, p.name \
         ORDER BY count DESC",
    )
    .load(conn)
    .await?;
    Ok(results)
}
