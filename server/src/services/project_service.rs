//! Project CRUD, stage listing, and access-grant management.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::models::access::{NewProjectAccess, ProjectAccess};
use crate::models::project::{NewProject, Project, Stage};
use crate::schema::{project_access, projects, stages, users};
use crate::services::access_service;

pub async fn list_all(conn: &mut AsyncPgConnection) -> Result<Vec<Project>, ServerError> {
    let results = projects::table
        .order(projects::id.asc())
        .load::<Project>(conn)
        .await?;
    Ok(results)
}

/// Projects the user holds an active grant on.
pub async fn list_granted(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<Vec<Project>, ServerError> {
    let ids = access_service::granted_project_ids(conn, user_id).await?;
    let results = projects::table
        .filter(projects::id.eq_any(ids))
        .order(projects::id.asc())
        .load::<Project>(conn)
        .await?;
    Ok(results)
}

pub async fn get_project(
    conn: &mut AsyncPgConnection,
    project_id: i64,
) -> Result<Project, ServerError> {
    let project = projects::table
        .find(project_id)
        .first::<Project>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;
    Ok(project)
}

pub async fn create_project(
    conn: &mut AsyncPgConnection,
    new_project: NewProject,
) -> Result<Project, ServerError> {
    let project = diesel::insert_into(projects::table)
        .values(&new_project)
        .get_result::<Project>(conn)
        .await?;

    tracing::info!(project_id = project.id, name = %project.name, "Project created");
    Ok(project)
}

/// Partial update of project fields. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub status: Option<String>,
}

pub async fn update_project(
    conn: &mut AsyncPgConnection,
    project_id: i64,
    patch: ProjectPatch,
) -> Result<Project, ServerError> {
    let current = get_project(conn, project_id).await?;

    let project = diesel::update(projects::table.find(project_id))
        .set((
            projects::name.eq(patch.name.unwrap_or(current.name)),
            projects::description.eq(patch.description.or(current.description)),
            projects::start_date.eq(patch.start_date.or(current.start_date)),
            projects::end_date.eq(patch.end_date.or(current.end_date)),
            projects::status.eq(patch.status.or(current.status)),
        ))
        .get_result::<Project>(conn)
        .await?;

    tracing::info!(project_id, "Project updated");
    Ok(project)
}

pub async fn list_stages(
    conn: &mut AsyncPgConnection,
    project_id: i64,
) -> Result<Vec<Stage>, ServerError> {
    let results = stages::table
        .filter(stages::project_id.eq(project_id))
        .order(stages::id.asc())
        .load::<Stage>(conn)
        .await?;
    Ok(results)
}

/// One row of the per-user access listing shown to leaders.
#[derive(Debug, Serialize)]
pub struct UserProjectAccess {
    pub project_id: i64,
    pub project_name: String,
    pub has_access: bool,
}

/// Every project paired with the user's effective access flag.
pub async fn user_access_list(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<Vec<UserProjectAccess>, ServerError> {
    // Validate the user id up front so a typo reads as NotFound, not an
    // empty listing.
    let user_exists: i64 = users::table
        .filter(users::id.eq(user_id))
        .count()
        .get_result(conn)
        .await?;
    if user_exists == 0 {
        return Err(ServerError::NotFound);
    }

    let grants = project_access::table
        .filter(project_access::user_id.eq(user_id))
        .load::<ProjectAccess>(conn)
        .await?;
    let granted: std::collections::HashMap<i64, bool> = grants
        .into_iter()
        .map(|g| (g.project_id, g.has_access))
        .collect();

    let all_projects = list_all(conn).await?;
    Ok(all_projects
        .into_iter()
        .map(|p| UserProjectAccess {
            has_access: granted.get(&p.id).copied().unwrap_or(false),
            project_id: p.id,
            project_name: p.name,
        })
        .collect())
}

/// Flip (or create) the grant row for (user, project).
///
/// Upsert keeps the (user, project) pair unique: toggling access flips the
/// boolean on the existing row instead of inserting duplicates.
pub async fn set_access(
    conn: &mut AsyncPgConnection,
    user_id: i64,
    project_id: i64,
    has_access: bool,
) -> Result<(), ServerError> {
    // Resolve both ids first; a foreign-key violation would otherwise
    // surface as an opaque storage failure.
    let _ = get_project(conn, project_id).await?;
    crate::services::user_service::get_user(conn, user_id).await?;

    diesel::insert_into(project_access::table)
        .values(&NewProjectAccess {
            user_id,
            project_id,
            has_access,
        })
        .on_conflict((project_access::user_id, project_access::project_id))
        .do_update()
        .set(project_access::has_access.eq(has_access))
        .execute(conn)
        .await?;

    tracing::info!(user_id, project_id, has_access, "Project access updated");
    Ok(())
}
