//! Defect lifecycle engine and scoped directory.
//!
//! The only code path that mutates a defect's status/assignee/due date,
//! and the only writer to the history ledger. `update` runs its whole
//! read-validate-write-audit sequence in one serializable transaction so
//! concurrent updates to the same defect cannot interleave.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use std::collections::{HashMap, HashSet};

use crate::error::ServerError;
use crate::lifecycle::{self, DefectStatus};
use crate::models::defect::{Defect, NewDefect};
use crate::models::history::HistoryAction;
use crate::models::lookup::{Priority, Status};
use crate::models::project::{Project, Stage};
use crate::models::user::User;
use crate::principal::{Principal, Role};
use crate::schema::{defects, priorities, projects, stages, statuses, users};
use crate::services::access_service::{self, DefectOwnership};
use crate::services::{history_service, lookup_service, project_service, user_service};

/// Ledger display value for the empty assignee side.
const UNASSIGNED: &str = "Not assigned";
/// Ledger display value for the empty due-date side.
const UNRESOLVED: &str = "Not resolved";

/// A defect with its relations resolved.
#[derive(Debug, Clone)]
pub struct DefectDetail {
    pub defect: Defect,
    pub project: Project,
    pub stage: Option<Stage>,
    pub creator: User,
    pub assignee: Option<User>,
    pub priority: Priority,
    pub status: Status,
}

/// Requested changes to the mutable defect fields.
///
/// The outer `Option` means "present in the request"; for assignee and due
/// date the inner `Option` distinguishes set from cleared. Only a present
/// `status_id` triggers the workflow guard; assignee and due-date edits on
/// their own are plain field changes.
#[derive(Debug, Default, Clone)]
pub struct DefectPatch {
    pub status_id: Option<i64>,
    pub assignee_id: Option<Option<i64>>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Input for defect creation. Status, assignee, and due date are not
/// caller-controlled: every defect starts in "New", unassigned.
#[derive(Debug)]
pub struct CreateDefect {
    pub title: String,
    pub description: String,
    pub project_id: i64,
    pub stage_id: Option<i64>,
    pub creator_id: i64,
    pub priority_id: i64,
}

/// Create a defect in the initial workflow status.
///
/// Authorization is the caller's job (`access_service::can_create_defect`);
/// this only enforces referential consistency.
pub async fn create(
    conn: &mut AsyncPgConnection,
    input: CreateDefect,
) -> Result<DefectDetail, ServerError> {
    let new_status = lookup_service::status_by_name(conn, DefectStatus::New.name()).await?;

    project_service::get_project(conn, input.project_id).await?;
    lookup_service::priority_by_id(conn, input.priority_id).await?;

    // A stage, when given, must belong to the defect's project.
    if let Some(stage_id) = input.stage_id {
        let stage = stages::table
            .find(stage_id)
            .first::<Stage>(conn)
            .await
            .optional()?
            .ok_or(ServerError::NotFound)?;
        if stage.project_id != input.project_id {
            return Err(ServerError::NotFound);
        }
    }

    let defect = diesel::insert_into(defects::table)
        .values(&NewDefect {
            title: input.title,
            description: input.description,
            project_id: input.project_id,
            stage_id: input.stage_id,
            creator_id: input.creator_id,
            assignee_id: None,
            priority_id: input.priority_id,
            status_id: new_status.id,
            due_date: None,
        })
        .get_result::<Defect>(conn)
        .await?;

    crate::metrics::defect_created();
    tracing::info!(
        defect_id = defect.id,
        project_id = defect.project_id,
        creator_id = defect.creator_id,
        "Defect created"
    );

    load_detail(conn, defect.id).await
}

/// Apply a patch to a defect's status/assignee/due date.
///
/// Either the whole patch is applied, with one ledger entry per changed
/// field, or nothing is. Runs serializable so two racing updates cannot
/// both validate against the same stale state.
pub async fn update(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
    patch: DefectPatch,
    principal: Principal,
) -> Result<DefectDetail, ServerError> {
    conn.build_transaction()
        .serializable()
        .run(|conn| {
            async move {
                let defect = defects::table
                    .find(defect_id)
                    .first::<Defect>(conn)
                    .await
                    .optional()?
                    .ok_or(ServerError::NotFound)?;

                let ownership = DefectOwnership {
                    project_id: defect.project_id,
                    creator_id: defect.creator_id,
                    assignee_id: defect.assignee_id,
                };
                if !access_service::can_view_defect(conn, principal, ownership).await? {
                    crate::metrics::access_denied("defect_update");
                    return Err(ServerError::Forbidden(
                        "No access to this defect.".to_string(),
                    ));
                }

                // Workflow guard, only when a status change was requested.
                let mut status_change: Option<(Status, Status)> = None;
                if let Some(target_id) = patch.status_id {
                    let current = lookup_service::status_by_id(conn, defect.status_id).await?;
                    let target = lookup_service::status_by_id(conn, target_id).await?;
                    let from = DefectStatus::from_name(&current.name)
                        .ok_or(ServerError::SeedDataMissing("workflow status"))?;
                    let to = DefectStatus::from_name(&target.name).ok_or_else(|| {
                        ServerError::InvalidTransition(format!(
                            "\"{}\" is not a workflow status.",
                            target.name
                        ))
                    })?;
                    lifecycle::check_transition(
                        from,
                        to,
                        principal.role,
                        principal.id,
                        defect.assignee_id,
                    )?;
                    status_change = Some((current, target));
                }

                // Resolve assignee display names up front: this validates a
                // newly assigned user id before anything is written.
                let mut assignee_change: Option<(String, String)> = None;
                if let Some(new_assignee) = patch.assignee_id {
                    if new_assignee != defect.assignee_id {
                        let old_name = display_assignee(conn, defect.assignee_id).await?;
                        let new_name = display_assignee(conn, new_assignee).await?;
                        assignee_change = Some((old_name, new_name));
                    }
                }

                let mut due_change: Option<(String, String)> = None;
                if let Some(new_due) = patch.due_date {
                    if new_due != defect.due_date {
                        due_change = Some((display_due(defect.due_date), display_due(new_due)));
                    }
                }

                // One combined write for every present patch field.
                diesel::update(defects::table.find(defect_id))
                    .set((
                        defects::status_id
                            .eq(patch.status_id.unwrap_or(defect.status_id)),
                        defects::assignee_id
                            .eq(patch.assignee_id.unwrap_or(defect.assignee_id)),
                        defects::due_date.eq(patch.due_date.unwrap_or(defect.due_date)),
                        defects::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)
                    .await?;

                // Ledger entries for each field that actually changed.
                if let Some((current, target)) = &status_change {
                    history_service::record(
                        conn,
                        defect_id,
                        principal.id,
                        HistoryAction::StatusChanged,
                        Some(current.name.clone()),
                        Some(target.name.clone()),
                    )
                    .await?;
                    crate::metrics::defect_status_changed(&target.name);
                    tracing::info!(
                        defect_id,
                        from = %current.name,
                        to = %target.name,
                        actor = principal.id,
                        "Defect status changed"
                    );
                }
                if let Some((old_name, new_name)) = assignee_change {
                    history_service::record(
                        conn,
                        defect_id,
                        principal.id,
                        HistoryAction::AssigneeChanged,
                        Some(old_name),
                        Some(new_name),
                    )
                    .await?;
                }
                if let Some((old_due, new_due)) = due_change {
                    history_service::record(
                        conn,
                        defect_id,
                        principal.id,
                        HistoryAction::DueDateChanged,
                        Some(old_due),
                        Some(new_due),
                    )
                    .await?;
                }

                load_detail(conn, defect_id).await
            }
            .scope_boxed()
        })
        .await
}

/// Load a single defect with the caller's visibility enforced.
pub async fn get_visible(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
    principal: Principal,
) -> Result<DefectDetail, ServerError> {
    let detail = load_detail(conn, defect_id).await?;
    let ownership = DefectOwnership {
        project_id: detail.defect.project_id,
        creator_id: detail.defect.creator_id,
        assignee_id: detail.defect.assignee_id,
    };
    if !access_service::can_view_defect(conn, principal, ownership).await? {
        crate::metrics::access_denied("defect_view");
        return Err(ServerError::Forbidden("No access to this defect.".to_string()));
    }
    Ok(detail)
}

/// Ownership facts only, for gating history/comment routes without loading
/// the full relation set.
pub async fn ownership(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<DefectOwnership, ServerError> {
    let (project_id, creator_id, assignee_id) = defects::table
        .find(defect_id)
        .select((defects::project_id, defects::creator_id, defects::assignee_id))
        .first::<(i64, i64, Option<i64>)>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;
    Ok(DefectOwnership {
        project_id,
        creator_id,
        assignee_id,
    })
}

/// Directory listing: leaders see everything; everyone else sees defects in
/// projects they hold an active grant on.
///
/// Creator/assignee visibility outside granted projects applies only to the
/// single-defect fetch path, not here. That asymmetry is intentional.
pub async fn list_visible(
    conn: &mut AsyncPgConnection,
    principal: Principal,
) -> Result<(Vec<DefectDetail>, Vec<Project>), ServerError> {
    let (defect_rows, project_rows) = if principal.role == Role::Leader {
        let defect_rows = defects::table
            .order(defects::id.asc())
            .load::<Defect>(conn)
            .await?;
        (defect_rows, project_service::list_all(conn).await?)
    } else {
        let granted = access_service::granted_project_ids(conn, principal.id).await?;
        let defect_rows = defects::table
            .filter(defects::project_id.eq_any(granted.clone()))
            .order(defects::id.asc())
            .load::<Defect>(conn)
            .await?;
        let project_rows = projects::table
            .filter(projects::id.eq_any(granted))
            .order(projects::id.asc())
            .load::<Project>(conn)
            .await?;
        (defect_rows, project_rows)
    };

    let details = load_details(conn, defect_rows).await?;
    Ok((details, project_rows))
}

/// Load one defect with all relations.
pub async fn load_detail(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<DefectDetail, ServerError> {
    let defect = defects::table
        .find(defect_id)
        .first::<Defect>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;

    let project = project_service::get_project(conn, defect.project_id).await?;
    let stage = match defect.stage_id {
        Some(stage_id) => stages::table
            .find(stage_id)
            .first::<Stage>(conn)
            .await
            .optional()?,
        None => None,
    };
    let creator = user_service::get_user(conn, defect.creator_id).await?;
    let assignee = match defect.assignee_id {
        Some(user_id) => Some(user_service::get_user(conn, user_id).await?),
        None => None,
    };
    let priority = lookup_service::priority_by_id(conn, defect.priority_id).await?;
    let status = lookup_service::status_by_id(conn, defect.status_id).await?;

    Ok(DefectDetail {
        defect,
        project,
        stage,
        creator,
        assignee,
        priority,
        status,
    })
}

/// Batch-resolve relations for a page of defects.
async fn load_details(
    conn: &mut AsyncPgConnection,
    rows: Vec<Defect>,
) -> Result<Vec<DefectDetail>, ServerError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut user_ids: HashSet<i64> = HashSet::new();
    let mut project_ids: HashSet<i64> = HashSet::new();
    let mut stage_ids: HashSet<i64> = HashSet::new();
    for d in &rows {
        user_ids.insert(d.creator_id);
        user_ids.extend(d.assignee_id);
        project_ids.insert(d.project_id);
        stage_ids.extend(d.stage_id);
    }

    let user_map: HashMap<i64, User> = users::table
        .filter(users::id.eq_any(user_ids.into_iter().collect::<Vec<_>>()))
        .load::<User>(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let project_map: HashMap<i64, Project> = projects::table
        .filter(projects::id.eq_any(project_ids.into_iter().collect::<Vec<_>>()))
        .load::<Project>(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let stage_map: HashMap<i64, Stage> = stages::table
        .filter(stages::id.eq_any(stage_ids.into_iter().collect::<Vec<_>>()))
        .load::<Stage>(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let priority_map: HashMap<i64, Priority> = priorities::table
        .load::<Priority>(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let status_map: HashMap<i64, Status> = statuses::table
        .load::<Status>(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let mut details = Vec::with_capacity(rows.len());
    for defect in rows {
        let detail = DefectDetail {
            project: project_map
                .get(&defect.project_id)
                .cloned()
                .ok_or_else(|| dangling(defect.id, "project"))?,
            stage: defect.stage_id.and_then(|id| stage_map.get(&id).cloned()),
            creator: user_map
                .get(&defect.creator_id)
                .cloned()
                .ok_or_else(|| dangling(defect.id, "creator"))?,
            assignee: defect.assignee_id.and_then(|id| user_map.get(&id).cloned()),
            priority: priority_map
                .get(&defect.priority_id)
                .cloned()
                .ok_or_else(|| dangling(defect.id, "priority"))?,
            status: status_map
                .get(&defect.status_id)
                .cloned()
                .ok_or_else(|| dangling(defect.id, "status"))?,
            defect,
        };
        details.push(detail);
    }
    Ok(details)
}

fn dangling(defect_id: i64, relation: &str) -> ServerError {
    ServerError::Storage(anyhow::anyhow!(
        "defect {defect_id} references a missing {relation} row"
    ))
}

async fn display_assignee(
    conn: &mut AsyncPgConnection,
    assignee_id: Option<i64>,
) -> Result<String, ServerError> {
    match assignee_id {
        Some(user_id) => Ok(user_service::get_user(conn, user_id).await?.full_name),
        None => Ok(UNASSIGNED.to_string()),
    }
}

fn display_due(due: Option<NaiveDate>) -> String {
    match due {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => UNRESOLVED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_display_uses_sentinel_for_the_null_side() {
        assert_eq!(display_due(None), "Not resolved");
        let date = NaiveDate::from_ymd_opt(2025, 8, 15).unwrap();
        assert_eq!(display_due(Some(date)), "2025-08-15");
    }
}
