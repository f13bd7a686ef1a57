//! JSON shapes for the REST API, and request-body interpretation.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ServerError;
use crate::models::comment::Comment;
use crate::models::history::HistoryEntry;
use crate::models::project::{Project, Stage};
use crate::models::user::User;
use crate::schema::users;
use crate::services::defect_service::{DefectDetail, DefectPatch};
use crate::services::{comment_service, history_service};

// ── Response shapes ──

#[derive(Debug, Serialize)]
pub struct UserJson {
    pub id: i64,
    pub full_name: String,
    pub role: String,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        UserJson {
            id: user.id,
            full_name: user.full_name,
            role: user.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LookupJson {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectRefJson {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct StageJson {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
}

impl From<Stage> for StageJson {
    fn from(stage: Stage) -> Self {
        StageJson {
            id: stage.id,
            project_id: stage.project_id,
            name: stage.name,
        }
    }
}

/// A defect with its relations, as returned by every defect endpoint.
#[derive(Debug, Serialize)]
pub struct DefectJson {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub project: ProjectRefJson,
    pub stage: Option<StageJson>,
    pub creator: UserJson,
    pub assignee: Option<UserJson>,
    pub priority: LookupJson,
    pub status: LookupJson,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DefectDetail> for DefectJson {
    fn from(detail: DefectDetail) -> Self {
        DefectJson {
            id: detail.defect.id,
            title: detail.defect.title,
            description: detail.defect.description,
            project: ProjectRefJson {
                id: detail.project.id,
                name: detail.project.name,
            },
            stage: detail.stage.map(StageJson::from),
            creator: detail.creator.into(),
            assignee: detail.assignee.map(UserJson::from),
            priority: LookupJson {
                id: detail.priority.id,
                name: detail.priority.name,
            },
            status: LookupJson {
                id: detail.status.id,
                name: detail.status.name,
            },
            due_date: detail.defect.due_date,
            created_at: detail.defect.created_at,
            updated_at: detail.defect.updated_at,
        }
    }
}

/// Directory listing payload: visible defects plus their projects.
#[derive(Debug, Serialize)]
pub struct DefectListJson {
    pub defects: Vec<DefectJson>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct HistoryJson {
    pub id: i64,
    pub user: Option<UserJson>,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CommentJson {
    pub id: i64,
    pub user: Option<UserJson>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Report payload handed to the external renderer.
#[derive(Debug, Serialize)]
pub struct DefectReportJson {
    pub defect: DefectJson,
    pub history: Vec<HistoryJson>,
    pub comments: Vec<CommentJson>,
    pub generated_at: DateTime<Utc>,
}

/// History of a defect with author names resolved, ascending.
pub async fn defect_history_json(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<Vec<HistoryJson>, ServerError> {
    let entries = history_service::list_by_defect(conn, defect_id).await?;
    let user_map = load_users(conn, entries.iter().map(|e| e.user_id)).await?;

    Ok(entries
        .into_iter()
        .map(|entry: HistoryEntry| HistoryJson {
            user: user_map.get(&entry.user_id).cloned().map(UserJson::from),
            id: entry.id,
            action: entry.action,
            old_value: entry.old_value,
            new_value: entry.new_value,
            created_at: entry.created_at,
        })
        .collect())
}

/// Comment thread with author names resolved, ascending.
pub async fn defect_comments_json(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<Vec<CommentJson>, ServerError> {
    let thread = comment_service::list_by_defect(conn, defect_id).await?;
    let user_map = load_users(conn, thread.iter().map(|c| c.user_id)).await?;

    Ok(thread
        .into_iter()
        .map(|comment: Comment| CommentJson {
            user: user_map.get(&comment.user_id).cloned().map(UserJson::from),
            id: comment.id,
            content: comment.content,
            created_at: comment.created_at,
        })
        .collect())
}

async fn load_users(
    conn: &mut AsyncPgConnection,
    ids: impl Iterator<Item = i64>,
) -> Result<HashMap<i64, User>, ServerError> {
    let ids: Vec<i64> = {
        let mut v: Vec<i64> = ids.collect();
        v.sort_unstable();
        v.dedup();
        v
    };
    let rows = users::table
        .filter(users::id.eq_any(ids))
        .load::<User>(conn)
        .await?;
    Ok(rows.into_iter().map(|u| (u.id, u)).collect())
}

// ── Request shapes ──

#[derive(Debug, Deserialize)]
pub struct CreateDefectRequest {
    pub title: String,
    pub description: String,
    pub project_id: i64,
    pub stage_id: Option<i64>,
    pub priority_id: i64,
}

/// Raw update body. `assignee_id: 0` clears the assignee; `due_date: ""`
/// clears the due date.
#[derive(Debug, Deserialize)]
pub struct UpdateDefectRequest {
    pub status_id: Option<i64>,
    pub assignee_id: Option<i64>,
    pub due_date: Option<String>,
}

/// Turn the wire form into the engine's patch, resolving the clear
/// sentinels and parsing the date. Errors are user-facing sentences.
pub fn interpret_patch(req: UpdateDefectRequest) -> Result<DefectPatch, String> {
    let assignee_id = req.assignee_id.map(|id| if id == 0 { None } else { Some(id) });

    let due_date = match req.due_date.as_deref() {
        None => None,
        Some("") => Some(None),
        Some(raw) => {
            let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| format!("\"{raw}\" is not a valid date (expected YYYY-MM-DD)."))?;
            Some(Some(parsed))
        }
    };

    Ok(DefectPatch {
        status_id: req.status_id,
        assignee_id,
        due_date,
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SetAccessRequest {
    pub has_access: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(
        status_id: Option<i64>,
        assignee_id: Option<i64>,
        due_date: Option<&str>,
    ) -> UpdateDefectRequest {
        UpdateDefectRequest {
            status_id,
            assignee_id,
            due_date: due_date.map(str::to_string),
        }
    }

    #[test]
    fn absent_fields_stay_absent() {
        let patch = interpret_patch(request(None, None, None)).unwrap();
        assert_eq!(patch.status_id, None);
        assert_eq!(patch.assignee_id, None);
        assert_eq!(patch.due_date, None);
    }

    #[test]
    fn zero_assignee_clears() {
        let patch = interpret_patch(request(None, Some(0), None)).unwrap();
        assert_eq!(patch.assignee_id, Some(None));
    }

    #[test]
    fn nonzero_assignee_sets() {
        let patch = interpret_patch(request(Some(2), Some(10), None)).unwrap();
        assert_eq!(patch.status_id, Some(2));
        assert_eq!(patch.assignee_id, Some(Some(10)));
    }

    #[test]
    fn empty_due_date_clears_and_valid_date_parses() {
        let patch = interpret_patch(request(None, None, Some(""))).unwrap();
        assert_eq!(patch.due_date, Some(None));

        let patch = interpret_patch(request(None, None, Some("2025-08-15"))).unwrap();
        assert_eq!(
            patch.due_date,
            Some(Some(NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()))
        );
    }

    #[test]
    fn malformed_due_date_is_rejected_with_a_sentence() {
        let err = interpret_patch(request(None, None, Some("15.08.2025"))).unwrap_err();
        assert!(err.contains("not a valid date"));
    }
}
