//! HTTP routes for the tracker API.

pub mod api;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, put};
use axum::Router;
use chrono::Utc;

use crate::db::{self, DbPool};
use crate::error::ServerError;
use crate::models::lookup::{Priority, Status};
use crate::models::project::{Project, Stage};
use crate::principal::Principal;
use crate::services::project_service::{ProjectPatch, UserProjectAccess};
use crate::services::{
    access_service, comment_service, defect_service, lookup_service, project_service,
    user_service,
};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct RouterState {
    pub pool: DbPool,
}

/// Rejections a handler can produce: a domain error, or a request the
/// handler refused before reaching any service.
pub enum ApiRejection {
    Domain(ServerError),
    BadRequest(String),
}

impl From<ServerError> for ApiRejection {
    fn from(err: ServerError) -> Self {
        ApiRejection::Domain(err)
    }
}

impl IntoResponse for ApiRejection {
    fn into_response(self) -> Response {
        match self {
            ApiRejection::Domain(err) => err.into_response(),
            ApiRejection::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiRejection>;

/// Build the tracker's Axum router (nested at `/api`).
pub fn api_router(state: RouterState) -> Router {
    Router::new()
        // Defects
        .route("/defects", get(list_defects).post(create_defect))
        .route("/defects/{defect_id}", get(get_defect).put(update_defect))
        .route("/defects/{defect_id}/history", get(get_defect_history))
        .route(
            "/defects/{defect_id}/comments",
            get(list_defect_comments).post(add_defect_comment),
        )
        .route("/defects/{defect_id}/report", get(get_defect_report))
        // Projects + access management
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{project_id}",
            get(get_project).patch(update_project),
        )
        .route("/projects/{project_id}/stages", get(list_project_stages))
        .route("/access/{user_id}", get(get_user_access))
        .route("/access/{user_id}/{project_id}", put(set_user_access))
        // Lookups
        .route("/statuses", get(list_statuses))
        .route("/priorities", get(list_priorities))
        .route("/users", get(list_users))
        // KPI
        .route("/kpi/defects_by_status", get(kpi_defects_by_status))
        .route("/kpi/closed_by_assignee", get(kpi_closed_by_assignee))
        .route("/kpi/closed_by_project", get(kpi_closed_by_project))
        .with_state(state)
}

// ── Defect API ──

async fn list_defects(
    State(state): State<RouterState>,
    principal: Principal,
) -> ApiResult<api::DefectListJson> {
    let mut conn = db::get_conn(&state.pool).await?;
    let (details, projects) = defect_service::list_visible(&mut conn, principal).await?;
    Ok(Json(api::DefectListJson {
        defects: details.into_iter().map(api::DefectJson::from).collect(),
        projects,
    }))
}

async fn create_defect(
    State(state): State<RouterState>,
    principal: Principal,
    Json(req): Json<api::CreateDefectRequest>,
) -> Result<(StatusCode, Json<api::DefectJson>), ApiRejection> {
    let mut conn = db::get_conn(&state.pool).await?;

    if !access_service::can_create_defect(&mut conn, principal, req.project_id).await? {
        crate::metrics::access_denied("defect_create");
        return Err(ServerError::Forbidden(
            "Only an engineer with project access can report defects.".to_string(),
        )
        .into());
    }

    let detail = defect_service::create(
        &mut conn,
        defect_service::CreateDefect {
            title: req.title,
            description: req.description,
            project_id: req.project_id,
            stage_id: req.stage_id,
            creator_id: principal.id,
            priority_id: req.priority_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(detail.into())))
}

async fn get_defect(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
) -> ApiResult<api::DefectJson> {
    let mut conn = db::get_conn(&state.pool).await?;
    let detail = defect_service::get_visible(&mut conn, defect_id, principal).await?;
    Ok(Json(detail.into()))
}

async fn update_defect(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
    Json(req): Json<api::UpdateDefectRequest>,
) -> ApiResult<api::DefectJson> {
    let patch = api::interpret_patch(req).map_err(ApiRejection::BadRequest)?;

    let mut conn = db::get_conn(&state.pool).await?;
    let detail = defect_service::update(&mut conn, defect_id, patch, principal).await?;
    Ok(Json(detail.into()))
}

async fn get_defect_history(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
) -> ApiResult<Vec<api::HistoryJson>> {
    let mut conn = db::get_conn(&state.pool).await?;
    require_defect_view(&mut conn, principal, defect_id, "history_view").await?;
    Ok(Json(api::defect_history_json(&mut conn, defect_id).await?))
}

async fn list_defect_comments(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
) -> ApiResult<Vec<api::CommentJson>> {
    let mut conn = db::get_conn(&state.pool).await?;
    require_defect_view(&mut conn, principal, defect_id, "comment_view").await?;
    Ok(Json(api::defect_comments_json(&mut conn, defect_id).await?))
}

async fn add_defect_comment(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
    Json(req): Json<api::CreateCommentRequest>,
) -> Result<(StatusCode, Json<crate::models::comment::Comment>), ApiRejection> {
    if req.content.trim().is_empty() {
        return Err(ApiRejection::BadRequest(
            "Comment content must not be empty.".to_string(),
        ));
    }

    let mut conn = db::get_conn(&state.pool).await?;
    require_defect_view(&mut conn, principal, defect_id, "comment_add").await?;
    let comment = comment_service::add(&mut conn, defect_id, principal.id, req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_defect_report(
    State(state): State<RouterState>,
    principal: Principal,
    Path(defect_id): Path<i64>,
) -> ApiResult<api::DefectReportJson> {
    let mut conn = db::get_conn(&state.pool).await?;

    let ownership = defect_service::ownership(&mut conn, defect_id).await?;
    if !access_service::can_generate_report(&mut conn, principal, ownership.project_id).await? {
        crate::metrics::access_denied("report_generate");
        return Err(ServerError::Forbidden(
            "Only a manager with project access can generate reports.".to_string(),
        )
        .into());
    }

    let detail = defect_service::load_detail(&mut conn, defect_id).await?;
    let history = api::defect_history_json(&mut conn, defect_id).await?;
    let comments = api::defect_comments_json(&mut conn, defect_id).await?;

    Ok(Json(api::DefectReportJson {
        defect: detail.into(),
        history,
        comments,
        generated_at: Utc::now(),
    }))
}

/// Gate a defect-scoped route on `can_view_defect`.
async fn require_defect_view(
    conn: &mut diesel_async::AsyncPgConnection,
    principal: Principal,
    defect_id: i64,
    operation: &'static str,
) -> Result<(), ApiRejection> {
    let ownership = defect_service::ownership(conn, defect_id).await?;
    if !access_service::can_view_defect(conn, principal, ownership).await? {
        crate::metrics::access_denied(operation);
        return Err(
            ServerError::Forbidden("No access to this defect.".to_string()).into(),
        );
    }
    Ok(())
}

// ── Project API ──

async fn list_projects(
    State(state): State<RouterState>,
    principal: Principal,
) -> ApiResult<Vec<Project>> {
    let mut conn = db::get_conn(&state.pool).await?;
    let projects = if principal.role == crate::principal::Role::Leader {
        project_service::list_all(&mut conn).await?
    } else {
        project_service::list_granted(&mut conn, principal.id).await?
    };
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<RouterState>,
    principal: Principal,
    Json(req): Json<crate::models::project::NewProject>,
) -> Result<(StatusCode, Json<Project>), ApiRejection> {
    require_leader(principal, "project_create")?;
    let mut conn = db::get_conn(&state.pool).await?;
    let project = project_service::create_project(&mut conn, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<RouterState>,
    principal: Principal,
    Path(project_id): Path<i64>,
) -> ApiResult<Project> {
    let mut conn = db::get_conn(&state.pool).await?;
    if !access_service::can_view_project(&mut conn, principal, project_id).await? {
        crate::metrics::access_denied("project_view");
        return Err(
            ServerError::Forbidden("No access to this project.".to_string()).into(),
        );
    }
    Ok(Json(project_service::get_project(&mut conn, project_id).await?))
}

async fn update_project(
    State(state): State<RouterState>,
    principal: Principal,
    Path(project_id): Path<i64>,
    Json(patch): Json<ProjectPatch>,
) -> ApiResult<Project> {
    require_leader(principal, "project_update")?;
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(
        project_service::update_project(&mut conn, project_id, patch).await?,
    ))
}

async fn list_project_stages(
    State(state): State<RouterState>,
    principal: Principal,
    Path(project_id): Path<i64>,
) -> ApiResult<Vec<Stage>> {
    let mut conn = db::get_conn(&state.pool).await?;
    if !access_service::can_view_project(&mut conn, principal, project_id).await? {
        crate::metrics::access_denied("stage_list");
        return Err(
            ServerError::Forbidden("No access to this project.".to_string()).into(),
        );
    }
    Ok(Json(project_service::list_stages(&mut conn, project_id).await?))
}

async fn get_user_access(
    State(state): State<RouterState>,
    principal: Principal,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<UserProjectAccess>> {
    require_leader(principal, "access_list")?;
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(project_service::user_access_list(&mut conn, user_id).await?))
}

async fn set_user_access(
    State(state): State<RouterState>,
    principal: Principal,
    Path((user_id, project_id)): Path<(i64, i64)>,
    Json(req): Json<api::SetAccessRequest>,
) -> ApiResult<serde_json::Value> {
    require_leader(principal, "access_update")?;
    let mut conn = db::get_conn(&state.pool).await?;
    project_service::set_access(&mut conn, user_id, project_id, req.has_access).await?;
    Ok(Json(
        serde_json::json!({ "message": "Access updated successfully" }),
    ))
}

/// Gate an access-management route on the leader role.
fn require_leader(principal: Principal, operation: &'static str) -> Result<(), ApiRejection> {
    if !access_service::can_manage_access(principal) {
        crate::metrics::access_denied(operation);
        return Err(ServerError::Forbidden(
            "Only a leader can manage projects and access.".to_string(),
        )
        .into());
    }
    Ok(())
}

// ── Lookup API ──

async fn list_statuses(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<Status>> {
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(lookup_service::list_statuses(&mut conn).await?))
}

async fn list_priorities(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<Priority>> {
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(lookup_service::list_priorities(&mut conn).await?))
}

async fn list_users(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<api::UserJson>> {
    let mut conn = db::get_conn(&state.pool).await?;
    let users = user_service::list_users(&mut conn).await?;
    Ok(Json(users.into_iter().map(api::UserJson::from).collect()))
}

// ── KPI API ──

async fn kpi_defects_by_status(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<crate::dashboard::kpi::DefectsByStatus>> {
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(
        crate::dashboard::kpi::query_defects_by_status(&mut conn).await?,
    ))
}

async fn kpi_closed_by_assignee(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<crate::dashboard::kpi::ClosedByAssignee>> {
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(
        crate::dashboard::kpi::query_closed_by_assignee(&mut conn).await?,
    ))
}

async fn kpi_closed_by_project(
    State(state): State<RouterState>,
    _principal: Principal,
) -> ApiResult<Vec<crate::dashboard::kpi::ClosedByProject>> {
    let mut conn = db::get_conn(&state.pool).await?;
    Ok(Json(
        crate::dashboard::kpi::query_closed_by_project(&mut conn).await?,
    ))
}

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
