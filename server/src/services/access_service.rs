//! Access Control Gate — every role/ownership/grant decision in one place.
//!
//! All checks are pure functions of (principal, resource state, grant rows);
//! the async wrappers here only fetch the grant row. Callers surface a
//! denial as NotFound so unauthorized principals cannot probe existence.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::ServerError;
use crate::principal::{Principal, Role};
use crate::schema::project_access;

/// The ownership facts about a defect that access decisions depend on.
#[derive(Debug, Clone, Copy)]
pub struct DefectOwnership {
    pub project_id: i64,
    pub creator_id: i64,
    pub assignee_id: Option<i64>,
}

/// Does an active grant row exist for (user, project)?
///
/// Absent row and `has_access = false` row are deliberately identical.
pub async fn has_grant(
    conn: &mut AsyncPgConnection,
    user_id: i64,
    project_id: i64,
) -> Result<bool, ServerError> {
    let count: i64 = project_access::table
        .filter(project_access::user_id.eq(user_id))
        .filter(project_access::project_id.eq(project_id))
        .filter(project_access::has_access.eq(true))
        .count()
        .get_result(conn)
        .await?;
    Ok(count > 0)
}

/// Project ids the user holds an active grant on.
pub async fn granted_project_ids(
    conn: &mut AsyncPgConnection,
    user_id: i64,
) -> Result<Vec<i64>, ServerError> {
    let ids = project_access::table
        .filter(project_access::user_id.eq(user_id))
        .filter(project_access::has_access.eq(true))
        .select(project_access::project_id)
        .load::<i64>(conn)
        .await?;
    Ok(ids)
}

pub async fn can_view_project(
    conn: &mut AsyncPgConnection,
    principal: Principal,
    project_id: i64,
) -> Result<bool, ServerError> {
    if principal.role == Role::Leader {
        return Ok(true);
    }
    has_grant(conn, principal.id, project_id).await
}

pub async fn can_view_defect(
    conn: &mut AsyncPgConnection,
    principal: Principal,
    ownership: DefectOwnership,
) -> Result<bool, ServerError> {
    if principal.role == Role::Leader {
        return Ok(true);
    }
    let granted = has_grant(conn, principal.id, ownership.project_id).await?;
    Ok(defect_visibility(principal, granted, ownership))
}

pub async fn can_create_defect(
    conn: &mut AsyncPgConnection,
    principal: Principal,
    project_id: i64,
) -> Result<bool, ServerError> {
    if principal.role != Role::Engineer {
        return Ok(false);
    }
    has_grant(conn, principal.id, project_id).await
}

pub async fn can_generate_report(
    conn: &mut AsyncPgConnection,
    principal: Principal,
    project_id: i64,
) -> Result<bool, ServerError> {
    if principal.role != Role::Manager {
        return Ok(false);
    }
    has_grant(conn, principal.id, project_id).await
}

pub fn can_manage_access(principal: Principal) -> bool {
    principal.role == Role::Leader
}

/// Pure decision core for defect visibility: a grant on the project, or
/// being the creator or current assignee, each suffices.
fn defect_visibility(principal: Principal, granted: bool, ownership: DefectOwnership) -> bool {
    granted
        || ownership.creator_id == principal.id
        || ownership.assignee_id == Some(principal.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engineer(id: i64) -> Principal {
        Principal {
            id,
            role: Role::Engineer,
        }
    }

    const DEFECT_IN_B: DefectOwnership = DefectOwnership {
        project_id: 2,
        creator_id: 10,
        assignee_id: None,
    };

    #[test]
    fn creator_sees_a_defect_outside_granted_projects() {
        // The single-defect path admits the creator even with no grant --
        // the directory listing deliberately does not (see defect_service).
        assert!(defect_visibility(engineer(10), false, DEFECT_IN_B));
    }

    #[test]
    fn assignee_sees_a_defect_outside_granted_projects() {
        let ownership = DefectOwnership {
            assignee_id: Some(11),
            ..DEFECT_IN_B
        };
        assert!(defect_visibility(engineer(11), false, ownership));
    }

    #[test]
    fn stranger_without_grant_is_denied() {
        assert!(!defect_visibility(engineer(99), false, DEFECT_IN_B));
    }

    #[test]
    fn grant_alone_suffices() {
        assert!(defect_visibility(engineer(99), true, DEFECT_IN_B));
    }

    #[test]
    fn access_management_is_leader_only() {
        assert!(can_manage_access(Principal {
            id: 1,
            role: Role::Leader
        }));
        assert!(!can_manage_access(Principal {
            id: 1,
            role: Role::Manager
        }));
        assert!(!can_manage_access(engineer(1)));
    }
}
