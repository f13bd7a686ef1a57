//! Defect workflow state machine.
//!
//! Exactly three edges are valid:
//!
//! ```text
//! New ──(manager)──> In Progress ──(assignee)──> Under Review ──(manager)──> Closed
//! ```
//!
//! Everything else is rejected before storage is touched, including
//! skipped states, backward moves, and re-applying the current state.

use crate::error::ServerError;
use crate::principal::Role;

/// The fixed, ordered set of workflow statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectStatus {
    New,
    InProgress,
    UnderReview,
    Closed,
}

impl DefectStatus {
    pub const ALL: [DefectStatus; 4] = [
        DefectStatus::New,
        DefectStatus::InProgress,
        DefectStatus::UnderReview,
        DefectStatus::Closed,
    ];

    /// Display name, as stored in the statuses lookup table.
    pub fn name(self) -> &'static str {
        match self {
            DefectStatus::New => "New",
            DefectStatus::InProgress => "In Progress",
            DefectStatus::UnderReview => "Under Review",
            DefectStatus::Closed => "Closed",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }
}

/// Validate a requested status change against the workflow.
///
/// `actor_id`/`actor_role` describe the caller; `assignee_id` is the
/// defect's current assignee. Returns the human-readable refusal exactly
/// as it should be shown to the acting user.
pub fn check_transition(
    from: DefectStatus,
    to: DefectStatus,
    actor_role: Role,
    actor_id: i64,
    assignee_id: Option<i64>,
) -> Result<(), ServerError> {
    if from == to {
        return Err(ServerError::InvalidTransition(format!(
            "Defect is already in status \"{}\".",
            from.name()
        )));
    }

    match (from, to) {
        (DefectStatus::New, DefectStatus::InProgress) => {
            if actor_role != Role::Manager {
                return Err(ServerError::InvalidTransition(
                    "Only a manager can take a defect into In Progress.".to_string(),
                ));
            }
            Ok(())
        }
        (DefectStatus::InProgress, DefectStatus::UnderReview) => {
            if assignee_id != Some(actor_id) {
                return Err(ServerError::InvalidTransition(
                    "Only the assigned engineer can move a defect to Under Review.".to_string(),
                ));
            }
            Ok(())
        }
        (DefectStatus::UnderReview, DefectStatus::Closed) => {
            if actor_role != Role::Manager {
                return Err(ServerError::InvalidTransition(
                    "Only a manager can close a defect.".to_string(),
                ));
            }
            Ok(())
        }
        _ => Err(ServerError::InvalidTransition(format!(
            "A defect cannot move from \"{}\" to \"{}\".",
            from.name(),
            to.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANAGER: i64 = 20;
    const ENGINEER: i64 = 10;

    fn allowed(from: DefectStatus, to: DefectStatus, role: Role, actor: i64) -> bool {
        check_transition(from, to, role, actor, Some(ENGINEER)).is_ok()
    }

    #[test]
    fn only_the_three_edges_are_reachable() {
        // Exhaustive grid: every (from, to, role, actor-is-assignee) tuple
        // outside the whitelist must be rejected.
        for from in DefectStatus::ALL {
            for to in DefectStatus::ALL {
                for role in [Role::Engineer, Role::Manager, Role::Leader] {
                    for actor in [ENGINEER, MANAGER] {
                        let ok = allowed(from, to, role, actor);
                        let expected = matches!(
                            (from, to),
                            (DefectStatus::New, DefectStatus::InProgress)
                                if role == Role::Manager
                        ) || matches!(
                            (from, to),
                            (DefectStatus::InProgress, DefectStatus::UnderReview)
                                if actor == ENGINEER
                        ) || matches!(
                            (from, to),
                            (DefectStatus::UnderReview, DefectStatus::Closed)
                                if role == Role::Manager
                        );
                        assert_eq!(
                            ok, expected,
                            "from={from:?} to={to:?} role={role:?} actor={actor}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn reapplying_the_current_status_is_rejected() {
        for status in DefectStatus::ALL {
            let err = check_transition(status, status, Role::Manager, MANAGER, Some(ENGINEER))
                .unwrap_err();
            assert!(matches!(err, ServerError::InvalidTransition(_)));
        }
    }

    #[test]
    fn review_transition_requires_the_assignee_not_just_any_engineer() {
        let err = check_transition(
            DefectStatus::InProgress,
            DefectStatus::UnderReview,
            Role::Engineer,
            ENGINEER + 1,
            Some(ENGINEER),
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::InvalidTransition(_)));

        // An unassigned defect cannot go to review at all.
        let err = check_transition(
            DefectStatus::InProgress,
            DefectStatus::UnderReview,
            Role::Engineer,
            ENGINEER,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServerError::InvalidTransition(_)));
    }

    #[test]
    fn backward_and_skipping_moves_are_rejected_even_for_managers() {
        for (from, to) in [
            (DefectStatus::New, DefectStatus::UnderReview),
            (DefectStatus::New, DefectStatus::Closed),
            (DefectStatus::InProgress, DefectStatus::Closed),
            (DefectStatus::InProgress, DefectStatus::New),
            (DefectStatus::UnderReview, DefectStatus::InProgress),
            (DefectStatus::Closed, DefectStatus::New),
            (DefectStatus::Closed, DefectStatus::UnderReview),
        ] {
            assert!(!allowed(from, to, Role::Manager, MANAGER), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn refusals_are_complete_sentences() {
        let err = check_transition(
            DefectStatus::InProgress,
            DefectStatus::UnderReview,
            Role::Manager,
            MANAGER,
            Some(ENGINEER),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Only the assigned engineer can move a defect to Under Review."
        );
    }

    #[test]
    fn status_names_round_trip() {
        for status in DefectStatus::ALL {
            assert_eq!(DefectStatus::from_name(status.name()), Some(status));
        }
        assert_eq!(DefectStatus::from_name("Reopened"), None);
    }
}
