//! Defect audit trail rows — append-only, never updated or deleted.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::defect_history;

/// The closed set of audited field changes.
///
/// Stored as text but never constructed from free strings outside this
/// module, so storage and display cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    StatusChanged,
    AssigneeChanged,
    DueDateChanged,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::AssigneeChanged => "assignee_changed",
            HistoryAction::DueDateChanged => "due_date_changed",
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = defect_history)]
pub struct HistoryEntry {
    pub id: i64,
    pub defect_id: i64,
    pub user_id: i64,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = defect_history)]
pub struct NewHistoryEntry {
    pub defect_id: i64,
    pub user_id: i64,
    pub action: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_storage_forms_are_stable() {
        // The ledger stores these strings; renaming a variant must not
        // silently rewrite what readers see.
        assert_eq!(HistoryAction::StatusChanged.as_str(), "status_changed");
        assert_eq!(HistoryAction::AssigneeChanged.as_str(), "assignee_changed");
        assert_eq!(HistoryAction::DueDateChanged.as_str(), "due_date_changed");
    }
}
