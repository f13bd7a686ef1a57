//! History Ledger — durable, append-only audit trail for defect changes.
//!
//! Written exclusively by the lifecycle update path. Values arrive as
//! display strings already resolved by the caller, so reading history
//! needs no joins against lookup tables.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::ServerError;
use crate::models::history::{HistoryAction, HistoryEntry, NewHistoryEntry};
use crate::schema::defect_history;

/// Append one change record.
pub async fn record(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
    acting_user_id: i64,
    action: HistoryAction,
    old_value: Option<String>,
    new_value: Option<String>,
) -> Result<HistoryEntry, ServerError> {
    let entry = diesel::insert_into(defect_history::table)
        .values(&NewHistoryEntry {
            defect_id,
            user_id: acting_user_id,
            action: action.as_str().to_string(),
            old_value,
            new_value,
        })
        .get_result::<HistoryEntry>(conn)
        .await?;

    crate::metrics::history_recorded(action.as_str());
    tracing::debug!(
        defect_id,
        user_id = acting_user_id,
        action = action.as_str(),
        "History entry recorded"
    );

    Ok(entry)
}

/// Full history of a defect, ascending by creation time. Entries written
/// in one transaction share a timestamp, so id breaks the tie.
pub async fn list_by_defect(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<Vec<HistoryEntry>, ServerError> {
    let entries = defect_history::table
        .filter(defect_history::defect_id.eq(defect_id))
        .order((defect_history::created_at.asc(), defect_history::id.asc()))
        .load::<HistoryEntry>(conn)
        .await?;
    Ok(entries)
}
