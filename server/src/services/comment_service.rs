//! Defect comments — append-only, no edit or delete.
//!
//! Visibility is gated at the route layer via the access service; this
//! component only appends and lists.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::ServerError;
use crate::models::comment::{Comment, NewComment};
use crate::schema::comments;

pub async fn add(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
    author_id: i64,
    content: String,
) -> Result<Comment, ServerError> {
    let comment = diesel::insert_into(comments::table)
        .values(&NewComment {
            defect_id,
            user_id: author_id,
            content,
        })
        .get_result::<Comment>(conn)
        .await?;

    crate::metrics::comment_added();
    tracing::info!(defect_id, author_id, "Comment added");

    Ok(comment)
}

/// Discussion thread, ascending by creation time.
pub async fn list_by_defect(
    conn: &mut AsyncPgConnection,
    defect_id: i64,
) -> Result<Vec<Comment>, ServerError> {
    let results = comments::table
        .filter(comments::defect_id.eq(defect_id))
        .order((comments::created_at.asc(), comments::id.asc()))
        .load::<Comment>(conn)
        .await?;
    Ok(results)
}
