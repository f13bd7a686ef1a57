//! User lookups — display-name resolution and assignment dropdowns.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::error::ServerError;
use crate::models::user::User;
use crate::schema::users;

pub async fn get_user(conn: &mut AsyncPgConnection, user_id: i64) -> Result<User, ServerError> {
    let user = users::table
        .find(user_id)
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or(ServerError::NotFound)?;
    Ok(user)
}

pub async fn list_users(conn: &mut AsyncPgConnection) -> Result<Vec<User>, ServerError> {
    let results = users::table
        .order(users::id.asc())
        .load::<User>(conn)
        .await?;
    Ok(results)
}
