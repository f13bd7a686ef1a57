//! Database pool construction over diesel-async + deadpool.

use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

use crate::error::ServerError;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConn = Object<AsyncPgConnection>;

/// Build the connection pool.
pub fn build_pool(database_url: &str, max_size: usize) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
        .max_size(max_size)
        .build()
        .map_err(|e| anyhow::anyhow!("diesel pool: {e}"))?;
    Ok(pool)
}

/// Check out a connection, mapping pool exhaustion to a storage failure.
pub async fn get_conn(pool: &DbPool) -> Result<DbConn, ServerError> {
    pool.get()
        .await
        .map_err(|e| ServerError::Storage(anyhow::anyhow!("diesel pool: {e}")))
}
