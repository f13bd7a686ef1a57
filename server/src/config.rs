//! Tracker configuration — loaded from environment variables.

#[derive(Clone, Debug)]
pub struct TrackerConfig {
    /// Maximum connections in the database pool.
    pub db_pool_size: usize,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Seed demo users/projects/grants at startup (development only).
    pub seed_demo_data: bool,
}

impl TrackerConfig {
    pub fn from_env() -> Self {
        let db_pool_size = std::env::var("BUILDCHECK_POOL_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let request_timeout_secs = std::env::var("BUILDCHECK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let seed_demo_data = std::env::var("BUILDCHECK_SEED_DEMO")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if seed_demo_data {
            tracing::warn!("BUILDCHECK_SEED_DEMO set -- demo users and projects will be seeded");
        }

        Self {
            db_pool_size,
            request_timeout_secs,
            seed_demo_data,
        }
    }
}
