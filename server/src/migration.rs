//! Embedded SQL migration — creates all platform tables at startup.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// SQL migration for the defect tracking tables.
///
/// Idempotent: every statement uses IF NOT EXISTS so the server can run it
/// unconditionally on boot.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Defect Tracking Tables
-- ================================================================

CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    full_name       VARCHAR(255) NOT NULL,
    role            VARCHAR(32) NOT NULL DEFAULT 'engineer',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS projects (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(255) NOT NULL,
    description     TEXT,
    start_date      DATE,
    end_date        DATE,
    status          VARCHAR(64),
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS stages (
    id              BIGSERIAL PRIMARY KEY,
    project_id      BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name            VARCHAR(255) NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_stages_project ON stages (project_id);

CREATE TABLE IF NOT EXISTS priorities (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(64) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS statuses (
    id              BIGSERIAL PRIMARY KEY,
    name            VARCHAR(64) NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS defects (
    id              BIGSERIAL PRIMARY KEY,
    title           VARCHAR(200) NOT NULL,
    description     TEXT NOT NULL,
    project_id      BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    stage_id        BIGINT REFERENCES stages(id) ON DELETE SET NULL,
    creator_id      BIGINT NOT NULL REFERENCES users(id),
    assignee_id     BIGINT REFERENCES users(id),
    priority_id     BIGINT NOT NULL REFERENCES priorities(id),
    status_id       BIGINT NOT NULL REFERENCES statuses(id),
    due_date        DATE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_defects_project ON defects (project_id);
CREATE INDEX IF NOT EXISTS idx_defects_status ON defects (status_id);
CREATE INDEX IF NOT EXISTS idx_defects_assignee ON defects (assignee_id);
CREATE INDEX IF NOT EXISTS idx_defects_creator ON defects (creator_id);

CREATE TABLE IF NOT EXISTS project_access (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id      BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    has_access      BOOLEAN NOT NULL DEFAULT FALSE,
    granted_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, project_id)
);

CREATE INDEX IF NOT EXISTS idx_project_access_user ON project_access (user_id);

CREATE TABLE IF NOT EXISTS defect_history (
    id              BIGSERIAL PRIMARY KEY,
    defect_id       BIGINT NOT NULL REFERENCES defects(id) ON DELETE CASCADE,
    user_id         BIGINT NOT NULL REFERENCES users(id),
    action          VARCHAR(100) NOT NULL,
    old_value       TEXT,
    new_value       TEXT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_defect_history_defect ON defect_history (defect_id);

CREATE TABLE IF NOT EXISTS comments (
    id              BIGSERIAL PRIMARY KEY,
    defect_id       BIGINT NOT NULL REFERENCES defects(id) ON DELETE CASCADE,
    user_id         BIGINT NOT NULL REFERENCES users(id),
    content         TEXT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_comments_defect ON comments (defect_id);
"#;

/// Run the embedded migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL).await?;
    Ok(())
}
