//! SQLite connection management and schema.

use crate::config::DatabaseConfig;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;

/// Create a SQLite connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Connecting to SQLite...");

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.url)
        .await?;

    tracing::info!("Successfully connected to SQLite");

    Ok(pool)
}

/// Create the schema if it does not exist yet. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Initializing database schema...");
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    tracing::info!("Database schema ready");
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rooms (
    room_id         BLOB PRIMARY KEY,
    secret_hash     TEXT NOT NULL UNIQUE,
    created_utc     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS members (
    member_id       BLOB PRIMARY KEY,
    room_id         BLOB NOT NULL REFERENCES rooms(room_id),
    device_id       TEXT NOT NULL,
    display_name    TEXT NOT NULL,
    is_owner        INTEGER NOT NULL DEFAULT 0,
    last_seen_utc   TEXT NOT NULL,
    created_utc     TEXT NOT NULL,
    UNIQUE (room_id, device_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id      BLOB PRIMARY KEY,
    room_id         BLOB NOT NULL REFERENCES rooms(room_id),
    member_id       BLOB NOT NULL REFERENCES members(member_id),
    expires_utc     TEXT NOT NULL,
    created_utc     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    message_id      BLOB PRIMARY KEY,
    room_id         BLOB NOT NULL REFERENCES rooms(room_id),
    member_id       BLOB NOT NULL REFERENCES members(member_id),
    content         TEXT NOT NULL,
    created_utc     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    document_id     BLOB PRIMARY KEY,
    room_id         BLOB NOT NULL REFERENCES rooms(room_id),
    -- Attribution only, like updated_by: the author may be kicked while the
    -- shared document lives on.
    author_id       BLOB NOT NULL,
    content         TEXT NOT NULL,
    tags            TEXT NOT NULL DEFAULT '[]',
    pinned          INTEGER NOT NULL DEFAULT 0,
    media           TEXT NOT NULL DEFAULT '[]',
    lock_holder     BLOB,
    lock_expires_utc TEXT,
    updated_by      BLOB,
    created_utc     TEXT NOT NULL,
    updated_utc     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS document_revisions (
    revision_id     BLOB PRIMARY KEY,
    document_id     BLOB NOT NULL REFERENCES documents(document_id),
    content         TEXT NOT NULL,
    tags            TEXT NOT NULL DEFAULT '[]',
    edited_by       BLOB,
    created_utc     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rate_limits (
    identifier      TEXT NOT NULL,
    endpoint        TEXT NOT NULL,
    fail_count      INTEGER NOT NULL DEFAULT 0,
    last_attempt_utc TEXT NOT NULL,
    blocked_until_utc TEXT,
    PRIMARY KEY (identifier, endpoint)
);

CREATE INDEX IF NOT EXISTS idx_members_room ON members(room_id);
CREATE INDEX IF NOT EXISTS idx_sessions_member ON sessions(member_id);
CREATE INDEX IF NOT EXISTS idx_messages_room ON messages(room_id);
CREATE INDEX IF NOT EXISTS idx_documents_room ON documents(room_id);
CREATE INDEX IF NOT EXISTS idx_revisions_document ON document_revisions(document_id);
"#;
