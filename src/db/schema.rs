//! Database schema and migrations for filevault.
//!
//! Migrations are applied in order when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script executed inside its own transaction.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    email       TEXT NOT NULL UNIQUE,
    password    TEXT NOT NULL,           -- Argon2 PHC string
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: file metadata
    r#"
-- seq only provides a stable listing order; id is the public identifier
CREATE TABLE files (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    id          TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL REFERENCES users(id),
    name        TEXT NOT NULL,
    type        TEXT NOT NULL,           -- 'folder', 'file', 'image'
    parent_id   TEXT NOT NULL DEFAULT '0',  -- '0' is the root
    is_public   INTEGER NOT NULL DEFAULT 0,
    local_path  TEXT,                    -- NULL for folders
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_files_owner_parent ON files(user_id, parent_id, seq);
"#,
    // v3: sessions for the sqlite session backend
    r#"
CREATE TABLE sessions (
    token       TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    expires_at  INTEGER NOT NULL        -- unix seconds
);

CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
"#,
];
