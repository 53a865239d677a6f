//! SQL DDL for initializing the database schema.
//! Every statement is `IF NOT EXISTS`, so applying it on each start is a no-op
//! for an existing database.

/// SQLite schema includes:
/// - `activities` table (one row per activity, `name` is the natural key)
/// - `registrations` table (one row per (activity, email), cascades with its activity)
pub const SQLITE_INIT: &str = r#"
-- ---------------------------------------------------------------------------
-- Activities
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS activities (
    id INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL UNIQUE,
    description TEXT NULL,
    schedule TEXT NULL,
    max_participants INTEGER NULL CHECK (max_participants IS NULL OR max_participants >= 0)
);

-- ---------------------------------------------------------------------------
-- Registrations (one (activity_id, email) per row)
-- ---------------------------------------------------------------------------
CREATE TABLE IF NOT EXISTS registrations (
    id INTEGER PRIMARY KEY NOT NULL,
    email TEXT NOT NULL,
    activity_id INTEGER NOT NULL REFERENCES activities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL, -- RFC3339
    UNIQUE(activity_id, email)
);

CREATE INDEX IF NOT EXISTS idx_registrations_activity_id ON registrations(activity_id);

CREATE INDEX IF NOT EXISTS idx_registrations_email ON registrations(email);
"#;
