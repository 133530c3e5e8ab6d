//! Table layout for the task store
//!
//! One `tasks` table keyed by the 40-hex ID. Enumerations are repeated as
//! CHECK constraints so rows written outside the store are held to the same
//! rules; freshly created tables also check the text invariants. Timestamps
//! are RFC 3339 UTC text with millisecond precision, which sorts lexically in
//! time order.

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;

/// Bumped whenever the table definition changes
pub const SCHEMA_VERSION: i32 = 2;

pub const TABLE: &str = "tasks";

/// Temporary name used while the table is rebuilt
pub const SHADOW_TABLE: &str = "tasks_rebuild";

/// Column list shared by every SELECT and by the rebuild copy
pub const COLUMNS: &str = "id, parent, blocked_by, kind, priority, state, title, description, \
                           author, tags, source, created, updated";

/// Tokens the installed state CHECK must contain to be current
pub const REQUIRED_STATE_TOKENS: [&str; 2] = ["'INBOX'", "'INVALID'"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Row-content CHECKs enforced on freshly created tables
///
/// Older tables never had them, so a rebuild leaves them out and copies
/// legacy rows as they are; the store validates every write regardless.
const CONTENT_CHECKS: &str = ",
            CHECK (length(trim(title)) > 0),
            CHECK (length(trim(description)) > 0),
            CHECK (parent IS NULL OR parent <> id),
            CHECK (blocked_by IS NULL OR blocked_by <> id)";

/// Returns the CREATE TABLE statement for a freshly created table
pub fn table_sql(table: &str) -> String {
    definition(table, CONTENT_CHECKS)
}

/// Returns the CREATE TABLE statement used when rebuilding an older table
///
/// Only the enumeration CHECKs are current; row content is not re-checked.
pub fn rebuild_table_sql(table: &str) -> String {
    definition(table, "")
}

fn definition(table: &str, content_checks: &str) -> String {
    format!(
        "CREATE TABLE {table} (
            id TEXT PRIMARY KEY NOT NULL,
            parent TEXT,
            blocked_by TEXT,
            kind TEXT NOT NULL
                CHECK (kind IN ('BUG', 'FEATURE', 'REGRESSION')),
            priority TEXT NOT NULL DEFAULT 'medium'
                CHECK (priority IN ('high', 'medium', 'low')),
            state TEXT NOT NULL DEFAULT 'INBOX'
                CHECK (state IN ('INBOX', 'NEW', 'IN_PROGRESS', 'DONE', 'CANCELLED', 'INVALID')),
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            author TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '',
            source TEXT,
            created TEXT NOT NULL,
            updated TEXT NOT NULL{content_checks}
        );"
    )
}

/// Secondary indexes, including the short-ID prefix index
pub const INDEXES_SQL: &str = "
    CREATE INDEX IF NOT EXISTS idx_tasks_state_priority ON tasks(state, priority);
    CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent);
    CREATE INDEX IF NOT EXISTS idx_tasks_blocked_by ON tasks(blocked_by);
    CREATE INDEX IF NOT EXISTS idx_tasks_tags ON tasks(tags);
    CREATE INDEX IF NOT EXISTS idx_tasks_created ON tasks(created);
    CREATE INDEX IF NOT EXISTS idx_tasks_updated ON tasks(updated);
    CREATE INDEX IF NOT EXISTS idx_tasks_short_id ON tasks(substr(id, 1, 7));
";

/// Keeps `updated` moving for writes that do not set it themselves
pub const TRIGGER_SQL: &str = "
    CREATE TRIGGER IF NOT EXISTS tasks_touch_updated
    AFTER UPDATE ON tasks
    FOR EACH ROW WHEN NEW.updated IS OLD.updated
    BEGIN
        UPDATE tasks SET updated = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        WHERE id = NEW.id;
    END;
";

/// Creates the table, its indexes and trigger
pub fn create_all(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&table_sql(TABLE))?;
    create_indexes_and_trigger(conn)
}

pub fn create_indexes_and_trigger(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INDEXES_SQL)?;
    conn.execute_batch(TRIGGER_SQL)
}

/// Returns the installed CREATE TABLE text, if the table exists
pub fn installed_table_sql(conn: &Connection) -> rusqlite::Result<Option<String>> {
    use rusqlite::OptionalExtension;

    conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [TABLE],
        |row| row.get(0),
    )
    .optional()
}

/// Returns true if the installed table already accepts every current state
pub fn is_current(table_sql: &str) -> bool {
    REQUIRED_STATE_TOKENS
        .iter()
        .all(|token| table_sql.contains(token))
}

pub fn schema_version(conn: &Connection) -> rusqlite::Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Drops sub-millisecond precision so stored and in-memory values agree
pub fn truncate_timestamp(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

pub fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
