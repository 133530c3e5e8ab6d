//! Schema migration
//!
//! SQLite cannot alter a CHECK constraint in place, so an out-of-date
//! `tasks` table is rebuilt: create a shadow table with the current state
//! enumeration, copy every row verbatim (rowids included), drop the old
//! table, rename the shadow into place, then recreate indexes and the
//! trigger. All of it runs in one transaction; any failure leaves the
//! original table untouched.

use rusqlite::{Connection, TransactionBehavior};
use thiserror::Error;
use tracing::info;

use super::schema::{self, COLUMNS, SCHEMA_VERSION, SHADOW_TABLE, TABLE};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration copied {copied} of {expected} rows; rolled back")]
    RowCountMismatch { expected: usize, copied: usize },

    #[error("Migration failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// What a migration run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No table existed; a fresh one was created
    Created,
    /// The installed table already accepts every state
    AlreadyCurrent,
    /// The table was rebuilt with the current definition
    Migrated { rows: usize },
}

/// Brings the store's schema up to date
///
/// Idempotent: a second run reports [`MigrationOutcome::AlreadyCurrent`]
/// without writing anything.
pub fn migrate(conn: &mut Connection) -> Result<MigrationOutcome, MigrationError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let outcome = match schema::installed_table_sql(&tx)? {
        None => {
            schema::create_all(&tx)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            info!(version = SCHEMA_VERSION, "created task table");
            MigrationOutcome::Created
        }
        Some(sql) if schema::is_current(&sql) => MigrationOutcome::AlreadyCurrent,
        Some(_) => {
            let rows = rebuild(&tx)?;
            info!(
                rows,
                version = SCHEMA_VERSION,
                "rebuilt task table with current state constraint"
            );
            MigrationOutcome::Migrated { rows }
        }
    };

    tx.commit()?;
    Ok(outcome)
}

fn rebuild(conn: &Connection) -> Result<usize, MigrationError> {
    let expected: usize = conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
        row.get::<_, i64>(0).map(|n| n as usize)
    })?;

    conn.execute_batch(&format!("DROP TABLE IF EXISTS {SHADOW_TABLE};"))?;
    conn.execute_batch(&schema::rebuild_table_sql(SHADOW_TABLE))?;

    let copied = conn.execute(
        &format!(
            "INSERT INTO {SHADOW_TABLE} (rowid, {COLUMNS})
             SELECT rowid, {COLUMNS} FROM {TABLE}"
        ),
        [],
    )?;
    if copied != expected {
        return Err(MigrationError::RowCountMismatch { expected, copied });
    }

    conn.execute_batch(&format!(
        "DROP TABLE {TABLE};
         ALTER TABLE {SHADOW_TABLE} RENAME TO {TABLE};"
    ))?;
    schema::create_indexes_and_trigger(conn)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

    Ok(copied)
}
