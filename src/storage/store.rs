//! SQLite task store
//!
//! The store lives in `.tsk/tasks.db`. Every mutation validates first and
//! runs in a single transaction, so a rejected operation leaves the database
//! unchanged. Parent and blocker links are plain IDs checked for existence
//! when they are set; deleting a task does not touch tasks that point at it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{
    params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior,
};
use thiserror::Error;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use super::filter::{child_order, ListFilter, NEWEST_FIRST};
use super::migrate::{self, MigrationError, MigrationOutcome};
use super::schema::{self, COLUMNS};
use crate::domain::{
    check_transition, single_match, Lookup, NewTask, ResolveError, SelfBlock, State, Tags, Task,
    TaskId, TransitionError, ValidationError, SHORT_LEN,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("No task matches '{0}'")]
    NotFound(String),

    #[error("'{input}' is ambiguous: {count} tasks match, use a longer prefix")]
    AmbiguousId { input: String, count: usize },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    SelfBlock(#[from] SelfBlock),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            _ => StoreError::Sqlite(err),
        }
    }
}

impl From<ResolveError> for StoreError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(input) => StoreError::NotFound(input),
            ResolveError::Ambiguous { input, count } => StoreError::AmbiguousId { input, count },
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Backend settings applied when a store is opened
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a writer waits for a competing writer before failing
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Durable task storage
pub struct TaskStore {
    conn: Connection,
    clock: Box<dyn Clock>,
    path: Option<PathBuf>,
}

impl TaskStore {
    /// Opens (or creates) a store file and brings its schema up to date
    pub fn open(path: &Path, options: &StoreOptions) -> Result<Self> {
        Self::open_reporting(path, options).map(|(store, _)| store)
    }

    /// Like [`TaskStore::open`], also returning what the migrator did
    pub fn open_reporting(
        path: &Path,
        options: &StoreOptions,
    ) -> Result<(Self, MigrationOutcome)> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(options.busy_timeout)?;
        // WAL lets readers proceed while another process writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        debug!(path = %path.display(), "opened task store");
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens a throwaway store, mainly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None).map(|(store, _)| store)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<(Self, MigrationOutcome)> {
        let mut store = Self {
            conn,
            clock: Box::new(SystemClock),
            path,
        };
        let outcome = store.migrate()?;
        Ok((store, outcome))
    }

    /// Replaces the time source
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Runs the schema migrator; safe to call repeatedly
    pub fn migrate(&mut self) -> Result<MigrationOutcome> {
        Ok(migrate::migrate(&mut self.conn)?)
    }

    /// Returns the database file, or None for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn now(&self) -> DateTime<Utc> {
        schema::truncate_timestamp(self.clock.now())
    }

    // ============================================================
    // Writes
    // ============================================================

    /// Creates a task in the INBOX state
    pub fn create(&mut self, new: NewTask) -> Result<Task> {
        let task = new.into_task(self.now());
        task.validate()?;

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if let Some(parent) = &task.parent {
            ensure_exists(&tx, parent, "parent")?;
        }
        insert(&tx, &task)?;
        tx.commit()?;

        debug!(id = task.id.short(), kind = %task.kind, "created task");
        Ok(task)
    }

    /// Replaces every mutable field of an existing task
    ///
    /// `id`, `created` and `author` are kept from the stored row; `updated`
    /// is set to now. The state is written as given, without consulting the
    /// lifecycle; use [`TaskStore::update_state`] for guarded moves.
    pub fn update(&mut self, task: &Task) -> Result<Task> {
        task.validate()?;
        if task.parent.as_ref() == Some(&task.id) {
            return Err(StoreError::ConstraintViolation(format!(
                "task {} cannot be its own parent",
                task.id.short()
            )));
        }
        if task.blocked_by.as_ref() == Some(&task.id) {
            return Err(SelfBlock(task.id.clone()).into());
        }

        let now = self.now();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing =
            fetch(&tx, task.id.as_str())?.ok_or_else(|| StoreError::NotFound(task.id.to_string()))?;

        if task.parent != existing.parent {
            if let Some(parent) = &task.parent {
                ensure_exists(&tx, parent, "parent")?;
            }
        }
        if task.blocked_by != existing.blocked_by {
            if let Some(blocker) = &task.blocked_by {
                ensure_exists(&tx, blocker, "blocker")?;
            }
        }

        tx.execute(
            "UPDATE tasks SET parent = ?1, blocked_by = ?2, kind = ?3, priority = ?4, state = ?5,
                 title = ?6, description = ?7, tags = ?8, source = ?9, updated = ?10
             WHERE id = ?11",
            params![
                task.parent.as_ref().map(TaskId::as_str),
                task.blocked_by.as_ref().map(TaskId::as_str),
                task.kind.as_str(),
                task.priority.as_str(),
                task.state.as_str(),
                task.title,
                task.description,
                task.tags.to_string(),
                task.source,
                schema::encode_timestamp(&now),
                task.id.as_str(),
            ],
        )?;
        tx.commit()?;

        debug!(id = task.id.short(), "updated task");
        Ok(Task {
            id: existing.id,
            author: existing.author,
            created: existing.created,
            updated: now,
            ..task.clone()
        })
    }

    /// Removes a task; children and blocked tasks keep their dangling links
    pub fn delete(&self, id: &TaskId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", [id.as_str()])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        debug!(id = id.short(), "deleted task");
        Ok(())
    }

    /// Moves a task to `target` if the lifecycle allows it
    ///
    /// The task and its children are read inside the same transaction as the
    /// write, so a concurrent change to a child cannot slip in between.
    pub fn update_state(&mut self, input: &str, target: State) -> Result<Task> {
        let now = self.now();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = resolve(&tx, input)?;
        let children = query_children(&tx, &task.id)?;
        check_transition(&task, target, &children)?;

        tx.execute(
            "UPDATE tasks SET state = ?1, updated = ?2 WHERE id = ?3",
            params![target.as_str(), schema::encode_timestamp(&now), task.id.as_str()],
        )?;
        tx.commit()?;

        debug!(id = task.id.short(), from = %task.state, to = %target, "changed task state");
        task.state = target;
        task.updated = now;
        Ok(task)
    }

    /// Records that `task_input` waits on `blocker_input`, replacing any previous blocker
    pub fn block(&mut self, task_input: &str, blocker_input: &str) -> Result<Task> {
        let now = self.now();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = resolve(&tx, task_input)?;
        let blocker = resolve(&tx, blocker_input)?;
        task.block_on(&blocker.id)?;

        tx.execute(
            "UPDATE tasks SET blocked_by = ?1, updated = ?2 WHERE id = ?3",
            params![blocker.id.as_str(), schema::encode_timestamp(&now), task.id.as_str()],
        )?;
        tx.commit()?;

        debug!(id = task.id.short(), blocker = blocker.id.short(), "blocked task");
        task.updated = now;
        Ok(task)
    }

    /// Clears a task's blocker; a task without one is returned unchanged
    pub fn unblock(&mut self, input: &str) -> Result<Task> {
        let now = self.now();
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut task = resolve(&tx, input)?;
        if !task.unblock() {
            return Ok(task);
        }

        tx.execute(
            "UPDATE tasks SET blocked_by = NULL, updated = ?1 WHERE id = ?2",
            params![schema::encode_timestamp(&now), task.id.as_str()],
        )?;
        tx.commit()?;

        debug!(id = task.id.short(), "unblocked task");
        task.updated = now;
        Ok(task)
    }

    // ============================================================
    // Reads
    // ============================================================

    /// Looks up a task by full ID, or by a unique prefix of 4+ characters
    pub fn get(&self, input: &str) -> Result<Task> {
        resolve(&self.conn, input)
    }

    /// Exact lookup by ID
    pub fn find(&self, id: &TaskId) -> Result<Option<Task>> {
        fetch(&self.conn, id.as_str())
    }

    /// All tasks whose ID starts with `prefix`, newest first
    ///
    /// Used to show candidates after an ambiguous lookup.
    pub fn matching(&self, prefix: &str) -> Result<Vec<Task>> {
        match Lookup::classify(prefix) {
            Lookup::Prefix(prefix) => query_prefix(&self.conn, &prefix),
            Lookup::Exact(id) => Ok(fetch(&self.conn, &id)?.into_iter().collect()),
        }
    }

    /// Direct children of a task, by priority then oldest first
    pub fn children(&self, parent: &TaskId) -> Result<Vec<Task>> {
        query_children(&self.conn, parent)
    }

    pub fn list(&self, filter: &ListFilter) -> Result<Vec<Task>> {
        let query = filter.to_query();
        let mut stmt = self.conn.prepare(&query.sql)?;
        let tasks = stmt
            .query_map(params_from_iter(query.params.iter()), task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(count = tasks.len(), "listed tasks");
        Ok(tasks)
    }

    /// Every task in exactly `state`, newest first, ignoring default visibility
    pub fn list_by_state(&self, state: State) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE state = ?1 {NEWEST_FIRST}"
        ))?;
        let tasks = stmt
            .query_map([state.as_str()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Case-insensitive substring search over title and description, newest first
    ///
    /// SQLite's LIKE only folds ASCII, so matching happens here with full
    /// Unicode lowercasing.
    pub fn search(&self, text: &str) -> Result<Vec<Task>> {
        let needle = text.trim().to_lowercase();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM tasks {NEWEST_FIRST}"))?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .filter(|row| match row {
                Ok(task) => {
                    task.title.to_lowercase().contains(&needle)
                        || task.description.to_lowercase().contains(&needle)
                }
                Err(_) => true,
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(query = text, count = tasks.len(), "searched tasks");
        Ok(tasks)
    }

    /// Number of tasks in each state; every state is present
    pub fn counts(&self) -> Result<BTreeMap<State, usize>> {
        let mut counts: BTreeMap<State, usize> = State::ALL.iter().map(|s| (*s, 0)).collect();

        let mut stmt = self
            .conn
            .prepare("SELECT state, COUNT(*) FROM tasks GROUP BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((parse_column::<State>(row, 0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (state, count) = row?;
            counts.insert(state, count as usize);
        }

        Ok(counts)
    }
}

// ============================================================
// Row helpers (shared by the connection and open transactions)
// ============================================================

fn insert(conn: &Connection, task: &Task) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO tasks ({COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            task.id.as_str(),
            task.parent.as_ref().map(TaskId::as_str),
            task.blocked_by.as_ref().map(TaskId::as_str),
            task.kind.as_str(),
            task.priority.as_str(),
            task.state.as_str(),
            task.title,
            task.description,
            task.author,
            task.tags.to_string(),
            task.source,
            schema::encode_timestamp(&task.created),
            schema::encode_timestamp(&task.updated),
        ],
    )?;
    Ok(())
}

fn ensure_exists(conn: &Connection, id: &TaskId, role: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
        [id.as_str()],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::ConstraintViolation(format!(
            "{} {} does not exist",
            role, id
        )))
    }
}

fn fetch(conn: &Connection, id: &str) -> Result<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
            [id],
            task_from_row,
        )
        .optional()?;
    Ok(task)
}

fn resolve(conn: &Connection, input: &str) -> Result<Task> {
    let lookup = Lookup::classify(input);
    if let Some(task) = fetch(conn, lookup.input())? {
        return Ok(task);
    }

    match lookup {
        Lookup::Exact(id) => Err(StoreError::NotFound(id)),
        Lookup::Prefix(prefix) => {
            let matches = query_prefix(conn, &prefix)?;
            Ok(single_match(&prefix, matches)?)
        }
    }
}

/// `prefix` must already be normalized lowercase hex
fn query_prefix(conn: &Connection, prefix: &str) -> Result<Vec<Task>> {
    let pattern = format!("{}*", prefix);
    let tasks = if prefix.len() >= SHORT_LEN {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM tasks
             WHERE substr(id, 1, 7) = ?1 AND id GLOB ?2 {NEWEST_FIRST}"
        ))?;
        let rows = stmt
            .query_map([&prefix[..SHORT_LEN], pattern.as_str()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    } else {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE id GLOB ?1 {NEWEST_FIRST}"
        ))?;
        let rows = stmt
            .query_map([pattern.as_str()], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    Ok(tasks)
}

fn query_children(conn: &Connection, parent: &TaskId) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE parent = ?1 {}",
        child_order()
    ))?;
    let tasks = stmt
        .query_map([parent.as_str()], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: parse_column(row, 0)?,
        parent: parse_optional(row, 1)?,
        blocked_by: parse_optional(row, 2)?,
        kind: parse_column(row, 3)?,
        priority: parse_column(row, 4)?,
        state: parse_column(row, 5)?,
        title: row.get(6)?,
        description: row.get(7)?,
        author: row.get(8)?,
        tags: Tags::parse(&row.get::<_, String>(9)?),
        source: row.get(10)?,
        created: parse_timestamp(row, 11)?,
        updated: parse_timestamp(row, 12)?,
    })
}

fn parse_column<T>(row: &Row, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional<T>(row: &Row, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
