//! Query commands (list, inbox, search, children, status, migrate)

use anyhow::Result;
use clap::Args;
use tracing::debug;

use super::output::Output;
use super::session::Session;
use crate::domain::{Kind, Priority, State};
use crate::storage::{ListFilter, MigrationOutcome, Project};

/// Filters for `tsk list`
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Only tasks in this state (overrides default visibility)
    #[arg(long, short = 's')]
    pub state: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    #[arg(long, short = 'k')]
    pub kind: Option<String>,

    /// Tasks whose tags contain this text
    #[arg(long, short = 't')]
    pub tag: Option<String>,

    /// Only tasks with a blocker
    #[arg(long)]
    pub blocked: bool,

    /// Include DONE tasks
    #[arg(long)]
    pub show_done: bool,

    /// Include CANCELLED tasks
    #[arg(long)]
    pub show_cancelled: bool,

    /// Maximum rows (defaults to list_limit from config)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Every task in every state, no limit
    #[arg(long, short = 'a')]
    pub all: bool,
}

impl ListArgs {
    fn into_filter(self, default_limit: usize) -> Result<ListFilter> {
        Ok(ListFilter {
            state: self.state.as_deref().map(str::parse::<State>).transpose()?,
            priority: self
                .priority
                .as_deref()
                .map(str::parse::<Priority>)
                .transpose()?,
            kind: self.kind.as_deref().map(str::parse::<Kind>).transpose()?,
            tag: self.tag,
            blocked: self.blocked,
            show_done: self.show_done,
            show_cancelled: self.show_cancelled,
            limit: self.limit.unwrap_or(default_limit),
            all: self.all,
        })
    }
}

pub fn list(output: &Output, args: ListArgs) -> Result<()> {
    let session = Session::open(output)?;
    let filter = args.into_filter(session.project.config().project.list_limit)?;
    debug!(?filter, "listing tasks");

    let tasks = session.store.list(&filter)?;
    output.tasks(&tasks, "No tasks");
    Ok(())
}

pub fn inbox(output: &Output) -> Result<()> {
    let session = Session::open(output)?;
    let tasks = session.store.list_by_state(State::Inbox)?;

    output.tasks(&tasks, "Inbox is empty");
    Ok(())
}

pub fn search(output: &Output, text: &str) -> Result<()> {
    let session = Session::open(output)?;
    let tasks = session.store.search(text)?;

    output.tasks(&tasks, &format!("No tasks match '{}'", text));
    Ok(())
}

pub fn children(output: &Output, id: &str) -> Result<()> {
    let session = Session::open(output)?;
    let parent = session.resolve(id)?;
    let tasks = session.store.children(&parent.id)?;

    output.tasks(&tasks, &format!("Task {} has no subtasks", parent.id.short()));
    Ok(())
}

/// Show task counts per state
pub fn status(output: &Output) -> Result<()> {
    let session = Session::open(output)?;
    let counts = session.store.counts()?;
    let total: usize = counts.values().sum();
    let blocked = session
        .store
        .list(&ListFilter {
            blocked: true,
            ..ListFilter::everything()
        })?
        .len();

    if output.is_json() {
        let states: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(state, count)| (state.as_str().to_string(), (*count).into()))
            .collect();
        output.data(&serde_json::json!({
            "total": total,
            "blocked": blocked,
            "states": states,
        }));
        return Ok(());
    }

    println!("Tracker Status");
    println!("{}", "=".repeat(40));
    println!();
    println!("Tasks: {} total", total);
    for (state, count) in &counts {
        println!("  {:<12} {}", state.as_str(), count);
    }
    println!();
    println!("  Blocked:     {}", blocked);

    Ok(())
}

/// Run the schema migrator and report what it did
pub fn migrate(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let (_, outcome) = project.migrate()?;

    let message = match outcome {
        MigrationOutcome::Created => "Created task table".to_string(),
        MigrationOutcome::AlreadyCurrent => "Schema is up to date".to_string(),
        MigrationOutcome::Migrated { rows } => {
            format!("Migrated {} tasks to the current schema", rows)
        }
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "outcome": match outcome {
                MigrationOutcome::Created => "created",
                MigrationOutcome::AlreadyCurrent => "already_current",
                MigrationOutcome::Migrated { .. } => "migrated",
            },
            "rows": match outcome {
                MigrationOutcome::Migrated { rows } => rows,
                _ => 0,
            },
        }));
    } else {
        output.success(&message);
    }

    Ok(())
}
