//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::output::{Output, OutputFormat};
use super::query::{self, ListArgs};
use super::task::{self, EditFields, Shortcut, TaskFields};
use crate::storage::{Config, Project};

/// Environment variable holding a tracing filter, e.g. `TSK_LOG=tsk=debug`
pub const LOG_ENV: &str = "TSK_LOG";

#[derive(Parser)]
#[command(name = "tsk")]
#[command(author, version, about = "Personal task tracker with git-style task IDs")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a tracker
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Add a task to the inbox
    Add(TaskFields),

    /// Add a task under an existing parent
    AddSubtask {
        /// Parent task ID or prefix
        parent: String,

        #[command(flatten)]
        fields: TaskFields,
    },

    /// Show a task with its subtasks and blocker
    Show {
        /// Task ID or prefix
        id: String,
    },

    /// Change a task's fields
    Edit {
        id: String,

        #[command(flatten)]
        fields: EditFields,
    },

    /// Delete a task (subtasks and blocked tasks keep their links)
    Delete { id: String },

    /// Accept an inbox task (INBOX -> NEW)
    Accept { id: String },

    /// Reject an inbox task (INBOX -> INVALID)
    Reject { id: String },

    /// Start work (-> IN_PROGRESS)
    Start { id: String },

    /// Complete a task (-> DONE)
    Done { id: String },

    /// Cancel a task (-> CANCELLED)
    Cancel { id: String },

    /// Reopen a task (DONE -> IN_PROGRESS, CANCELLED -> NEW)
    Reopen { id: String },

    /// Move a task to any state the lifecycle allows
    Move {
        id: String,

        /// Target state (INBOX, NEW, IN_PROGRESS, DONE, CANCELLED, INVALID)
        state: String,
    },

    /// Record that a task waits on another
    Block {
        /// Task that waits
        id: String,

        /// Task it waits on
        blocker: String,
    },

    /// Clear a task's blocker
    Unblock { id: String },

    /// List tasks
    List(ListArgs),

    /// List untriaged tasks
    Inbox,

    /// Search titles and descriptions
    Search {
        /// Text to look for (case-insensitive)
        text: String,
    },

    /// List a task's subtasks
    Children { id: String },

    /// Show task counts per state
    Status,

    /// Bring the database schema up to date
    Migrate,
}

/// Installs the stderr log subscriber
///
/// `TSK_LOG` wins when set; otherwise `debug` with `--verbose`, else `warn`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "tsk=debug" } else { "warn" };
    let filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default));

    // A subscriber may already be installed (tests); keep the existing one
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

/// Runs an already parsed command line
pub fn execute(cli: Cli) -> Result<()> {
    let format = match cli.format {
        Some(format) => format,
        None => Config::load_global()?.default_format.into(),
    };
    let output = Output::new(format, cli.verbose);

    tracing::debug!("tsk starting");

    match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            tracing::debug!(dir = %project.tsk_dir().display(), "created tracker directory");
            output.success(&format!("Initialized tsk tracker at {}", project.root().display()));
        }

        Commands::Add(fields) => task::add(&output, fields)?,
        Commands::AddSubtask { parent, fields } => task::add_subtask(&output, &parent, fields)?,
        Commands::Show { id } => task::show(&output, &id)?,
        Commands::Edit { id, fields } => task::edit(&output, &id, fields)?,
        Commands::Delete { id } => task::delete(&output, &id)?,

        Commands::Accept { id } => task::shortcut(&output, &id, Shortcut::Accept)?,
        Commands::Reject { id } => task::shortcut(&output, &id, Shortcut::Reject)?,
        Commands::Start { id } => task::shortcut(&output, &id, Shortcut::Start)?,
        Commands::Done { id } => task::shortcut(&output, &id, Shortcut::Done)?,
        Commands::Cancel { id } => task::shortcut(&output, &id, Shortcut::Cancel)?,
        Commands::Reopen { id } => task::reopen(&output, &id)?,
        Commands::Move { id, state } => task::move_to(&output, &id, &state)?,

        Commands::Block { id, blocker } => task::block(&output, &id, &blocker)?,
        Commands::Unblock { id } => task::unblock(&output, &id)?,

        Commands::List(args) => query::list(&output, args)?,
        Commands::Inbox => query::inbox(&output)?,
        Commands::Search { text } => query::search(&output, &text)?,
        Commands::Children { id } => query::children(&output, &id)?,
        Commands::Status => query::status(&output)?,
        Commands::Migrate => query::migrate(&output)?,
    }

    tracing::debug!("command completed");
    Ok(())
}
