//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Tracker setup | `init`, `status`, `migrate` |
//! | Task | Create and change tasks | `add`, `add-subtask`, `edit`, `delete` |
//! | Lifecycle | State moves | `accept`, `start`, `done`, `reopen`, `move` |
//! | Blocking | Advisory dependencies | `block`, `unblock` |
//! | Query | Finding tasks | `list`, `inbox`, `search`, `children`, `show` |
//!
//! ## Task IDs
//!
//! Every command taking an ID accepts the full 40-character form or any
//! unique prefix of at least 4 characters. An ambiguous prefix fails and
//! lists the matching tasks.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! `--verbose` (or `-v`) shows full IDs in tables and turns on debug logs on
//! stderr. `TSK_LOG` takes a tracing filter and overrides both defaults:
//! ```bash
//! TSK_LOG=tsk::storage=debug tsk list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod query;
mod session;
mod task;

pub use app::{execute, init_tracing, run, Cli, Commands, LOG_ENV};
pub use output::{Output, OutputFormat};
