//! # Storage Layer
//!
//! Persistence for tsk, backed by an embedded SQLite database.
//!
//! ## Layout
//!
//! ```text
//! .tsk/
//! ├── tasks.db      # SQLite database (WAL mode)
//! ├── config.toml   # Tracker configuration
//! └── .gitignore    # Ignores the WAL and shared-memory files
//! ```
//!
//! ## Concurrency Safety
//!
//! - Every mutation runs in one IMMEDIATE transaction
//! - WAL journal plus a busy timeout serializes racing writers
//! - The schema is migrated when a store is opened, before any other query
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for locating and opening a tracker
//! - [`TaskStore`] - Reads and writes tasks
//! - [`ListFilter`] - Listing filters and visibility rules
//! - [`Config`] - Tracker and global configuration

mod clock;
mod config;
mod filter;
mod migrate;
mod project;
mod schema;
mod store;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, TSK_DIR};
pub use filter::{ListFilter, Query};
pub use migrate::{migrate, MigrationError, MigrationOutcome};
pub use project::{Project, ProjectError};
pub use schema::SCHEMA_VERSION;
pub use store::{StoreError, StoreOptions, TaskStore};
