//! Tracker management
//!
//! Handles tracker initialization and opens its task store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::TSK_DIR;
use super::{Config, MigrationOutcome, TaskStore};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a tsk tracker. Run 'tsk init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# tsk configuration

# Fixed author for new tasks (defaults to git user, then $USER)
# author = "Name <email>"

# Milliseconds to wait for another writer before giving up
busy_timeout_ms = 5000

# Default number of rows shown by 'tsk list' (0 = unlimited)
list_limit = 0

# Database file inside .tsk/
database = "tasks.db"
"#;

const GITIGNORE: &str = r#"# SQLite write-ahead log and shared memory
*.db-wal
*.db-shm
"#;

/// A tsk tracker rooted at a directory containing `.tsk/`
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing tracker at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(TSK_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the tracker at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a tracker at the given path and creates its database
    ///
    /// Existing files are left alone, so running it twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let tsk_dir = root.join(TSK_DIR);

        fs::create_dir_all(&tsk_dir)
            .with_context(|| format!("Failed to create .tsk directory: {}", tsk_dir.display()))?;

        let config_path = tsk_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = tsk_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;
        project.store()?;
        Ok(project)
    }

    /// Returns the tracker root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .tsk directory path
    pub fn tsk_dir(&self) -> PathBuf {
        self.root.join(TSK_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the database file path
    pub fn database_path(&self) -> PathBuf {
        self.tsk_dir().join(self.config.project.database.trim())
    }

    /// Opens the task store, migrating its schema if needed
    pub fn store(&self) -> Result<TaskStore> {
        self.migrate().map(|(store, _)| store)
    }

    /// Opens the task store and reports what the schema migrator did
    pub fn migrate(&self) -> Result<(TaskStore, MigrationOutcome)> {
        let path = self.database_path();
        TaskStore::open_reporting(&path, &self.config.project.store_options())
            .with_context(|| format!("Failed to open task database: {}", path.display()))
    }
}
