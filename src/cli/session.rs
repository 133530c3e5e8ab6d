//! Per-invocation handle on the current tracker

use anyhow::Result;
use tracing::debug;

use super::output::Output;
use crate::domain::Task;
use crate::identity;
use crate::storage::{Project, StoreError, TaskStore};

/// The open tracker, its store and the output helper for one command
pub struct Session<'a> {
    pub project: Project,
    pub store: TaskStore,
    pub output: &'a Output,
}

impl<'a> Session<'a> {
    /// Opens the tracker at the current directory or a parent
    pub fn open(output: &'a Output) -> Result<Self> {
        let project = Project::open_current()?;
        let store = project.store()?;
        debug!(root = %project.root().display(), "opened tracker");

        Ok(Self {
            project,
            store,
            output,
        })
    }

    /// Author recorded on tasks created in this session
    pub fn author(&self) -> String {
        identity::default_author(
            self.project.config().project.author.as_deref(),
            Some(self.project.root().to_path_buf()),
        )
    }

    /// Resolves a full ID or unique prefix
    pub fn resolve(&self, input: &str) -> Result<Task> {
        let result = self.store.get(input);
        self.check(result)
    }

    /// Converts a store result, listing candidates when a prefix was ambiguous
    pub fn check<T>(&self, result: Result<T, StoreError>) -> Result<T> {
        match result {
            Err(StoreError::AmbiguousId { input, count }) => {
                self.print_candidates(&input);
                Err(StoreError::AmbiguousId { input, count }.into())
            }
            other => Ok(other?),
        }
    }

    fn print_candidates(&self, prefix: &str) {
        let candidates = match self.store.matching(prefix) {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!(error = %err, "could not list ambiguous candidates");
                return;
            }
        };

        if self.output.is_json() {
            let items: Vec<_> = candidates
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "id": t.id,
                        "short": t.id.short(),
                        "title": t.title,
                    })
                })
                .collect();
            eprintln!("{}", serde_json::json!({ "candidates": items }));
        } else {
            eprintln!("Tasks matching '{}':", prefix);
            for line in candidate_lines(&candidates) {
                eprintln!("{}", line);
            }
        }
    }
}

/// One `short-id  title` line per candidate
fn candidate_lines(candidates: &[Task]) -> Vec<String> {
    candidates
        .iter()
        .map(|task| format!("  {}  {}", task.id.short(), task.title))
        .collect()
}
