//! Blocking relationship
//!
//! A task may name one other task it is waiting on. The link is advisory:
//! it is shown to the user but never stops a state transition, and it is not
//! cleared when the blocker finishes.

use thiserror::Error;

use super::id::TaskId;
use super::task::Task;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Task {} cannot block itself", .0.short())]
pub struct SelfBlock(pub TaskId);

impl Task {
    /// Records `blocker` as the task this one waits on, replacing any previous blocker
    pub fn block_on(&mut self, blocker: &TaskId) -> Result<(), SelfBlock> {
        if &self.id == blocker {
            return Err(SelfBlock(self.id.clone()));
        }
        self.blocked_by = Some(blocker.clone());
        Ok(())
    }

    /// Clears the blocker; returns true if one was set
    pub fn unblock(&mut self) -> bool {
        self.blocked_by.take().is_some()
    }
}
