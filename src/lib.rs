//! tsk - a personal task tracker
//!
//! Tasks are bugs, features or regressions identified by 40-character hex
//! IDs (referenced by 7-character short forms or any unique prefix of 4+
//! characters). They move through a small lifecycle, can be grouped under a
//! parent and can be marked as blocked by another task. Everything lives in
//! an embedded SQLite database under `.tsk/`.

pub mod cli;
pub mod domain;
pub mod identity;
pub mod storage;

pub use domain::{Kind, NewTask, Priority, State, Task, TaskId};
pub use storage::{ListFilter, StoreError, TaskStore};
