//! Domain models for tsk
//!
//! Contains the core business logic without any I/O concerns.

mod blocking;
mod id;
mod lifecycle;
mod task;

pub use blocking::SelfBlock;
pub use id::{
    single_match, IdError, Lookup, ResolveError, TaskId, ID_LEN, MIN_PREFIX_LEN, SHORT_LEN,
};
pub use lifecycle::{can_transition_to, check_transition, reopen_target, TransitionError};
pub use task::{
    validate_fields, Kind, NewTask, Priority, State, Tags, Task, ValidationError, TAG_SEPARATOR,
};
