//! Task lifecycle
//!
//! | From        | Allowed to                  |
//! |-------------|-----------------------------|
//! | INBOX       | NEW, INVALID                |
//! | NEW         | IN_PROGRESS, DONE, CANCELLED|
//! | IN_PROGRESS | DONE, CANCELLED             |
//! | DONE        | IN_PROGRESS                 |
//! | CANCELLED   | NEW, IN_PROGRESS            |
//! | INVALID     | (terminal)                  |
//!
//! A task with children may only become DONE once every child is DONE or
//! CANCELLED. Blocking never gates a transition.

use thiserror::Error;

use super::id::TaskId;
use super::task::{State, Task};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot move a task from {from} to {to}")]
    Illegal { from: State, to: State },

    #[error("Child task {} is still {state}", .child.short())]
    ParentIncomplete { child: TaskId, state: State },
}

impl State {
    /// States reachable from this one in a single move
    pub fn allowed_targets(&self) -> &'static [State] {
        match self {
            State::Inbox => &[State::New, State::Invalid],
            State::New => &[State::InProgress, State::Done, State::Cancelled],
            State::InProgress => &[State::Done, State::Cancelled],
            State::Done => &[State::InProgress],
            State::Cancelled => &[State::New, State::InProgress],
            State::Invalid => &[],
        }
    }

    /// Returns true if the transition table allows `self -> target`
    pub fn can_move_to(&self, target: State) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Returns true if no move leaves this state
    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }
}

/// Checks a requested move against the table and the children overlay
///
/// Reports the first child (in the given order) that is neither DONE nor
/// CANCELLED when the target is DONE.
pub fn check_transition(
    task: &Task,
    target: State,
    children: &[Task],
) -> Result<(), TransitionError> {
    if !task.state.can_move_to(target) {
        return Err(TransitionError::Illegal {
            from: task.state,
            to: target,
        });
    }

    if target == State::Done {
        if let Some(child) = children.iter().find(|c| !c.state.is_settled()) {
            return Err(TransitionError::ParentIncomplete {
                child: child.id.clone(),
                state: child.state,
            });
        }
    }

    Ok(())
}

/// Pure form of [`check_transition`]
pub fn can_transition_to(task: &Task, target: State, children: &[Task]) -> bool {
    check_transition(task, target, children).is_ok()
}

/// Target of the `reopen` shortcut for a settled task
pub fn reopen_target(state: State) -> Option<State> {
    match state {
        State::Done => Some(State::InProgress),
        State::Cancelled => Some(State::New),
        _ => None,
    }
}
