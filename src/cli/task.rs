//! Task CLI commands: create, edit, delete, state moves and blocking

use anyhow::{bail, Result};
use clap::Args;

use super::output::Output;
use super::session::Session;
use crate::domain::{
    reopen_target, validate_fields, Kind, NewTask, Priority, State, Tags, Task, TAG_SEPARATOR,
};

/// Fields shared by `add` and `add-subtask`
#[derive(Args, Debug)]
pub struct TaskFields {
    /// Task title
    pub title: String,

    /// What needs doing and why
    #[arg(long, short = 'd')]
    pub description: String,

    /// BUG, FEATURE or REGRESSION
    #[arg(long, short = 'k', default_value = "BUG")]
    pub kind: String,

    /// high, medium or low
    #[arg(long, short = 'p', default_value = "medium")]
    pub priority: String,

    /// Tag (repeatable, or comma-separated)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Where the task came from (file:line, issue, ...)
    #[arg(long)]
    pub source: Option<String>,
}

/// Optional replacements for `edit`
#[derive(Args, Debug, Default)]
pub struct EditFields {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'k')]
    pub kind: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<String>,

    /// Replaces all tags (comma-separated; empty clears)
    #[arg(long)]
    pub tags: Option<String>,

    /// Replaces the source (empty clears)
    #[arg(long)]
    pub source: Option<String>,
}

impl EditFields {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.kind.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.source.is_none()
    }
}

/// Shortcut moves to a fixed state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Accept,
    Reject,
    Start,
    Done,
    Cancel,
}

impl Shortcut {
    fn target(self) -> State {
        match self {
            Shortcut::Accept => State::New,
            Shortcut::Reject => State::Invalid,
            Shortcut::Start => State::InProgress,
            Shortcut::Done => State::Done,
            Shortcut::Cancel => State::Cancelled,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Shortcut::Accept => "Accepted",
            Shortcut::Reject => "Rejected",
            Shortcut::Start => "Started",
            Shortcut::Done => "Completed",
            Shortcut::Cancel => "Cancelled",
        }
    }
}

fn new_task(fields: TaskFields, author: String) -> Result<NewTask> {
    let (kind, priority, _) = validate_fields(
        &fields.title,
        &fields.description,
        &fields.kind,
        &fields.priority,
        State::default().as_str(),
    )?;

    let mut task = NewTask::new(kind, fields.title.trim(), fields.description.trim())
        .with_priority(priority)
        .with_tags(split_tags(&fields.tags))
        .with_author(author);
    if let Some(source) = fields.source.filter(|s| !s.trim().is_empty()) {
        task = task.with_source(source.trim());
    }
    Ok(task)
}

fn split_tags<S: AsRef<str>>(raw: &[S]) -> Tags {
    raw.iter()
        .flat_map(|t| t.as_ref().split(TAG_SEPARATOR))
        .collect()
}

pub fn add(output: &Output, fields: TaskFields) -> Result<()> {
    let mut session = Session::open(output)?;
    let new = new_task(fields, session.author())?;

    let result = session.store.create(new);
    let task = session.check(result)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Created task {}: {}", task.id.short(), task.title));
    }

    Ok(())
}

pub fn add_subtask(output: &Output, parent: &str, fields: TaskFields) -> Result<()> {
    let mut session = Session::open(output)?;
    let parent = session.resolve(parent)?;
    let new = new_task(fields, session.author())?.with_parent(parent.id.clone());

    let result = session.store.create(new);
    let task = session.check(result)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!(
            "Created subtask {} under {}: {}",
            task.id.short(),
            parent.id.short(),
            task.title
        ));
    }

    Ok(())
}

pub fn show(output: &Output, id: &str) -> Result<()> {
    let session = Session::open(output)?;
    let task = session.resolve(id)?;
    let children = session.store.children(&task.id)?;
    let blocker = match &task.blocked_by {
        Some(blocker) => session.store.find(blocker)?,
        None => None,
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task,
            "children": children,
            "blocker": blocker,
        }));
        return Ok(());
    }

    output.task(&task);

    if let Some(blocked_by) = &task.blocked_by {
        println!();
        match &blocker {
            Some(b) => println!("Blocked by: {} ({}) {}", b.id.short(), b.state, b.title),
            None => println!("Blocked by: {} (deleted)", blocked_by.short()),
        }
    }

    if !children.is_empty() {
        println!();
        println!("Subtasks:");
        for child in &children {
            println!("  {}  {:<11}  {}", child.id.short(), child.state.as_str(), child.title);
        }
    }

    Ok(())
}

pub fn edit(output: &Output, id: &str, fields: EditFields) -> Result<()> {
    if fields.is_empty() {
        bail!(
            "Nothing to change. Pass at least one of \
             --title, --description, --kind, --priority, --tags, --source"
        );
    }

    let mut session = Session::open(output)?;
    let mut task = session.resolve(id)?;

    if let Some(title) = fields.title {
        task.title = title.trim().to_string();
    }
    if let Some(description) = fields.description {
        task.description = description.trim().to_string();
    }
    if let Some(kind) = fields.kind {
        task.kind = kind.parse::<Kind>()?;
    }
    if let Some(priority) = fields.priority {
        task.priority = priority.parse::<Priority>()?;
    }
    if let Some(tags) = fields.tags {
        task.tags = Tags::parse(&tags);
    }
    if let Some(source) = fields.source {
        let source = source.trim();
        task.source = (!source.is_empty()).then(|| source.to_string());
    }

    let result = session.store.update(&task);
    let task = session.check(result)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Updated task {}", task.id.short()));
    }

    Ok(())
}

pub fn delete(output: &Output, id: &str) -> Result<()> {
    let session = Session::open(output)?;
    let task = session.resolve(id)?;
    session.store.delete(&task.id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "deleted": true,
        }));
    } else {
        output.success(&format!("Deleted task {}: {}", task.id.short(), task.title));
    }

    Ok(())
}

pub fn shortcut(output: &Output, id: &str, shortcut: Shortcut) -> Result<()> {
    let mut session = Session::open(output)?;
    let result = session.store.update_state(id, shortcut.target());
    let task = session.check(result)?;

    report_state(output, shortcut.verb(), &task);
    Ok(())
}

pub fn reopen(output: &Output, id: &str) -> Result<()> {
    let mut session = Session::open(output)?;
    let task = session.resolve(id)?;

    let Some(target) = reopen_target(task.state) else {
        bail!(
            "Only DONE or CANCELLED tasks can be reopened; {} is {}",
            task.id.short(),
            task.state
        );
    };

    let result = session.store.update_state(task.id.as_str(), target);
    let task = session.check(result)?;

    report_state(output, "Reopened", &task);
    Ok(())
}

pub fn move_to(output: &Output, id: &str, state: &str) -> Result<()> {
    let target: State = state.parse()?;

    let mut session = Session::open(output)?;
    let result = session.store.update_state(id, target);
    let task = session.check(result)?;

    report_state(output, "Moved", &task);
    Ok(())
}

fn report_state(output: &Output, verb: &str, task: &Task) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "state": task.state,
        }));
    } else {
        output.success(&format!(
            "{} task {} ({}): {}",
            verb,
            task.id.short(),
            task.state,
            task.title
        ));
    }
}

pub fn block(output: &Output, id: &str, blocker: &str) -> Result<()> {
    let mut session = Session::open(output)?;
    let result = session.store.block(id, blocker);
    let task = session.check(result)?;

    let blocker = task
        .blocked_by
        .as_ref()
        .map(|b| b.short().to_string())
        .unwrap_or_default();

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "blocked_by": task.blocked_by,
        }));
    } else {
        output.success(&format!("Task {} is now blocked by {}", task.id.short(), blocker));
    }

    Ok(())
}

pub fn unblock(output: &Output, id: &str) -> Result<()> {
    let mut session = Session::open(output)?;
    let result = session.store.unblock(id);
    let task = session.check(result)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "blocked_by": serde_json::Value::Null,
        }));
    } else {
        output.success(&format!("Task {} is not blocked", task.id.short()));
    }

    Ok(())
}
