//! Task domain model
//!
//! A task is the single tracked work item: a bug, feature or regression with
//! a priority, a lifecycle state, and optional links to a parent task and to
//! a task blocking it. Links are plain IDs and never own the other task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::id::TaskId;

/// Separator used when tags are stored as text
pub const TAG_SEPARATOR: char = ',';

/// Reasons a task fails validation; only the first failing check is reported
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Description must not be empty")]
    EmptyDescription,

    #[error("Invalid kind '{0}': expected one of BUG, FEATURE, REGRESSION")]
    InvalidKind(String),

    #[error("Invalid priority '{0}': expected one of high, medium, low")]
    InvalidPriority(String),

    #[error("Invalid state '{0}': expected one of INBOX, NEW, IN_PROGRESS, DONE, CANCELLED, INVALID")]
    InvalidState(String),
}

/// Kind of work a task describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    Bug,
    Feature,
    Regression,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Bug, Kind::Feature, Kind::Regression];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Bug => "BUG",
            Kind::Feature => "FEATURE",
            Kind::Regression => "REGRESSION",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidKind(s.to_string()))
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Sort rank for listings: high first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidPriority(s.to_string()))
    }
}

/// Lifecycle state of a task
///
/// New tasks start in `Inbox`. `Invalid` is terminal. See
/// [`crate::domain::lifecycle`] for the allowed moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    #[default]
    Inbox,
    New,
    InProgress,
    Done,
    Cancelled,
    Invalid,
}

impl State {
    pub const ALL: [State; 6] = [
        State::Inbox,
        State::New,
        State::InProgress,
        State::Done,
        State::Cancelled,
        State::Invalid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Inbox => "INBOX",
            State::New => "NEW",
            State::InProgress => "IN_PROGRESS",
            State::Done => "DONE",
            State::Cancelled => "CANCELLED",
            State::Invalid => "INVALID",
        }
    }

    /// Sort rank for listings: active work first, then fresh work
    pub fn rank(&self) -> u8 {
        match self {
            State::InProgress => 0,
            State::New => 1,
            _ => 2,
        }
    }

    /// Returns true if a child in this state lets its parent be completed
    pub fn is_settled(&self) -> bool {
        matches!(self, State::Done | State::Cancelled)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('-', "_");
        State::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ValidationError::InvalidState(s.to_string()))
    }
}

/// Unordered set of short labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeSet<String>);

impl Tags {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Parses stored tag text; blank entries are dropped
    pub fn parse(text: &str) -> Self {
        text.split(TAG_SEPARATOR).collect()
    }

    /// Adds a tag, returning false if nothing new was added
    ///
    /// Text containing the separator adds each part as its own tag.
    pub fn insert(&mut self, tag: &str) -> bool {
        let mut added = false;
        for part in tag.split(TAG_SEPARATOR).map(str::trim) {
            if !part.is_empty() {
                added |= self.0.insert(part.to_string());
            }
        }
        added
    }

    pub fn remove(&mut self, tag: &str) -> bool {
        self.0.remove(tag.trim())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.0 {
            if !first {
                write!(f, "{}", TAG_SEPARATOR)?;
            }
            f.write_str(tag)?;
            first = false;
        }
        Ok(())
    }
}

impl<S: AsRef<str>> FromIterator<S> for Tags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut tags = Tags::new();
        for tag in iter {
            tags.insert(tag.as_ref());
        }
        tags
    }
}

/// A tracked task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, assigned at creation
    pub id: TaskId,

    /// Parent task, for hierarchical grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,

    /// Task that must finish before this one can proceed (advisory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<TaskId>,

    pub kind: Kind,

    pub priority: Priority,

    pub state: State,

    pub title: String,

    pub description: String,

    /// Who created the task
    pub author: String,

    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,

    /// Where the task came from (file:line, issue number, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub created: DateTime<Utc>,

    /// Maintained by the store on every write
    pub updated: DateTime<Utc>,
}

impl Task {
    /// Checks field invariants, in order: title, description, then the
    /// enumerations (already guaranteed by the typed fields)
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_text(&self.title, &self.description)
    }

    /// Returns true if another task is blocking this one
    pub fn is_blocked(&self) -> bool {
        self.blocked_by.is_some()
    }
}

/// Caller-supplied fields for a task that does not exist yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub kind: Kind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub parent: Option<TaskId>,
    pub tags: Tags,
    pub source: Option<String>,
    pub author: String,
}

impl NewTask {
    pub fn new(kind: Kind, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            priority: Priority::default(),
            title: title.into(),
            description: description.into(),
            parent: None,
            tags: Tags::new(),
            source: None,
            author: String::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Builds the task with a freshly generated ID in the initial state
    pub fn into_task(self, now: DateTime<Utc>) -> Task {
        let id = TaskId::generate(self.kind, &self.title, &self.description, now);
        Task {
            id,
            parent: self.parent,
            blocked_by: None,
            kind: self.kind,
            priority: self.priority,
            state: State::default(),
            title: self.title,
            description: self.description,
            author: self.author,
            tags: self.tags,
            source: self.source,
            created: now,
            updated: now,
        }
    }
}

fn validate_text(title: &str, description: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    Ok(())
}

/// Validates raw field text as it arrives from outside (CLI flags, stored rows)
///
/// Checks run in the same order as [`Task::validate`]; the first failure wins.
pub fn validate_fields(
    title: &str,
    description: &str,
    kind: &str,
    priority: &str,
    state: &str,
) -> Result<(Kind, Priority, State), ValidationError> {
    validate_text(title, description)?;
    let kind: Kind = kind.parse()?;
    let priority: Priority = priority.parse()?;
    let state: State = state.parse()?;
    Ok((kind, priority, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_task(title: &str, description: &str) -> Task {
        NewTask::new(Kind::Bug, title, description)
            .with_author("tester")
            .into_task(Utc::now())
    }

    #[test]
    fn new_task_starts_in_inbox_with_medium_priority() {
        let task = make_task("Fix leak", "leaks memory");

        assert_eq!(task.state, State::Inbox);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.created, task.updated);
        assert!(!task.is_blocked());
        assert!(task.parent.is_none());
    }

    #[test]
    fn blank_title_is_rejected() {
        let task = make_task("   ", "leaks memory");
        assert_eq!(task.validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn blank_description_is_rejected() {
        let task = make_task("Fix leak", "\n\t ");
        assert_eq!(task.validate(), Err(ValidationError::EmptyDescription));
    }

    #[test]
    fn first_failing_check_wins() {
        let task = make_task("", "");
        assert_eq!(task.validate(), Err(ValidationError::EmptyTitle));

        assert_eq!(
            validate_fields("t", "", "nope", "nope", "nope"),
            Err(ValidationError::EmptyDescription)
        );
        assert_eq!(
            validate_fields("t", "d", "nope", "nope", "nope"),
            Err(ValidationError::InvalidKind("nope".to_string()))
        );
        assert_eq!(
            validate_fields("t", "d", "bug", "urgent", "nope"),
            Err(ValidationError::InvalidPriority("urgent".to_string()))
        );
        assert_eq!(
            validate_fields("t", "d", "bug", "low", "open"),
            Err(ValidationError::InvalidState("open".to_string()))
        );
    }

    #[test]
    fn validate_fields_parses_enumerations() {
        let parsed = validate_fields("t", "d", "REGRESSION", "High", "in-progress").unwrap();
        assert_eq!(parsed, (Kind::Regression, Priority::High, State::InProgress));
    }

    #[test]
    fn enum_text_roundtrip() {
        for kind in Kind::ALL {
            assert_eq!(kind.as_str().parse::<Kind>().unwrap(), kind);
        }
        for priority in Priority::ALL {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        for state in State::ALL {
            assert_eq!(state.as_str().parse::<State>().unwrap(), state);
        }
    }

    #[test]
    fn ranks_order_listings() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
        assert_eq!(State::InProgress.rank(), 0);
        assert_eq!(State::New.rank(), 1);
        assert_eq!(State::Done.rank(), 2);
        assert_eq!(State::Inbox.rank(), 2);
    }

    #[test]
    fn settled_states() {
        assert!(State::Done.is_settled());
        assert!(State::Cancelled.is_settled());
        assert!(!State::New.is_settled());
        assert!(!State::Invalid.is_settled());
    }

    #[test]
    fn tags_parse_and_serialize() {
        let tags = Tags::parse("db, ui,,db , perf");

        assert_eq!(tags.len(), 3);
        assert!(tags.contains("db"));
        assert!(tags.contains("perf"));
        assert_eq!(tags.to_string(), "db,perf,ui");
        assert_eq!(Tags::parse(&tags.to_string()), tags);
    }

    #[test]
    fn empty_tag_text_is_empty_set() {
        assert!(Tags::parse("").is_empty());
        assert_eq!(Tags::new().to_string(), "");
    }

    #[test]
    fn separator_inside_a_tag_splits_it() {
        let tags: Tags = ["a,b"].into_iter().collect();

        assert_eq!(tags.len(), 2);
        assert_eq!(Tags::parse(&tags.to_string()), tags);

        let mut tags = Tags::new();
        assert!(tags.insert("x, y"));
        assert!(!tags.insert("y,x"));
        assert_eq!(tags.to_string(), "x,y");
    }

    #[test]
    fn tags_insert_and_remove() {
        let mut tags = Tags::new();

        assert!(tags.insert("backend"));
        assert!(!tags.insert("backend"));
        assert!(!tags.insert("  "));
        assert!(tags.remove("backend"));
        assert!(tags.is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let mut task = make_task("Fix leak", "leaks memory");
        task.tags = Tags::parse("mem,core");
        task.source = Some("src/alloc.rs:42".to_string());

        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, task);
        assert!(json.contains("\"state\":\"INBOX\""));
        assert!(json.contains("\"priority\":\"medium\""));
    }
}
