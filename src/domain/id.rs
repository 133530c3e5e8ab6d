//! Task identifiers
//!
//! ID Format:
//! - Full IDs: 40 lowercase hex characters (a 160-bit digest)
//! - Short IDs: the first 7 characters, used for display
//! - Lookups accept the full ID or any prefix of at least 4 characters
//!
//! The digest covers kind + title + description + creation timestamp plus a
//! random nonce, so identical input at the same instant still yields distinct
//! IDs. IDs look like content hashes but never deduplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::task::Kind;

/// Length of a full task ID in hex characters
pub const ID_LEN: usize = 40;

/// Length of the display form of a task ID
pub const SHORT_LEN: usize = 7;

/// Shortest input that is treated as a prefix lookup
pub const MIN_PREFIX_LEN: usize = 4;

const DIGEST_BYTES: usize = ID_LEN / 2;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid task ID: expected {ID_LEN} lowercase hex characters, got '{0}'")]
    InvalidTaskId(String),
}

/// Computes the hex digest for a new task
fn generate_hash(
    kind: Kind,
    title: &str,
    description: &str,
    created: DateTime<Utc>,
    nonce: &Uuid,
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(description.as_bytes());
    hasher.update(created.timestamp_nanos_opt().unwrap_or(0).to_string().as_bytes());
    hasher.update(nonce.as_bytes());

    let mut digest = [0u8; DIGEST_BYTES];
    hasher.finalize_xof().fill(&mut digest);

    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Task ID: 40 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Generates a fresh ID for a task with the given content
    pub fn generate(kind: Kind, title: &str, description: &str, created: DateTime<Utc>) -> Self {
        Self(generate_hash(
            kind,
            title,
            description,
            created,
            &Uuid::new_v4(),
        ))
    }

    /// Returns the display form (first 7 characters)
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }

    /// Returns the full ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ID_LEN || !is_lower_hex(s) {
            return Err(IdError::InvalidTaskId(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How a user-supplied ID should be looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Try an exact match first, then fall back to the prefix
    Prefix(String),
    /// Only an exact match can succeed
    Exact(String),
}

impl Lookup {
    /// Classifies raw user input
    ///
    /// Input is trimmed and lowercased. Anything of length 4..40 made of hex
    /// digits may be a prefix. Shorter input, full-length input, and input
    /// with non-hex characters only ever match exactly.
    pub fn classify(input: &str) -> Self {
        let normalized = input.trim().to_ascii_lowercase();
        let len = normalized.len();

        if (MIN_PREFIX_LEN..ID_LEN).contains(&len) && is_lower_hex(&normalized) {
            Lookup::Prefix(normalized)
        } else {
            Lookup::Exact(normalized)
        }
    }

    /// The normalized input string
    pub fn input(&self) -> &str {
        match self {
            Lookup::Prefix(s) | Lookup::Exact(s) => s,
        }
    }
}

/// Why a lookup did not produce exactly one task
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No task matches '{0}'")]
    NotFound(String),

    #[error("'{input}' is ambiguous: {count} tasks match")]
    Ambiguous { input: String, count: usize },
}

/// Reduces a set of prefix matches to a single result
pub fn single_match<T>(input: &str, mut matches: Vec<T>) -> Result<T, ResolveError> {
    match matches.len() {
        0 => Err(ResolveError::NotFound(input.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(ResolveError::Ambiguous {
            input: input.to_string(),
            count,
        }),
    }
}
