//! Identifiers for tasks and conflicts
//!
//! Task IDs are opaque: the engine stores no attributes for a task beyond
//! its identity, so any non-empty string is accepted. Conflict IDs are
//! generated: `c-{7-char-hash}`, where the hash is derived from the
//! conflict's kind, involved tasks, and detection timestamp, ensuring
//! uniqueness without a counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Task id must not be empty")]
    EmptyTaskId,

    #[error("Invalid conflict id format: expected 'c-{{7-char-hash}}', got '{0}'")]
    InvalidConflictId(String),
}

/// Generates a 7-character hash from a label and timestamp
fn generate_hash(label: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", label, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Opaque task identifier
///
/// The engine treats task ids as pure identity; attributes (priority,
/// schedule, resource) live behind the [`TaskLookup`](crate::oracle::TaskLookup)
/// oracle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Creates a task id, rejecting empty strings
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(IdError::EmptyTaskId);
        }
        Ok(Self(id))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TaskId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

/// Conflict id in the format `c-{7-char-hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConflictId(String);

impl ConflictId {
    /// Generates a new conflict id from a descriptive label and timestamp
    pub fn generate(label: &str, timestamp: DateTime<Utc>) -> Self {
        Self(format!("c-{}", generate_hash(label, timestamp)))
    }

    /// Parses an existing conflict id, validating the format
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let hash = s
            .strip_prefix("c-")
            .ok_or_else(|| IdError::InvalidConflictId(s.to_string()))?;
        if hash.len() != 7 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdError::InvalidConflictId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConflictId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConflictId> for String {
    fn from(id: ConflictId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_accepts_any_non_empty_string() {
        assert!(TaskId::new("task-1").is_ok());
        assert!(TaskId::new("JIRA-4521").is_ok());
        assert!(TaskId::new("a").is_ok());
    }

    #[test]
    fn task_id_rejects_empty() {
        assert_eq!(TaskId::new(""), Err(IdError::EmptyTaskId));
        assert_eq!(TaskId::new("   "), Err(IdError::EmptyTaskId));
    }

    #[test]
    fn task_id_display_roundtrip() {
        let id = TaskId::new("task-1").unwrap();
        assert_eq!(id.to_string(), "task-1");
        assert_eq!("task-1".parse::<TaskId>().unwrap(), id);
    }

    #[test]
    fn conflict_id_format() {
        let id = ConflictId::generate("scheduling:a,b", Utc::now());
        assert!(id.as_str().starts_with("c-"));
        assert_eq!(id.as_str().len(), 9);
    }

    #[test]
    fn conflict_id_parse_rejects_bad_format() {
        assert!(ConflictId::parse("x-1234567").is_err());
        assert!(ConflictId::parse("c-123").is_err());
        assert!(ConflictId::parse("c-zzzzzzz").is_err());
        assert!(ConflictId::parse("c-1a2b3c4").is_ok());
    }

    #[test]
    fn different_labels_produce_different_ids() {
        let now = Utc::now();
        let a = ConflictId::generate("scheduling:a,b", now);
        let b = ConflictId::generate("resource:a,b", now);
        assert_ne!(a, b);
    }

    #[test]
    fn serde_roundtrip() {
        let id = TaskId::new("task-1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"task-1\"");
        let parsed: TaskId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn empty_task_id_fails_deserialization() {
        let result: Result<TaskId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
