//! Task-attribute oracle
//!
//! The engine owns dependency structure only. Everything else it needs
//! to know about a task — existence, priority, schedule window, resource
//! assignment — comes from an injected [`TaskLookup`] implementation
//! owned by the caller (typically backed by the task store behind the
//! API layer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::TaskId;

/// Task priority as reported by the attribute store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A scheduled execution window for a task
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduleWindow {
    /// Creates a window; callers are expected to pass start <= end
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns true if the two windows share any time
    pub fn overlaps(&self, other: &ScheduleWindow) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Hours of overlap between the two windows, zero if disjoint
    pub fn overlap_hours(&self, other: &ScheduleWindow) -> f64 {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start >= end {
            return 0.0;
        }
        (end - start).num_minutes() as f64 / 60.0
    }
}

/// Attributes the engine may query for a known task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TaskAttributes {
    /// Scheduling priority
    #[serde(default)]
    pub priority: Priority,

    /// Planned execution window, if scheduled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<ScheduleWindow>,

    /// Assigned resource (person, agent, machine), if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Planned deadline, if one exists independent of the window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

/// Read-only task-attribute source injected into the engine
///
/// Returning `None` means the task is unknown to the attribute store;
/// the engine treats unknown tasks as a validation failure on mutation
/// and skips them during attribute-driven detection.
pub trait TaskLookup {
    /// Returns the attributes for a task, or `None` if unknown
    fn get(&self, id: &TaskId) -> Option<TaskAttributes>;

    /// Returns true if the task exists in the attribute store
    fn exists(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }
}

/// A plain map works as a lookup; used by callers that snapshot their
/// task table before invoking the engine
impl TaskLookup for HashMap<TaskId, TaskAttributes> {
    fn get(&self, id: &TaskId) -> Option<TaskAttributes> {
        HashMap::get(self, id).cloned()
    }
}

impl<L: TaskLookup> TaskLookup for &L {
    fn get(&self, id: &TaskId) -> Option<TaskAttributes> {
        (**self).get(id)
    }
}
