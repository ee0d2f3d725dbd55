//! Conflict and resolution records
//!
//! A [`Conflict`] is produced by a detection pass and retained after
//! resolution for audit. A [`Resolution`] is a pure recommendation: the
//! strategy that produced it never touches the graph, and executing the
//! recommended actions is the orchestrator's call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{ConflictId, TaskId};
use super::impact::ImpactLevel;
use crate::oracle::Priority;

/// Category of detected conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Dependency-linked tasks with overlapping schedule windows
    Scheduling,
    /// Tasks contending for the same resource at the same time
    Resource,
    /// A higher-priority task depending on a lower-priority one
    Priority,
    /// Structural dependency problems (cycles, self-loops)
    Dependency,
}

impl ConflictKind {
    /// Returns a display label for the kind
    pub fn label(&self) -> &'static str {
        match self {
            ConflictKind::Scheduling => "scheduling",
            ConflictKind::Resource => "resource",
            ConflictKind::Priority => "priority",
            ConflictKind::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Conflict severity, ordered worst-last so lists sort naturally
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Returns true for the severities that count toward impact risk scoring
    pub fn is_elevated(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

/// A detected conflict between tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// Stable generated id
    pub id: ConflictId,

    /// Conflict category
    #[serde(rename = "type")]
    pub kind: ConflictKind,

    /// How bad it is
    pub severity: Severity,

    /// Involved task ids, in detection order (cycle order for
    /// dependency conflicts)
    pub tasks: Vec<TaskId>,

    /// Human-readable detail
    pub detail: String,

    /// When the conflict was detected
    pub detected_at: DateTime<Utc>,

    /// Resolution recommendation, once one has been applied to the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Conflict {
    /// Creates a new unresolved conflict with a generated id
    pub fn new(kind: ConflictKind, severity: Severity, tasks: Vec<TaskId>, detail: String) -> Self {
        let detected_at = Utc::now();
        let label = format!(
            "{}:{}",
            kind.label(),
            tasks
                .iter()
                .map(TaskId::as_str)
                .collect::<Vec<_>>()
                .join(",")
        );
        Self {
            id: ConflictId::generate(&label, detected_at),
            kind,
            severity,
            tasks,
            detail,
            detected_at,
            resolution: None,
        }
    }

    /// Returns true once a resolution has been recorded
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Returns true if the conflict involves the given task
    pub fn involves(&self, task: &TaskId) -> bool {
        self.tasks.contains(task)
    }
}

/// A single recommended action within a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Shift a task's schedule window by the given number of hours
    Reschedule { task: TaskId, shift_hours: i64 },

    /// Move a task off its currently assigned resource
    ReassignResource {
        task: TaskId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from_resource: Option<String>,
    },

    /// Remove a dependency edge from the graph
    BreakEdge { from: TaskId, to: TaskId },

    /// Raise a task's priority to match its dependents
    Reprioritize { task: TaskId, raise_to: Priority },

    /// Hand the conflict to a human; no automatic action is safe
    Escalate { reason: String },
}

/// A pure resolution recommendation produced by a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Name of the strategy that produced this recommendation
    pub strategy: String,

    /// Recommended actions, in application order
    pub actions: Vec<ResolutionAction>,

    /// Estimated blast radius of applying the actions
    pub estimated_impact: ImpactLevel,

    /// When the recommendation was produced
    pub resolved_at: DateTime<Utc>,
}

impl Resolution {
    /// Creates a resolution stamped with the current time
    pub fn new(
        strategy: impl Into<String>,
        actions: Vec<ResolutionAction>,
        estimated_impact: ImpactLevel,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            actions,
            estimated_impact,
            resolved_at: Utc::now(),
        }
    }
}
