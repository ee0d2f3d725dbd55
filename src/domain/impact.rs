//! Change-impact report model
//!
//! An [`ImpactReport`] describes the downstream effect of a single task
//! change: which tasks are touched, how much delay to expect, and what
//! the caller should do about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::conflict::Severity;
use super::id::TaskId;

/// The kind of change being simulated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A task's outgoing edges were rewritten (walks the edge diff)
    DependencyUpdate,
    /// Outgoing edges were removed (walks the edge diff)
    DependencyRemoval,
    /// The task finished; dependents are unblocked
    TaskCompletion,
    /// The task slipped; dependents inherit the slip
    TaskDelay,
    /// The task was cancelled; dependents lose scheduled-against work
    TaskCancellation,
    /// Unspecified change; dependents flagged without delay estimates
    #[default]
    Generic,
}

impl ChangeType {
    /// Returns a display label for the change type
    pub fn label(&self) -> &'static str {
        match self {
            ChangeType::DependencyUpdate => "dependency_update",
            ChangeType::DependencyRemoval => "dependency_removal",
            ChangeType::TaskCompletion => "task_completion",
            ChangeType::TaskDelay => "task_delay",
            ChangeType::TaskCancellation => "task_cancellation",
            ChangeType::Generic => "generic",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordinal classification of a change's blast radius
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    /// Maps a composite score in [0, 1] onto a level
    ///
    /// Thresholds: low < 0.3 <= medium < 0.5 <= high < 0.8 <= critical.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ImpactLevel::Critical
        } else if score >= 0.5 {
            ImpactLevel::High
        } else if score >= 0.3 {
            ImpactLevel::Medium
        } else {
            ImpactLevel::Low
        }
    }

    /// Returns a display label for the level
    pub fn label(&self) -> &'static str {
        match self {
            ImpactLevel::Low => "low",
            ImpactLevel::Medium => "medium",
            ImpactLevel::High => "high",
            ImpactLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for ImpactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single identified risk contributing to the impact assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// What the risk is
    pub description: String,

    /// How serious it is
    pub severity: Severity,

    /// The task the risk attaches to, when there is a single one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskId>,
}

impl RiskFactor {
    /// Creates a risk factor attached to a task
    pub fn for_task(task: TaskId, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            severity,
            task: Some(task),
        }
    }
}

/// Result of simulating the downstream effect of one task change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// The task that changed
    pub task: TaskId,

    /// The kind of change simulated
    pub change: ChangeType,

    /// Downstream tasks touched by the change, deduplicated, in
    /// discovery order
    pub affected_tasks: Vec<TaskId>,

    /// Composite impact classification
    pub level: ImpactLevel,

    /// Net signed delay estimate in hours (negative means schedule
    /// relief, e.g. after a completion)
    pub estimated_delay_hours: f64,

    /// Identified risks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<RiskFactor>,

    /// What the caller should consider doing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,

    /// How to soften the blow if the change goes ahead
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigations: Vec<String>,

    /// When the analysis ran
    pub analyzed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_thresholds() {
        assert_eq!(ImpactLevel::from_score(0.0), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(0.29), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(0.3), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(0.49), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(0.5), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(0.79), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(0.8), ImpactLevel::Critical);
        assert_eq!(ImpactLevel::from_score(1.0), ImpactLevel::Critical);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(ImpactLevel::Low < ImpactLevel::Medium);
        assert!(ImpactLevel::Medium < ImpactLevel::High);
        assert!(ImpactLevel::High < ImpactLevel::Critical);
    }

    #[test]
    fn change_type_serializes_snake_case() {
        let json = serde_json::to_string(&ChangeType::TaskCancellation).unwrap();
        assert_eq!(json, "\"task_cancellation\"");
    }
}
