//! Dependency edge model
//!
//! Edges are directed (`from` → `to`), typed, and weighted. Edge identity
//! is the (from, to) pair: re-adding an existing pair merges kind and
//! strength in place rather than duplicating, so downstream
//! frequency-based criticality scoring never double-counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::TaskId;

/// Type of dependency between tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// `from` depends on `to`: `to` must complete before `from` can start
    #[default]
    DependsOn,
    /// `from` blocks `to` from proceeding
    Blocks,
    /// Tasks are related but do not constrain each other's schedule
    RelatedTo,
    /// `to` is a hard prerequisite of `from`
    Prerequisite,
}

impl DependencyKind {
    /// Returns true if this kind constrains scheduling (everything but
    /// `related_to`, which is informational)
    pub fn affects_scheduling(&self) -> bool {
        !matches!(self, DependencyKind::RelatedTo)
    }

    /// Returns a display label for the kind
    pub fn label(&self) -> &'static str {
        match self {
            DependencyKind::DependsOn => "depends_on",
            DependencyKind::Blocks => "blocks",
            DependencyKind::RelatedTo => "related_to",
            DependencyKind::Prerequisite => "prerequisite",
        }
    }
}

/// A directed dependency edge between two tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Source task (the dependent)
    pub from: TaskId,

    /// Target task (the dependency)
    pub to: TaskId,

    /// Kind of dependency
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,

    /// Coupling strength in [0, 1]; scales delay propagation
    pub strength: f64,

    /// When the edge was first added
    pub created_at: DateTime<Utc>,

    /// When the edge was last merged or modified
    pub updated_at: DateTime<Utc>,
}

impl DependencyEdge {
    /// Creates a new edge with current timestamps
    pub fn new(from: TaskId, to: TaskId, kind: DependencyKind, strength: f64) -> Self {
        let now = Utc::now();
        Self {
            from,
            to,
            kind,
            strength,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges another spec into this edge in place, touching `updated_at`
    pub fn merge(&mut self, kind: DependencyKind, strength: f64) {
        self.kind = kind;
        self.strength = strength;
        self.updated_at = Utc::now();
    }
}

/// Input specification for an edge to be upserted
///
/// The source task is supplied separately by the store call; a spec only
/// names the target and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    /// Target task
    pub to: TaskId,

    /// Kind of dependency
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,

    /// Coupling strength in [0, 1]
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    1.0
}

impl EdgeSpec {
    /// Creates a spec with full strength and the default kind
    pub fn to(target: TaskId) -> Self {
        Self {
            to: target,
            kind: DependencyKind::default(),
            strength: 1.0,
        }
    }

    /// Sets the kind
    pub fn kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the strength
    pub fn strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }
}

/// Diff between two edge sets for one task, consumed by impact analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDiff {
    /// Edges present after but not before
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<DependencyEdge>,

    /// Edges present before but not after
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<DependencyEdge>,

    /// Edges present in both with changed kind or strength
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modified: Vec<DependencyEdge>,
}

impl EdgeDiff {
    /// Returns true if the diff carries no changes
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed edges
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[test]
    fn default_kind_is_depends_on() {
        let spec = EdgeSpec::to(tid("b"));
        assert_eq!(spec.kind, DependencyKind::DependsOn);
        assert_eq!(spec.strength, 1.0);
    }

    #[test]
    fn related_to_does_not_affect_scheduling() {
        assert!(DependencyKind::DependsOn.affects_scheduling());
        assert!(DependencyKind::Blocks.affects_scheduling());
        assert!(DependencyKind::Prerequisite.affects_scheduling());
        assert!(!DependencyKind::RelatedTo.affects_scheduling());
    }

    #[test]
    fn merge_touches_updated_at_only() {
        let mut edge = DependencyEdge::new(tid("a"), tid("b"), DependencyKind::DependsOn, 0.5);
        let created = edge.created_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        edge.merge(DependencyKind::Blocks, 0.9);

        assert_eq!(edge.kind, DependencyKind::Blocks);
        assert_eq!(edge.strength, 0.9);
        assert_eq!(edge.created_at, created);
        assert!(edge.updated_at > created);
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&DependencyKind::RelatedTo).unwrap();
        assert_eq!(json, "\"related_to\"");
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: EdgeSpec = serde_json::from_str(r#"{"to": "task-2"}"#).unwrap();
        assert_eq!(spec.to.as_str(), "task-2");
        assert_eq!(spec.kind, DependencyKind::DependsOn);
        assert_eq!(spec.strength, 1.0);
    }

    #[test]
    fn empty_diff() {
        let diff = EdgeDiff::default();
        assert!(diff.is_empty());
        assert_eq!(diff.len(), 0);
    }
}
