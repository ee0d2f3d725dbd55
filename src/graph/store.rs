//! Dependency store
//!
//! Owns the directed graph: a forward adjacency (task -> outgoing edges)
//! and a reverse adjacency (task -> tasks that depend on it). The two
//! maps are only ever mutated together inside a single `&mut self`
//! method, so readers never observe a half-applied update. Nothing
//! outside this type holds a handle to either map.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{DependencyEdge, EdgeSpec, TaskId};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("Edge strength {0} is outside [0, 1]")]
    StrengthOutOfRange(f64),
}

/// Result of an upsert: which targets gained a new edge and which had an
/// existing edge's metadata merged in place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeUpsert {
    pub added: Vec<TaskId>,
    pub updated: Vec<TaskId>,
}

impl EdgeUpsert {
    /// Total number of edges touched
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len()
    }

    /// Returns true if nothing was touched
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty()
    }
}

/// Result of a removal: which targets had an edge removed and which were
/// not present to begin with
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeRemoval {
    pub removed: Vec<DependencyEdge>,
    pub missing: Vec<TaskId>,
}

/// The dependency graph, exclusively owned
///
/// Edge identity is the (from, to) pair: upserting an existing pair
/// merges kind and strength into the stored edge rather than adding a
/// second entry.
#[derive(Debug, Default)]
pub struct DependencyStore {
    /// task -> target -> edge, in insertion order
    forward: IndexMap<TaskId, IndexMap<TaskId, DependencyEdge>>,

    /// task -> tasks that have an edge pointing at it, in insertion order
    reverse: IndexMap<TaskId, IndexSet<TaskId>>,
}

impl DependencyStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts edges from `task` to the given targets as one atomic
    /// operation
    ///
    /// All specs are validated before either map is touched, so a failed
    /// call leaves the graph exactly as it was.
    pub fn add_edges(&mut self, task: &TaskId, specs: &[EdgeSpec]) -> Result<EdgeUpsert, StoreError> {
        for spec in specs {
            if !(0.0..=1.0).contains(&spec.strength) || spec.strength.is_nan() {
                return Err(StoreError::StrengthOutOfRange(spec.strength));
            }
        }

        let mut outcome = EdgeUpsert::default();
        let row = self.forward.entry(task.clone()).or_default();

        for spec in specs {
            match row.get_mut(&spec.to) {
                Some(edge) => {
                    edge.merge(spec.kind, spec.strength);
                    outcome.updated.push(spec.to.clone());
                }
                None => {
                    let edge =
                        DependencyEdge::new(task.clone(), spec.to.clone(), spec.kind, spec.strength);
                    row.insert(spec.to.clone(), edge);
                    self.reverse
                        .entry(spec.to.clone())
                        .or_default()
                        .insert(task.clone());
                    outcome.added.push(spec.to.clone());
                }
            }
        }

        debug!(
            task = %task,
            added = outcome.added.len(),
            updated = outcome.updated.len(),
            "upserted edges"
        );
        Ok(outcome)
    }

    /// Removes edges from `task` to the given targets, updating both
    /// maps atomically
    pub fn remove_edges(&mut self, task: &TaskId, targets: &[TaskId]) -> EdgeRemoval {
        let mut result = EdgeRemoval::default();

        for target in targets {
            let removed = self
                .forward
                .get_mut(task)
                .and_then(|row| row.shift_remove(target));
            match removed {
                Some(edge) => {
                    if let Some(deps) = self.reverse.get_mut(target) {
                        deps.shift_remove(task);
                    }
                    result.removed.push(edge);
                }
                None => result.missing.push(target.clone()),
            }
        }

        debug!(task = %task, removed = result.removed.len(), "removed edges");
        result
    }

    /// Removes a task and every incident edge in both directions;
    /// returns the edges that were dropped
    pub fn remove_task(&mut self, task: &TaskId) -> Vec<DependencyEdge> {
        let mut dropped = Vec::new();

        // Outgoing edges: unhook from each target's reverse entry.
        if let Some(row) = self.forward.shift_remove(task) {
            for (target, edge) in row {
                if let Some(deps) = self.reverse.get_mut(&target) {
                    deps.shift_remove(task);
                }
                dropped.push(edge);
            }
        }

        // Incoming edges: drop each dependent's forward entry.
        if let Some(dependents) = self.reverse.shift_remove(task) {
            for dep in dependents {
                if let Some(row) = self.forward.get_mut(&dep) {
                    if let Some(edge) = row.shift_remove(task) {
                        dropped.push(edge);
                    }
                }
            }
        }

        dropped
    }

    /// Returns the outgoing edges of a task, in insertion order
    pub fn edges(&self, task: &TaskId) -> impl Iterator<Item = &DependencyEdge> {
        self.forward.get(task).into_iter().flat_map(|row| row.values())
    }

    /// Returns a specific edge by its (from, to) identity
    pub fn edge(&self, from: &TaskId, to: &TaskId) -> Option<&DependencyEdge> {
        self.forward.get(from)?.get(to)
    }

    /// Returns the tasks that depend on `task` (reverse adjacency), in
    /// insertion order
    pub fn dependents(&self, task: &TaskId) -> impl Iterator<Item = &TaskId> {
        self.reverse.get(task).into_iter().flatten()
    }

    /// Returns the targets of a task's outgoing edges, in insertion order
    pub fn targets(&self, task: &TaskId) -> impl Iterator<Item = &TaskId> {
        self.forward.get(task).into_iter().flat_map(|row| row.keys())
    }

    /// Returns true if the task appears anywhere in the graph
    pub fn contains(&self, task: &TaskId) -> bool {
        self.forward.contains_key(task) || self.reverse.contains_key(task)
    }

    /// Number of edges in the graph
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(|row| row.len()).sum()
    }

    /// Returns true if the graph holds no edges
    pub fn is_empty(&self) -> bool {
        self.edge_count() == 0
    }
}
