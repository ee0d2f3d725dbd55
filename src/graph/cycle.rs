//! Cycle detection
//!
//! Depth-first search over the store's forward adjacency. One visited
//! set and one recursion stack are shared across *all* seeds within a
//! single [`detect_cycles`] call — not reset per seed — which keeps the
//! search O(V+E) over the reachable subgraph. When traversal reaches a
//! node already on the recursion stack it emits the stack slice from
//! that node onward as a cycle.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use super::store::DependencyStore;
use crate::domain::TaskId;

/// An ordered cycle of task ids
///
/// `nodes` holds the cycle without repeating the closing node: a→b→c→a
/// is `[a, b, c]`, and a self-loop a→a is the one-element cycle `[a]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub nodes: Vec<TaskId>,
}

impl Cycle {
    /// Number of distinct tasks on the cycle
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Cycles are never empty, but the conventional pair keeps clippy
    /// and callers honest
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns true for a one-node cycle (a task depending on itself)
    pub fn is_self_loop(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Returns true if the cycle passes through the given task
    pub fn contains(&self, task: &TaskId) -> bool {
        self.nodes.contains(task)
    }

    /// Rotation-insensitive equality: a→b→c→a equals b→c→a→b
    pub fn rotation_eq(&self, other: &Cycle) -> bool {
        if self.nodes.len() != other.nodes.len() {
            return false;
        }
        let n = self.nodes.len();
        (0..n).any(|offset| (0..n).all(|i| self.nodes[i] == other.nodes[(i + offset) % n]))
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{} -> ", node)?;
        }
        match self.nodes.first() {
            Some(first) => write!(f, "{}", first),
            None => Ok(()),
        }
    }
}

struct Frame {
    node: TaskId,
    targets: Vec<TaskId>,
    next: usize,
}

impl Frame {
    fn new(node: TaskId, store: &DependencyStore) -> Self {
        let targets = store.targets(&node).cloned().collect();
        Self {
            node,
            targets,
            next: 0,
        }
    }
}

/// Finds all cycles reachable from the given seeds
///
/// Nodes explored from an earlier seed are skipped by later seeds; a
/// caller that needs completeness over a task set should pass the whole
/// set as seeds, which the orchestrator does.
pub fn detect_cycles(store: &DependencyStore, seeds: &[TaskId]) -> Vec<Cycle> {
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut on_stack: HashSet<TaskId> = HashSet::new();
    let mut cycles = Vec::new();

    for seed in seeds {
        if visited.contains(seed) {
            continue;
        }
        visited.insert(seed.clone());
        on_stack.insert(seed.clone());
        let mut frames = vec![Frame::new(seed.clone(), store)];

        while let Some(frame) = frames.last_mut() {
            if frame.next < frame.targets.len() {
                let target = frame.targets[frame.next].clone();
                frame.next += 1;

                if on_stack.contains(&target) {
                    // Back edge: the stack slice from the target onward,
                    // plus the closing edge, is a cycle.
                    if let Some(pos) = frames.iter().position(|f| f.node == target) {
                        let nodes: Vec<TaskId> =
                            frames[pos..].iter().map(|f| f.node.clone()).collect();
                        cycles.push(Cycle { nodes });
                    }
                } else if !visited.contains(&target) {
                    visited.insert(target.clone());
                    on_stack.insert(target.clone());
                    frames.push(Frame::new(target, store));
                }
            } else {
                on_stack.remove(&frame.node);
                frames.pop();
            }
        }
    }

    if !cycles.is_empty() {
        debug!(count = cycles.len(), "cycles detected");
    }
    cycles
}

/// Returns true if any cycle passes through the given task
pub fn has_cycle_through(store: &DependencyStore, task: &TaskId) -> bool {
    detect_cycles(store, std::slice::from_ref(task))
        .iter()
        .any(|cycle| cycle.contains(task))
}
