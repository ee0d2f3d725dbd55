//! Critical path analysis
//!
//! A critical path for a query task set is a path of maximum length
//! among all paths discoverable by depth-first enumeration from a seed,
//! stopping at a sink — a task whose dependency targets fall outside the
//! query set — or at the depth cap. Enumeration only runs over paths, so
//! the depth cap (plus the on-path revisit guard) keeps it finite even
//! when the graph holds an unresolved cycle.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

use super::store::DependencyStore;
use crate::domain::TaskId;

/// Default maximum number of hops in an enumerated path
pub const DEFAULT_MAX_DEPTH: usize = 20;

/// Bounds on a single analysis run
#[derive(Debug, Clone, Copy)]
pub struct AnalysisLimits {
    /// Hard cap on path length; also the cycle guard of last resort
    pub max_depth: usize,

    /// Optional wall-clock deadline; on expiry the enumeration stops
    /// and the partial result is marked truncated
    pub deadline: Option<Instant>,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            deadline: None,
        }
    }
}

impl AnalysisLimits {
    /// Limits with a deadline the given duration from now
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            deadline: Some(Instant::now() + timeout),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// An ordered dependency chain discovered during traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub nodes: Vec<TaskId>,
}

impl PathRecord {
    /// Path length in tasks
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true for an empty path (never produced by analysis)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// How often a task shows up on critical paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalityLevel {
    Low,
    Medium,
    High,
}

impl CriticalityLevel {
    /// Ratio 1.0 means the task is on every critical path
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 1.0 {
            CriticalityLevel::High
        } else if ratio > 0.5 {
            CriticalityLevel::Medium
        } else {
            CriticalityLevel::Low
        }
    }
}

/// Per-task criticality within one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCriticality {
    pub task: TaskId,

    /// (# critical paths containing the task) / (total critical paths)
    pub ratio: f64,

    pub level: CriticalityLevel,
}

/// Result of one critical-path analysis over a query set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAnalysis {
    /// The task ids the query ranged over
    pub query: Vec<TaskId>,

    /// All maximum-length paths, per seed, in discovery order
    pub critical_paths: Vec<PathRecord>,

    /// Criticality of every task appearing on a critical path
    pub criticality: Vec<TaskCriticality>,

    /// True if the deadline expired before enumeration finished
    pub truncated: bool,

    pub analyzed_at: DateTime<Utc>,
}

impl PathAnalysis {
    /// Criticality entry for a task, if it appears on any critical path
    pub fn criticality_of(&self, task: &TaskId) -> Option<&TaskCriticality> {
        self.criticality.iter().find(|c| &c.task == task)
    }
}

/// Runs analyses and retains them per project key
#[derive(Debug, Default)]
pub struct CriticalPathAnalyzer {
    analyses: IndexMap<String, Vec<PathAnalysis>>,
}

impl CriticalPathAnalyzer {
    /// Creates an analyzer with no stored analyses
    pub fn new() -> Self {
        Self::default()
    }

    /// Enumerates critical paths for the query set and stores the
    /// analysis under the project key
    pub fn analyze(
        &mut self,
        store: &DependencyStore,
        project: &str,
        query: &[TaskId],
        limits: &AnalysisLimits,
    ) -> PathAnalysis {
        let (critical_paths, truncated) = enumerate_critical_paths(store, query, limits);
        if truncated {
            warn!(project, "critical path enumeration hit its deadline");
        }

        let criticality = score_criticality(&critical_paths);
        let analysis = PathAnalysis {
            query: query.to_vec(),
            critical_paths,
            criticality,
            truncated,
            analyzed_at: Utc::now(),
        };

        debug!(
            project,
            paths = analysis.critical_paths.len(),
            "analysis stored"
        );
        self.analyses
            .entry(project.to_string())
            .or_default()
            .push(analysis.clone());
        analysis
    }

    /// Returns the single longest critical path across all stored
    /// analyses for the project, ties broken by first-found order
    pub fn critical_path(&self, project: &str) -> Option<&PathRecord> {
        let mut best: Option<&PathRecord> = None;
        for analysis in self.analyses.get(project)? {
            for path in &analysis.critical_paths {
                if best.is_none_or(|b| path.len() > b.len()) {
                    best = Some(path);
                }
            }
        }
        best
    }

    /// Returns all stored analyses for a project, oldest first
    pub fn analyses(&self, project: &str) -> &[PathAnalysis] {
        self.analyses.get(project).map_or(&[], Vec::as_slice)
    }
}

/// Enumerates all maximal paths per unvisited seed and keeps, per seed,
/// only those of the seed's maximum observed length
fn enumerate_critical_paths(
    store: &DependencyStore,
    query: &[TaskId],
    limits: &AnalysisLimits,
) -> (Vec<PathRecord>, bool) {
    let in_query: HashSet<&TaskId> = query.iter().collect();
    let mut visited: HashSet<TaskId> = HashSet::new();
    let mut critical: Vec<PathRecord> = Vec::new();
    let mut truncated = false;

    for seed in query {
        if visited.contains(seed) {
            continue;
        }

        let mut paths: Vec<Vec<TaskId>> = Vec::new();
        let mut prefix = Vec::new();
        walk(
            store,
            &in_query,
            seed,
            &mut prefix,
            &mut paths,
            limits,
            &mut truncated,
        );

        let max_len = paths.iter().map(Vec::len).max().unwrap_or(0);
        for path in paths {
            for node in &path {
                visited.insert(node.clone());
            }
            if path.len() == max_len {
                critical.push(PathRecord { nodes: path });
            }
        }

        if truncated {
            break;
        }
    }

    (critical, truncated)
}

/// Accumulator-passing depth-first enumeration with an explicit path
/// stack and depth bound
fn walk(
    store: &DependencyStore,
    in_query: &HashSet<&TaskId>,
    node: &TaskId,
    prefix: &mut Vec<TaskId>,
    out: &mut Vec<Vec<TaskId>>,
    limits: &AnalysisLimits,
    truncated: &mut bool,
) {
    prefix.push(node.clone());

    if limits.expired() {
        *truncated = true;
    }
    if *truncated || prefix.len() >= limits.max_depth {
        out.push(prefix.clone());
        prefix.pop();
        return;
    }

    // Successors stay within the query set; anything else makes this
    // node a sink. The on-path check stops loops from re-entering.
    let successors: Vec<&TaskId> = store
        .targets(node)
        .filter(|t| in_query.contains(t) && !prefix.contains(t))
        .collect();

    if successors.is_empty() {
        out.push(prefix.clone());
    } else {
        for next in successors {
            if *truncated {
                break;
            }
            walk(store, in_query, next, prefix, out, limits, truncated);
        }
    }

    prefix.pop();
}

/// Aggregates per-task frequency over the critical path set
fn score_criticality(critical_paths: &[PathRecord]) -> Vec<TaskCriticality> {
    let total = critical_paths.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: IndexMap<TaskId, usize> = IndexMap::new();
    for path in critical_paths {
        for node in &path.nodes {
            *counts.entry(node.clone()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(task, count)| {
            let ratio = count as f64 / total as f64;
            TaskCriticality {
                task,
                ratio,
                level: CriticalityLevel::from_ratio(ratio),
            }
        })
        .collect()
}
