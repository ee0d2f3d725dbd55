//! Engine orchestrator
//!
//! [`GraphEngine`] composes the store, the detectors, and the analyzers
//! behind a small synchronous API; it is the only component external
//! callers invoke directly. Mutations take `&mut self` and analyses take
//! `&self`, so the borrow checker enforces the single-writer discipline:
//! readers may run concurrently with each other (behind an external
//! `RwLock` if shared), never with a writer.
//!
//! A detected cycle is a warning, not an error: cycles are an expected
//! transient state that the conflict and impact layers reason about, so
//! mutations report them and continue.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{
    ChangeType, Conflict, ConflictId, EdgeDiff, EdgeSpec, ImpactReport, Resolution,
    ResolutionAction, TaskId,
};
use crate::graph::{
    detect_cycles, AnalysisLimits, CriticalPathAnalyzer, Cycle, DependencyStore, EdgeRemoval,
    EdgeUpsert, PathAnalysis, PathRecord, StoreError,
};
use crate::impact::{analyze_impact, ImpactContext};
use crate::oracle::TaskLookup;
use crate::resolve::{detect_conflicts, ResolveError, ResolveOptions, StrategyRegistry};

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// The task id is unknown to the attribute store; mutations against
    /// it are rejected synchronously
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Outcome of an add-dependencies call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyChange {
    pub upsert: EdgeUpsert,

    /// Cycles the mutation introduced or touched; reported, never fatal
    pub cycles: Vec<Cycle>,

    /// Conflicts detected over the involved tasks
    pub conflicts: Vec<Conflict>,
}

/// Outcome of an update-dependencies call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyUpdateOutcome {
    pub diff: EdgeDiff,
    pub impact: ImpactReport,
}

/// Outcome of a remove-dependencies call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRemovalOutcome {
    pub removal: EdgeRemoval,
    pub impact: ImpactReport,
}

/// Bundled result of a full analysis pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub cycles: Vec<Cycle>,
    pub conflicts: Vec<Conflict>,
    pub paths: PathAnalysis,
    pub impacts: Vec<ImpactReport>,
}

/// What happened when a resolution was applied
///
/// Only graph-owned actions (edge breaking) are executed here; schedule
/// and resource actions belong to the task-attribute store and come back
/// deferred for the caller to act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedResolution {
    pub broken_edges: Vec<(TaskId, TaskId)>,
    pub deferred: Vec<ResolutionAction>,
}

/// The engine: one dependency graph per instance, composed analyzers,
/// and a retained conflict ledger
#[derive(Debug)]
pub struct GraphEngine<L: TaskLookup> {
    lookup: L,
    store: DependencyStore,
    paths: CriticalPathAnalyzer,
    registry: StrategyRegistry,
    options: ResolveOptions,
    limits: AnalysisLimits,
    conflicts: IndexMap<ConflictId, Conflict>,
}

impl<L: TaskLookup> GraphEngine<L> {
    /// Creates an engine with built-in strategies and default limits
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            store: DependencyStore::new(),
            paths: CriticalPathAnalyzer::new(),
            registry: StrategyRegistry::with_builtins(),
            options: ResolveOptions::default(),
            limits: AnalysisLimits::default(),
            conflicts: IndexMap::new(),
        }
    }

    /// Overrides the analysis limits (depth cap, deadline)
    pub fn with_limits(mut self, limits: AnalysisLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Overrides the resolution options
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Swaps in a custom strategy registry
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Read-only view of the graph
    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    fn require_known(&self, task: &TaskId) -> Result<(), EngineError> {
        if self.lookup.exists(task) {
            Ok(())
        } else {
            Err(EngineError::UnknownTask(task.clone()))
        }
    }

    fn record_conflicts(&mut self, conflicts: &[Conflict]) {
        for conflict in conflicts {
            self.conflicts
                .insert(conflict.id.clone(), conflict.clone());
        }
    }

    fn report_cycles(cycles: &[Cycle]) {
        for cycle in cycles {
            warn!(%cycle, "dependency cycle present; continuing");
        }
    }

    /// Upserts edges from a task, then runs cycle and conflict checks
    /// over the involved tasks
    pub fn add_dependencies(
        &mut self,
        task: &TaskId,
        specs: &[EdgeSpec],
    ) -> Result<DependencyChange, EngineError> {
        self.require_known(task)?;
        for spec in specs {
            self.require_known(&spec.to)?;
        }

        let upsert = self.store.add_edges(task, specs)?;

        let mut involved = vec![task.clone()];
        involved.extend(specs.iter().map(|s| s.to.clone()));

        let cycles = detect_cycles(&self.store, &involved);
        Self::report_cycles(&cycles);

        let conflicts = detect_conflicts(&self.store, &self.lookup, &involved);
        self.record_conflicts(&conflicts);

        info!(task = %task, edges = upsert.len(), cycles = cycles.len(), "dependencies added");
        Ok(DependencyChange {
            upsert,
            cycles,
            conflicts,
        })
    }

    /// Rewrites a task's outgoing edges to exactly the given specs,
    /// returning the diff and its impact
    pub fn update_dependencies(
        &mut self,
        task: &TaskId,
        specs: &[EdgeSpec],
    ) -> Result<DependencyUpdateOutcome, EngineError> {
        self.require_known(task)?;
        for spec in specs {
            self.require_known(&spec.to)?;
        }

        let before: Vec<_> = self.store.edges(task).cloned().collect();

        // Upsert first: add_edges validates every spec before touching
        // either map, so a failed update leaves the previous edge set
        // intact. Stale edges come out only after the upsert succeeds.
        self.store.add_edges(task, specs)?;

        let stale: Vec<TaskId> = before
            .iter()
            .filter(|e| !specs.iter().any(|s| s.to == e.to))
            .map(|e| e.to.clone())
            .collect();
        self.store.remove_edges(task, &stale);

        let mut diff = EdgeDiff::default();
        for edge in &before {
            if stale.contains(&edge.to) {
                diff.removed.push(edge.clone());
            }
        }
        for spec in specs {
            let Some(edge) = self.store.edge(task, &spec.to).cloned() else {
                continue;
            };
            match before.iter().find(|e| e.to == spec.to) {
                None => diff.added.push(edge),
                Some(old) if old.kind != edge.kind || old.strength != edge.strength => {
                    diff.modified.push(edge)
                }
                Some(_) => {}
            }
        }

        let impact = analyze_impact(
            &self.store,
            &self.lookup,
            task,
            ChangeType::DependencyUpdate,
            ImpactContext::with_diff(&diff),
        );

        Ok(DependencyUpdateOutcome { diff, impact })
    }

    /// Removes the given edges and reports the impact of losing them
    pub fn remove_dependencies(
        &mut self,
        task: &TaskId,
        targets: &[TaskId],
    ) -> Result<DependencyRemovalOutcome, EngineError> {
        self.require_known(task)?;

        let removal = self.store.remove_edges(task, targets);
        let diff = EdgeDiff {
            removed: removal.removed.clone(),
            ..Default::default()
        };

        let impact = analyze_impact(
            &self.store,
            &self.lookup,
            task,
            ChangeType::DependencyRemoval,
            ImpactContext::with_diff(&diff),
        );

        Ok(DependencyRemovalOutcome { removal, impact })
    }

    /// Cancels a task: reports the impact on its dependents, then drops
    /// the task and every incident edge from the graph
    pub fn cancel_task(&mut self, task: &TaskId) -> Result<ImpactReport, EngineError> {
        self.require_known(task)?;

        // Impact first: once the edges are gone there is nothing to walk.
        let impact = analyze_impact(
            &self.store,
            &self.lookup,
            task,
            ChangeType::TaskCancellation,
            ImpactContext::default(),
        );
        let dropped = self.store.remove_task(task);
        info!(task = %task, edges = dropped.len(), "task cancelled");
        Ok(impact)
    }

    /// Runs the full bundle: cycles, conflicts, critical paths, and a
    /// generic impact pass per task
    ///
    /// An empty task set yields an empty report, not an error.
    pub fn analyze(&mut self, project: &str, tasks: &[TaskId]) -> AnalysisReport {
        let cycles = detect_cycles(&self.store, tasks);
        Self::report_cycles(&cycles);

        let conflicts = detect_conflicts(&self.store, &self.lookup, tasks);
        self.record_conflicts(&conflicts);

        let paths = self.paths.analyze(&self.store, project, tasks, &self.limits);

        let impacts = tasks
            .iter()
            .map(|task| {
                analyze_impact(
                    &self.store,
                    &self.lookup,
                    task,
                    ChangeType::Generic,
                    ImpactContext::default(),
                )
            })
            .collect();

        AnalysisReport {
            cycles,
            conflicts,
            paths,
            impacts,
        }
    }

    /// The single longest critical path stored for a project
    pub fn critical_path(&self, project: &str) -> Option<&PathRecord> {
        self.paths.critical_path(project)
    }

    /// Runs the conflict detectors and records results in the ledger
    pub fn detect_conflicts(&mut self, tasks: &[TaskId]) -> Vec<Conflict> {
        let conflicts = detect_conflicts(&self.store, &self.lookup, tasks);
        self.record_conflicts(&conflicts);
        conflicts
    }

    /// One-off impact analysis without mutating anything
    pub fn analyze_impact(
        &self,
        task: &TaskId,
        change: ChangeType,
        context: ImpactContext<'_>,
    ) -> ImpactReport {
        analyze_impact(&self.store, &self.lookup, task, change, context)
    }

    /// Applies the first matching strategy to a ledgered conflict
    ///
    /// `Ok(None)` means no registered strategy matched — a "no
    /// resolution available" result, distinct from the NotFound error
    /// for an unknown conflict id.
    pub fn auto_resolve(&mut self, id: &ConflictId) -> Result<Option<Resolution>, EngineError> {
        let conflict = self
            .conflicts
            .get(id)
            .ok_or_else(|| ResolveError::ConflictNotFound(id.clone()))?;

        let resolution = self.registry.auto_resolve(conflict, &self.options);
        if let (Some(resolution), Some(entry)) = (&resolution, self.conflicts.get_mut(id)) {
            // Retained, not deleted: the ledger is the audit trail.
            entry.resolution = Some(resolution.clone());
        }
        Ok(resolution)
    }

    /// Applies a named strategy to a ledgered conflict
    pub fn resolve_conflict(
        &mut self,
        id: &ConflictId,
        strategy_name: &str,
    ) -> Result<Resolution, EngineError> {
        let conflict = self
            .conflicts
            .get(id)
            .ok_or_else(|| ResolveError::ConflictNotFound(id.clone()))?;

        let resolution = self
            .registry
            .resolve_with(conflict, strategy_name, &self.options)?;
        if let Some(entry) = self.conflicts.get_mut(id) {
            entry.resolution = Some(resolution.clone());
        }
        Ok(resolution)
    }

    /// Executes the graph-owned actions of a resolution; everything the
    /// engine does not own comes back deferred
    pub fn apply_resolution(&mut self, resolution: &Resolution) -> AppliedResolution {
        let mut applied = AppliedResolution {
            broken_edges: Vec::new(),
            deferred: Vec::new(),
        };

        for action in &resolution.actions {
            match action {
                ResolutionAction::BreakEdge { from, to } => {
                    let removal = self.store.remove_edges(from, std::slice::from_ref(to));
                    if !removal.removed.is_empty() {
                        applied.broken_edges.push((from.clone(), to.clone()));
                    }
                }
                other => applied.deferred.push(other.clone()),
            }
        }

        applied
    }

    /// The conflict ledger, oldest first; resolved conflicts included
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    /// Looks up one ledgered conflict
    pub fn conflict(&self, id: &ConflictId) -> Option<&Conflict> {
        self.conflicts.get(id)
    }
}
