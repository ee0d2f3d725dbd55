//! Change-impact analysis
//!
//! Simulates the downstream effect of a single task change. Update and
//! removal changes walk the supplied edge diff; completion, delay, and
//! cancellation changes walk the store's reverse adjacency. The
//! composite score is three independently-capped sub-scores — delay
//! magnitude, breadth of affected tasks, and elevated risk count — with
//! fixed reference constants; these are stated design choices and
//! behavior compatibility depends on them.

use chrono::Utc;
use indexmap::IndexSet;
use tracing::debug;

use crate::domain::{
    ChangeType, DependencyEdge, EdgeDiff, ImpactLevel, ImpactReport, RiskFactor, Severity, TaskId,
};
use crate::graph::DependencyStore;
use crate::oracle::TaskLookup;

/// Delay sub-score: capped at 0.4, linear up to a 40-hour reference
const DELAY_WEIGHT: f64 = 0.4;
const DELAY_REFERENCE_HOURS: f64 = 40.0;

/// Breadth sub-score: capped at 0.3, linear up to 10 affected tasks
const BREADTH_WEIGHT: f64 = 0.3;
const BREADTH_REFERENCE_TASKS: f64 = 10.0;

/// Risk sub-score: capped at 0.3, linear up to 5 elevated risk factors
const RISK_WEIGHT: f64 = 0.3;
const RISK_REFERENCE_COUNT: f64 = 5.0;

/// Nominal hours of schedule coupling carried by a full-strength edge
const BASE_EDGE_HOURS: f64 = 8.0;

/// Caller-supplied context for one analysis
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpactContext<'a> {
    /// Edge diff for dependency_update / dependency_removal changes
    pub diff: Option<&'a EdgeDiff>,

    /// Known slip in hours for task_delay changes
    pub delay_hours: Option<f64>,
}

impl<'a> ImpactContext<'a> {
    /// Context carrying an edge diff
    pub fn with_diff(diff: &'a EdgeDiff) -> Self {
        Self {
            diff: Some(diff),
            delay_hours: None,
        }
    }

    /// Context carrying a known slip
    pub fn with_delay(hours: f64) -> Self {
        Self {
            diff: None,
            delay_hours: Some(hours),
        }
    }
}

struct Accumulator {
    affected: IndexSet<TaskId>,
    delay_hours: f64,
    risks: Vec<RiskFactor>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            affected: IndexSet::new(),
            delay_hours: 0.0,
            risks: Vec::new(),
        }
    }

    fn touch(&mut self, task: &TaskId, delay: f64, risk: Option<RiskFactor>) {
        self.affected.insert(task.clone());
        self.delay_hours += delay;
        if let Some(risk) = risk {
            self.risks.push(risk);
        }
    }
}

/// Analyzes the downstream impact of one change to one task
pub fn analyze_impact<L: TaskLookup>(
    store: &DependencyStore,
    lookup: &L,
    task: &TaskId,
    change: ChangeType,
    context: ImpactContext<'_>,
) -> ImpactReport {
    let mut acc = Accumulator::new();

    match change {
        ChangeType::DependencyUpdate | ChangeType::DependencyRemoval => {
            if let Some(diff) = context.diff {
                walk_diff(diff, &mut acc);
            }
        }
        ChangeType::TaskCompletion => {
            for dependent in store.dependents(task) {
                let strength = edge_strength(store, dependent, task);
                acc.touch(
                    dependent,
                    -BASE_EDGE_HOURS * strength,
                    Some(RiskFactor::for_task(
                        dependent.clone(),
                        Severity::Low,
                        format!("{} is unblocked by the completion", dependent),
                    )),
                );
            }
        }
        ChangeType::TaskDelay => {
            let slip = context.delay_hours.unwrap_or(BASE_EDGE_HOURS);
            let severity = if slip >= 24.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            for dependent in store.dependents(task) {
                let strength = edge_strength(store, dependent, task);
                acc.touch(
                    dependent,
                    slip * strength,
                    Some(RiskFactor::for_task(
                        dependent.clone(),
                        severity,
                        format!("{} inherits a {:.1}h slip", dependent, slip),
                    )),
                );
            }
        }
        ChangeType::TaskCancellation => {
            // Weighted double: downstream work already scheduled against
            // the task is unrecoverable.
            for dependent in store.dependents(task) {
                let strength = edge_strength(store, dependent, task);
                acc.touch(
                    dependent,
                    2.0 * BASE_EDGE_HOURS * strength,
                    Some(RiskFactor::for_task(
                        dependent.clone(),
                        Severity::High,
                        format!("{} was scheduled against the cancelled task", dependent),
                    )),
                );
            }
        }
        ChangeType::Generic => {
            for dependent in store.dependents(task) {
                acc.touch(
                    dependent,
                    0.0,
                    Some(RiskFactor::for_task(
                        dependent.clone(),
                        Severity::Low,
                        format!("{} may be affected by the change", dependent),
                    )),
                );
            }
        }
    }

    // The changed task itself is not part of its own blast radius.
    acc.affected.shift_remove(task);

    let breadth = acc.affected.len();
    let elevated = acc.risks.iter().filter(|r| r.severity.is_elevated()).count();
    let score = composite_score(acc.delay_hours.abs(), breadth, elevated);
    let level = ImpactLevel::from_score(score);

    // Tasks the oracle does not know about still count toward breadth,
    // but flag them so the caller can clean up.
    for affected in &acc.affected {
        if !lookup.exists(affected) {
            acc.risks.push(RiskFactor::for_task(
                affected.clone(),
                Severity::Medium,
                format!("{} is referenced by the graph but unknown to the task store", affected),
            ));
        }
    }

    debug!(task = %task, change = %change, breadth, score, "impact analyzed");

    ImpactReport {
        task: task.clone(),
        change,
        affected_tasks: acc.affected.into_iter().collect(),
        level,
        estimated_delay_hours: acc.delay_hours,
        recommendations: recommendations(level, acc.delay_hours, breadth),
        mitigations: mitigations(change, level, &acc.risks, acc.delay_hours),
        risk_factors: acc.risks,
        analyzed_at: Utc::now(),
    }
}

fn edge_strength(store: &DependencyStore, from: &TaskId, to: &TaskId) -> f64 {
    store.edge(from, to).map_or(1.0, |e| e.strength)
}

fn walk_diff(diff: &EdgeDiff, acc: &mut Accumulator) {
    for edge in &diff.added {
        acc.touch(
            &edge.to,
            BASE_EDGE_HOURS * edge.strength,
            Some(risk_for_edge(edge, "gains a new dependent")),
        );
    }
    for edge in &diff.removed {
        acc.touch(
            &edge.to,
            -BASE_EDGE_HOURS * edge.strength,
            Some(RiskFactor::for_task(
                edge.to.clone(),
                Severity::Low,
                format!("{} loses a dependent; verify nothing still relies on the ordering", edge.to),
            )),
        );
    }
    for edge in &diff.modified {
        acc.touch(
            &edge.to,
            0.5 * BASE_EDGE_HOURS * edge.strength,
            Some(risk_for_edge(edge, "has a dependency with changed metadata")),
        );
    }
}

fn risk_for_edge(edge: &DependencyEdge, what: &str) -> RiskFactor {
    let severity = if edge.strength >= 0.8 {
        Severity::High
    } else if edge.strength >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    };
    RiskFactor::for_task(edge.to.clone(), severity, format!("{} {}", edge.to, what))
}

/// delay + breadth + risk, each capped, summing to at most 1.0
fn composite_score(delay_hours: f64, breadth: usize, elevated_risks: usize) -> f64 {
    let delay = (delay_hours / DELAY_REFERENCE_HOURS * DELAY_WEIGHT).min(DELAY_WEIGHT);
    let breadth = (breadth as f64 / BREADTH_REFERENCE_TASKS * BREADTH_WEIGHT).min(BREADTH_WEIGHT);
    let risk = (elevated_risks as f64 / RISK_REFERENCE_COUNT * RISK_WEIGHT).min(RISK_WEIGHT);
    delay + breadth + risk
}

fn recommendations(level: ImpactLevel, delay_hours: f64, breadth: usize) -> Vec<String> {
    let mut out = vec![match level {
        ImpactLevel::Critical => {
            "Halt dependent work and replan the affected chain before applying this change".to_string()
        }
        ImpactLevel::High => {
            "Review the affected tasks with their owners before applying this change".to_string()
        }
        ImpactLevel::Medium => "Apply the change and notify owners of affected tasks".to_string(),
        ImpactLevel::Low => "Safe to apply; no coordination required".to_string(),
    }];

    if delay_hours.abs() >= DELAY_REFERENCE_HOURS {
        out.push("Expected slip exceeds one work week; rebaseline the schedule".to_string());
    }
    if breadth as f64 >= BREADTH_REFERENCE_TASKS {
        out.push("Ten or more tasks are affected; stage the rollout".to_string());
    }
    out
}

fn mitigations(
    change: ChangeType,
    level: ImpactLevel,
    risks: &[RiskFactor],
    delay_hours: f64,
) -> Vec<String> {
    let mut out = Vec::new();

    if risks.iter().any(|r| r.severity.is_elevated()) {
        out.push("Add schedule buffer to the high-risk dependents".to_string());
    }
    if change == ChangeType::TaskCancellation && !risks.is_empty() {
        out.push(
            "Reassign deliverables of the cancelled task before removing its edges".to_string(),
        );
    }
    if delay_hours > 0.0 {
        out.push("Fast-track the longest dependent chain to absorb the delay".to_string());
    }
    if level >= ImpactLevel::High {
        out.push("Escalate to the project owner".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyKind, EdgeSpec};
    use crate::oracle::TaskAttributes;
    use std::collections::HashMap;

    fn tid(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn known(tasks: &[&str]) -> HashMap<TaskId, TaskAttributes> {
        tasks
            .iter()
            .map(|t| (tid(t), TaskAttributes::default()))
            .collect()
    }

    /// N tasks all depending on "hub"
    fn fan_in(n: usize) -> (DependencyStore, TaskId, Vec<String>) {
        let mut store = DependencyStore::new();
        let hub = tid("hub");
        let mut names = vec!["hub".to_string()];
        for i in 0..n {
            let name = format!("dep-{}", i);
            store
                .add_edges(&tid(&name), &[EdgeSpec::to(hub.clone())])
                .unwrap();
            names.push(name);
        }
        (store, hub, names)
    }

    #[test]
    fn cancellation_affects_each_dependent_once() {
        let (store, hub, names) = fan_in(4);
        let lookup = known(&names.iter().map(String::as_str).collect::<Vec<_>>());

        let report = analyze_impact(
            &store,
            &lookup,
            &hub,
            ChangeType::TaskCancellation,
            ImpactContext::default(),
        );

        assert_eq!(report.affected_tasks.len(), 4);
        // Double-weighted: 4 dependents x 2 x 8h.
        assert_eq!(report.estimated_delay_hours, 64.0);
        assert!(report.risk_factors.iter().all(|r| r.severity == Severity::High));
    }

    #[test]
    fn impact_level_monotone_in_dependent_count() {
        let mut last = ImpactLevel::Low;
        for n in [1, 3, 6, 12] {
            let (store, hub, names) = fan_in(n);
            let lookup = known(&names.iter().map(String::as_str).collect::<Vec<_>>());
            let report = analyze_impact(
                &store,
                &lookup,
                &hub,
                ChangeType::TaskCancellation,
                ImpactContext::default(),
            );
            assert!(report.level >= last, "level regressed at n={}", n);
            last = report.level;
        }
        assert_eq!(last, ImpactLevel::Critical);
    }

    #[test]
    fn completion_subtracts_delay() {
        let (store, hub, names) = fan_in(2);
        let lookup = known(&names.iter().map(String::as_str).collect::<Vec<_>>());

        let report = analyze_impact(
            &store,
            &lookup,
            &hub,
            ChangeType::TaskCompletion,
            ImpactContext::default(),
        );

        // 2 dependents x 8h of relief.
        assert_eq!(report.estimated_delay_hours, -16.0);
        assert_eq!(report.level, ImpactLevel::Low);
    }

    #[test]
    fn delay_propagates_scaled_by_strength() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("x")).strength(0.5)])
            .unwrap();
        let lookup = known(&["a", "x"]);

        let report = analyze_impact(
            &store,
            &lookup,
            &tid("x"),
            ChangeType::TaskDelay,
            ImpactContext::with_delay(16.0),
        );

        assert_eq!(report.affected_tasks, vec![tid("a")]);
        assert_eq!(report.estimated_delay_hours, 8.0);
    }

    #[test]
    fn update_walks_the_diff_not_the_store() {
        let store = DependencyStore::new();
        let lookup = known(&["a", "b", "c"]);

        let diff = EdgeDiff {
            added: vec![DependencyEdge::new(
                tid("a"),
                tid("b"),
                DependencyKind::DependsOn,
                1.0,
            )],
            removed: vec![DependencyEdge::new(
                tid("a"),
                tid("c"),
                DependencyKind::DependsOn,
                1.0,
            )],
            modified: vec![],
        };

        let report = analyze_impact(
            &store,
            &lookup,
            &tid("a"),
            ChangeType::DependencyUpdate,
            ImpactContext::with_diff(&diff),
        );

        assert_eq!(report.affected_tasks, vec![tid("b"), tid("c")]);
        // +8h for the added edge, -8h for the removed one.
        assert_eq!(report.estimated_delay_hours, 0.0);
    }

    #[test]
    fn generic_change_flags_dependents_without_delay() {
        let (store, hub, names) = fan_in(3);
        let lookup = known(&names.iter().map(String::as_str).collect::<Vec<_>>());

        let report = analyze_impact(
            &store,
            &lookup,
            &hub,
            ChangeType::Generic,
            ImpactContext::default(),
        );

        assert_eq!(report.affected_tasks.len(), 3);
        assert_eq!(report.estimated_delay_hours, 0.0);
        assert_eq!(report.level, ImpactLevel::Low);
    }

    #[test]
    fn no_dependents_is_a_quiet_report() {
        let store = DependencyStore::new();
        let lookup = known(&["a"]);

        let report = analyze_impact(
            &store,
            &lookup,
            &tid("a"),
            ChangeType::TaskCancellation,
            ImpactContext::default(),
        );

        assert!(report.affected_tasks.is_empty());
        assert_eq!(report.level, ImpactLevel::Low);
        assert_eq!(report.estimated_delay_hours, 0.0);
    }

    #[test]
    fn unknown_affected_tasks_get_flagged() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("ghost"), &[EdgeSpec::to(tid("x"))])
            .unwrap();
        let lookup = known(&["x"]);

        let report = analyze_impact(
            &store,
            &lookup,
            &tid("x"),
            ChangeType::TaskDelay,
            ImpactContext::with_delay(4.0),
        );

        assert!(report
            .risk_factors
            .iter()
            .any(|r| r.description.contains("unknown to the task store")));
    }

    #[test]
    fn recommendations_scale_with_level() {
        let (store, hub, names) = fan_in(12);
        let lookup = known(&names.iter().map(String::as_str).collect::<Vec<_>>());

        let report = analyze_impact(
            &store,
            &lookup,
            &hub,
            ChangeType::TaskCancellation,
            ImpactContext::default(),
        );

        assert_eq!(report.level, ImpactLevel::Critical);
        assert!(report.recommendations.iter().any(|r| r.contains("Halt")));
        assert!(report.recommendations.iter().any(|r| r.contains("rebaseline")));
        assert!(report.mitigations.iter().any(|m| m.contains("Reassign")));
    }
}
