//! Resolution strategies
//!
//! A strategy is a capability value: a name, a `can_resolve` predicate,
//! and a `resolve` function producing a [`Resolution`]. Strategies are
//! pure with respect to the conflict and never touch the graph;
//! executing a recommendation is the orchestrator's responsibility.

use crate::domain::{Conflict, ImpactLevel, Resolution, ResolutionAction};
use crate::oracle::Priority;

/// Tunables passed to every `resolve` call
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Largest reschedule shift a strategy may recommend, in hours
    pub max_shift_hours: i64,

    /// Whether strategies may recommend breaking dependency edges
    pub allow_edge_breaking: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_shift_hours: 24,
            allow_edge_breaking: true,
        }
    }
}

type CanResolveFn = fn(&Conflict) -> bool;
type ResolveFn = fn(&Conflict, &ResolveOptions) -> Resolution;

/// A named, swappable resolution policy scoped to one conflict kind
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    name: &'static str,
    can_resolve: CanResolveFn,
    resolve: ResolveFn,
}

impl Strategy {
    /// Builds a strategy from its parts
    pub const fn new(name: &'static str, can_resolve: CanResolveFn, resolve: ResolveFn) -> Self {
        Self {
            name,
            can_resolve,
            resolve,
        }
    }

    /// The strategy's registry name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this strategy applies to the conflict
    pub fn can_resolve(&self, conflict: &Conflict) -> bool {
        (self.can_resolve)(conflict)
    }

    /// Produces a resolution recommendation; does not mutate anything
    pub fn resolve(&self, conflict: &Conflict, options: &ResolveOptions) -> Resolution {
        (self.resolve)(conflict, options)
    }
}

// --- scheduling ---

fn can_stagger(conflict: &Conflict) -> bool {
    conflict.tasks.len() == 2
}

fn stagger_windows(conflict: &Conflict, options: &ResolveOptions) -> Resolution {
    // The dependent (first involved task) moves later; the dependency
    // keeps its slot.
    let actions = vec![ResolutionAction::Reschedule {
        task: conflict.tasks[0].clone(),
        shift_hours: options.max_shift_hours,
    }];
    Resolution::new("stagger_windows", actions, ImpactLevel::Low)
}

fn escalate(conflict: &Conflict, _options: &ResolveOptions) -> Resolution {
    Resolution::new(
        "escalate",
        vec![ResolutionAction::Escalate {
            reason: conflict.detail.clone(),
        }],
        ImpactLevel::Low,
    )
}

// --- resource ---

fn can_reassign(conflict: &Conflict) -> bool {
    conflict.tasks.len() >= 2
}

fn reassign_resource(conflict: &Conflict, _options: &ResolveOptions) -> Resolution {
    // The first task keeps the resource; everyone else moves off it.
    let actions: Vec<ResolutionAction> = conflict
        .tasks
        .iter()
        .skip(1)
        .map(|task| ResolutionAction::ReassignResource {
            task: task.clone(),
            from_resource: None,
        })
        .collect();
    let impact = if actions.len() > 1 {
        ImpactLevel::Medium
    } else {
        ImpactLevel::Low
    };
    Resolution::new("reassign_resource", actions, impact)
}

// --- priority ---

fn can_align(conflict: &Conflict) -> bool {
    conflict.tasks.len() == 2
}

fn align_priority(conflict: &Conflict, _options: &ResolveOptions) -> Resolution {
    // Raise the dependency (second task) to match its dependent.
    let actions = vec![ResolutionAction::Reprioritize {
        task: conflict.tasks[1].clone(),
        raise_to: Priority::High,
    }];
    Resolution::new("align_priority", actions, ImpactLevel::Low)
}

// --- dependency ---

fn can_remove_self_loop(conflict: &Conflict) -> bool {
    conflict.tasks.len() == 1
}

fn remove_self_dependency(conflict: &Conflict, _options: &ResolveOptions) -> Resolution {
    let task = conflict.tasks[0].clone();
    Resolution::new(
        "remove_self_dependency",
        vec![ResolutionAction::BreakEdge {
            from: task.clone(),
            to: task,
        }],
        ImpactLevel::Low,
    )
}

fn can_break_cycle(conflict: &Conflict) -> bool {
    conflict.tasks.len() >= 2
}

fn break_cycle_edge(conflict: &Conflict, options: &ResolveOptions) -> Resolution {
    if !options.allow_edge_breaking {
        return escalate(conflict, options);
    }
    // Break the closing edge: last node in cycle order back to the first.
    let from = conflict.tasks[conflict.tasks.len() - 1].clone();
    let to = conflict.tasks[0].clone();
    Resolution::new(
        "break_cycle_edge",
        vec![ResolutionAction::BreakEdge { from, to }],
        ImpactLevel::Medium,
    )
}

fn always(_conflict: &Conflict) -> bool {
    true
}

/// The built-in strategies for scheduling conflicts, in preference order
pub fn scheduling_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("stagger_windows", can_stagger, stagger_windows),
        Strategy::new("escalate", always, escalate),
    ]
}

/// The built-in strategies for resource conflicts
pub fn resource_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new("reassign_resource", can_reassign, reassign_resource),
        Strategy::new("escalate", always, escalate),
    ]
}

/// The built-in strategies for priority conflicts
pub fn priority_strategies() -> Vec<Strategy> {
    vec![Strategy::new("align_priority", can_align, align_priority)]
}

/// The built-in strategies for dependency conflicts
pub fn dependency_strategies() -> Vec<Strategy> {
    vec![
        Strategy::new(
            "remove_self_dependency",
            can_remove_self_loop,
            remove_self_dependency,
        ),
        Strategy::new("break_cycle_edge", can_break_cycle, break_cycle_edge),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConflictKind, Severity, TaskId};

    fn tid(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn cycle_conflict(tasks: &[&str]) -> Conflict {
        Conflict::new(
            ConflictKind::Dependency,
            Severity::High,
            tasks.iter().map(|t| tid(t)).collect(),
            "cycle".into(),
        )
    }

    #[test]
    fn break_cycle_targets_closing_edge() {
        let conflict = cycle_conflict(&["a", "b", "c"]);
        let strategy = dependency_strategies()
            .into_iter()
            .find(|s| s.name() == "break_cycle_edge")
            .unwrap();

        assert!(strategy.can_resolve(&conflict));
        let resolution = strategy.resolve(&conflict, &ResolveOptions::default());
        assert_eq!(
            resolution.actions,
            vec![ResolutionAction::BreakEdge {
                from: tid("c"),
                to: tid("a"),
            }]
        );
    }

    #[test]
    fn self_loop_picks_dedicated_strategy() {
        let conflict = cycle_conflict(&["a"]);
        let strategies = dependency_strategies();

        assert!(strategies[0].can_resolve(&conflict));
        assert!(!strategies[1].can_resolve(&conflict));

        let resolution = strategies[0].resolve(&conflict, &ResolveOptions::default());
        assert_eq!(resolution.strategy, "remove_self_dependency");
    }

    #[test]
    fn edge_breaking_can_be_disabled() {
        let conflict = cycle_conflict(&["a", "b"]);
        let strategy = dependency_strategies()[1];
        let options = ResolveOptions {
            allow_edge_breaking: false,
            ..Default::default()
        };

        let resolution = strategy.resolve(&conflict, &options);
        assert!(matches!(
            resolution.actions[0],
            ResolutionAction::Escalate { .. }
        ));
    }

    #[test]
    fn stagger_respects_shift_limit() {
        let conflict = Conflict::new(
            ConflictKind::Scheduling,
            Severity::Medium,
            vec![tid("a"), tid("b")],
            "overlap".into(),
        );
        let options = ResolveOptions {
            max_shift_hours: 8,
            ..Default::default()
        };

        let resolution = scheduling_strategies()[0].resolve(&conflict, &options);
        assert_eq!(
            resolution.actions,
            vec![ResolutionAction::Reschedule {
                task: tid("a"),
                shift_hours: 8,
            }]
        );
    }

    #[test]
    fn reassign_keeps_first_task_in_place() {
        let conflict = Conflict::new(
            ConflictKind::Resource,
            Severity::High,
            vec![tid("a"), tid("b"), tid("c")],
            "contention".into(),
        );

        let resolution = resource_strategies()[0].resolve(&conflict, &ResolveOptions::default());
        assert_eq!(resolution.actions.len(), 2);
        assert!(resolution
            .actions
            .iter()
            .all(|a| !matches!(a, ResolutionAction::ReassignResource { task, .. } if *task == tid("a"))));
        assert_eq!(resolution.estimated_impact, ImpactLevel::Medium);
    }

    #[test]
    fn strategies_do_not_mutate_the_conflict() {
        let conflict = cycle_conflict(&["a", "b"]);
        let before = conflict.clone();

        for strategy in dependency_strategies() {
            if strategy.can_resolve(&conflict) {
                let _ = strategy.resolve(&conflict, &ResolveOptions::default());
            }
        }
        assert_eq!(conflict, before);
    }
}
