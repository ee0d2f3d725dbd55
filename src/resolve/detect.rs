//! Conflict detectors
//!
//! Four independent, composable detection passes. Each pass queries the
//! store and the attribute oracle read-only and produces conflicts with
//! stable generated ids; [`detect_conflicts`] concatenates them.

use tracing::debug;

use crate::domain::{Conflict, ConflictKind, Severity, TaskId};
use crate::graph::{detect_cycles, DependencyStore};
use crate::oracle::{Priority, TaskLookup};

/// Runs all four detectors over the task set and concatenates results
pub fn detect_conflicts<L: TaskLookup>(
    store: &DependencyStore,
    lookup: &L,
    tasks: &[TaskId],
) -> Vec<Conflict> {
    let mut conflicts = detect_scheduling(store, lookup, tasks);
    conflicts.extend(detect_resource(lookup, tasks));
    conflicts.extend(detect_priority(store, lookup, tasks));
    conflicts.extend(detect_dependency(store, tasks));

    debug!(tasks = tasks.len(), conflicts = conflicts.len(), "detection pass complete");
    conflicts
}

/// Scheduling overlap: a dependency-linked pair whose schedule windows
/// overlap
///
/// An edge from → to means `to` must finish before `from` starts, so any
/// window overlap between the two is a conflict. `related_to` edges are
/// informational and skipped.
pub fn detect_scheduling<L: TaskLookup>(
    store: &DependencyStore,
    lookup: &L,
    tasks: &[TaskId],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for task in tasks {
        let Some(from_window) = lookup.get(task).and_then(|a| a.window) else {
            continue;
        };

        for edge in store.edges(task) {
            if !edge.kind.affects_scheduling() || edge.to == *task {
                continue;
            }
            let Some(to_window) = lookup.get(&edge.to).and_then(|a| a.window) else {
                continue;
            };

            if from_window.overlaps(&to_window) {
                let overlap = from_window.overlap_hours(&to_window);
                let severity = if overlap >= 24.0 {
                    Severity::High
                } else {
                    Severity::Medium
                };
                conflicts.push(Conflict::new(
                    ConflictKind::Scheduling,
                    severity,
                    vec![task.clone(), edge.to.clone()],
                    format!(
                        "{} is scheduled to overlap its dependency {} by {:.1}h",
                        task, edge.to, overlap
                    ),
                ));
            }
        }
    }

    conflicts
}

/// Resource contention: tasks assigned the same resource with
/// overlapping windows
///
/// Emits one conflict per contended resource, involving every task that
/// overlaps at least one other on that resource.
pub fn detect_resource<L: TaskLookup>(lookup: &L, tasks: &[TaskId]) -> Vec<Conflict> {
    type Claim = (TaskId, crate::oracle::ScheduleWindow);
    let mut by_resource: Vec<(String, Vec<Claim>)> = Vec::new();

    for task in tasks {
        let Some(attrs) = lookup.get(task) else { continue };
        let (Some(resource), Some(window)) = (attrs.resource, attrs.window) else {
            continue;
        };
        match by_resource.iter_mut().find(|(r, _)| *r == resource) {
            Some((_, group)) => group.push((task.clone(), window)),
            None => by_resource.push((resource, vec![(task.clone(), window)])),
        }
    }

    let mut conflicts = Vec::new();
    for (resource, group) in by_resource {
        if group.len() < 2 {
            continue;
        }

        let mut contended: Vec<TaskId> = Vec::new();
        for (i, (a, wa)) in group.iter().enumerate() {
            for (b, wb) in group.iter().skip(i + 1) {
                if wa.overlaps(wb) {
                    if !contended.contains(a) {
                        contended.push(a.clone());
                    }
                    if !contended.contains(b) {
                        contended.push(b.clone());
                    }
                }
            }
        }

        if contended.len() >= 2 {
            let severity = if contended.len() > 2 {
                Severity::High
            } else {
                Severity::Medium
            };
            let detail = format!(
                "{} tasks contend for resource '{}' in overlapping windows",
                contended.len(),
                resource
            );
            conflicts.push(Conflict::new(
                ConflictKind::Resource,
                severity,
                contended,
                detail,
            ));
        }
    }

    conflicts
}

/// Priority inversion: a higher-priority task depending on a
/// lower-priority one
pub fn detect_priority<L: TaskLookup>(
    store: &DependencyStore,
    lookup: &L,
    tasks: &[TaskId],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for task in tasks {
        let Some(from_attrs) = lookup.get(task) else { continue };

        for edge in store.edges(task) {
            if !edge.kind.affects_scheduling() || edge.to == *task {
                continue;
            }
            let Some(to_attrs) = lookup.get(&edge.to) else { continue };

            if from_attrs.priority > to_attrs.priority {
                let severity = if from_attrs.priority == Priority::Critical {
                    Severity::High
                } else {
                    Severity::Medium
                };
                conflicts.push(Conflict::new(
                    ConflictKind::Priority,
                    severity,
                    vec![task.clone(), edge.to.clone()],
                    format!(
                        "{:?}-priority task {} depends on {:?}-priority task {}",
                        from_attrs.priority, task, to_attrs.priority, edge.to
                    ),
                ));
            }
        }
    }

    conflicts
}

/// Dependency conflicts: cycles found by the cycle detector, one
/// conflict per cycle, tasks in cycle order
pub fn detect_dependency(store: &DependencyStore, tasks: &[TaskId]) -> Vec<Conflict> {
    detect_cycles(store, tasks)
        .into_iter()
        .map(|cycle| {
            let detail = if cycle.is_self_loop() {
                format!("task {} depends on itself", cycle.nodes[0])
            } else {
                format!("dependency cycle: {}", cycle)
            };
            Conflict::new(ConflictKind::Dependency, Severity::High, cycle.nodes, detail)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyKind, EdgeSpec};
    use crate::oracle::{ScheduleWindow, TaskAttributes};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

    fn tid(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    fn window(start_h: u32, end_h: u32) -> ScheduleWindow {
        ScheduleWindow::new(
            Utc.with_ymd_and_hms(2025, 6, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 1, end_h, 0, 0).unwrap(),
        )
    }

    fn attrs(
        priority: Priority,
        window: Option<ScheduleWindow>,
        resource: Option<&str>,
    ) -> TaskAttributes {
        TaskAttributes {
            priority,
            window,
            resource: resource.map(String::from),
            deadline: None,
        }
    }

    #[test]
    fn scheduling_overlap_detected() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("b"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("a"), attrs(Priority::Medium, Some(window(9, 12)), None));
        table.insert(tid("b"), attrs(Priority::Medium, Some(window(10, 14)), None));

        let conflicts = detect_scheduling(&store, &table, &[tid("a"), tid("b")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Scheduling);
        assert_eq!(conflicts[0].severity, Severity::Medium);
        assert_eq!(conflicts[0].tasks, vec![tid("a"), tid("b")]);
    }

    #[test]
    fn disjoint_windows_are_fine() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("b"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("a"), attrs(Priority::Medium, Some(window(13, 15)), None));
        table.insert(tid("b"), attrs(Priority::Medium, Some(window(9, 12)), None));

        assert!(detect_scheduling(&store, &table, &[tid("a"), tid("b")]).is_empty());
    }

    #[test]
    fn related_to_edges_are_informational() {
        let mut store = DependencyStore::new();
        store
            .add_edges(
                &tid("a"),
                &[EdgeSpec::to(tid("b")).kind(DependencyKind::RelatedTo)],
            )
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("a"), attrs(Priority::Medium, Some(window(9, 12)), None));
        table.insert(tid("b"), attrs(Priority::Medium, Some(window(9, 12)), None));

        assert!(detect_scheduling(&store, &table, &[tid("a"), tid("b")]).is_empty());
    }

    #[test]
    fn resource_contention_groups_tasks() {
        let mut table = HashMap::new();
        table.insert(
            tid("a"),
            attrs(Priority::Medium, Some(window(9, 12)), Some("gpu-1")),
        );
        table.insert(
            tid("b"),
            attrs(Priority::Medium, Some(window(10, 13)), Some("gpu-1")),
        );
        table.insert(
            tid("c"),
            attrs(Priority::Medium, Some(window(11, 14)), Some("gpu-1")),
        );
        // Different resource, no conflict with the others.
        table.insert(
            tid("d"),
            attrs(Priority::Medium, Some(window(9, 12)), Some("gpu-2")),
        );

        let conflicts = detect_resource(&table, &[tid("a"), tid("b"), tid("c"), tid("d")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Resource);
        assert_eq!(conflicts[0].severity, Severity::High);
        assert_eq!(conflicts[0].tasks.len(), 3);
        assert!(!conflicts[0].involves(&tid("d")));
    }

    #[test]
    fn same_resource_disjoint_windows_ok() {
        let mut table = HashMap::new();
        table.insert(
            tid("a"),
            attrs(Priority::Medium, Some(window(9, 11)), Some("gpu-1")),
        );
        table.insert(
            tid("b"),
            attrs(Priority::Medium, Some(window(12, 14)), Some("gpu-1")),
        );

        assert!(detect_resource(&table, &[tid("a"), tid("b")]).is_empty());
    }

    #[test]
    fn priority_inversion_detected() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("urgent"), &[EdgeSpec::to(tid("someday"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("urgent"), attrs(Priority::Critical, None, None));
        table.insert(tid("someday"), attrs(Priority::Low, None, None));

        let conflicts = detect_priority(&store, &table, &[tid("urgent"), tid("someday")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Priority);
        assert_eq!(conflicts[0].severity, Severity::High);
    }

    #[test]
    fn equal_priorities_are_not_inverted() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("b"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("a"), attrs(Priority::Medium, None, None));
        table.insert(tid("b"), attrs(Priority::Medium, None, None));

        assert!(detect_priority(&store, &table, &[tid("a"), tid("b")]).is_empty());
    }

    #[test]
    fn cycle_becomes_dependency_conflict() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("b"))])
            .unwrap();
        store
            .add_edges(&tid("b"), &[EdgeSpec::to(tid("a"))])
            .unwrap();

        let conflicts = detect_dependency(&store, &[tid("a"), tid("b")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Dependency);
        assert_eq!(conflicts[0].tasks.len(), 2);
    }

    #[test]
    fn self_loop_has_distinct_detail() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("a"))])
            .unwrap();

        let conflicts = detect_dependency(&store, &[tid("a")]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].tasks, vec![tid("a")]);
        assert!(conflicts[0].detail.contains("itself"));
    }

    #[test]
    fn all_detectors_concatenate() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("b"))])
            .unwrap();
        store
            .add_edges(&tid("b"), &[EdgeSpec::to(tid("a"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(
            tid("a"),
            attrs(Priority::High, Some(window(9, 12)), Some("dev-1")),
        );
        table.insert(
            tid("b"),
            attrs(Priority::Low, Some(window(10, 13)), Some("dev-1")),
        );

        let conflicts = detect_conflicts(&store, &table, &[tid("a"), tid("b")]);
        let kinds: Vec<ConflictKind> = conflicts.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&ConflictKind::Scheduling));
        assert!(kinds.contains(&ConflictKind::Resource));
        assert!(kinds.contains(&ConflictKind::Priority));
        assert!(kinds.contains(&ConflictKind::Dependency));
    }

    #[test]
    fn empty_task_set_is_empty_result() {
        let store = DependencyStore::new();
        let table: HashMap<TaskId, TaskAttributes> = HashMap::new();
        assert!(detect_conflicts(&store, &table, &[]).is_empty());
    }

    #[test]
    fn unknown_tasks_are_skipped_not_errors() {
        let mut store = DependencyStore::new();
        store
            .add_edges(&tid("a"), &[EdgeSpec::to(tid("ghost"))])
            .unwrap();

        let mut table = HashMap::new();
        table.insert(tid("a"), attrs(Priority::High, Some(window(9, 12)), None));
        // "ghost" has no attributes; detectors skip it quietly.

        let conflicts = detect_conflicts(&store, &table, &[tid("a"), tid("ghost")]);
        assert!(conflicts
            .iter()
            .all(|c| c.kind == ConflictKind::Dependency || !c.involves(&tid("ghost"))));
    }
}
