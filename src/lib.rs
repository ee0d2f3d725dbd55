//! Taskweave - an in-memory task dependency graph engine
//!
//! Taskweave stores directed dependency relations between tasks, detects
//! cycles, computes critical (longest) paths, detects and proposes
//! resolutions for scheduling/resource/priority/dependency conflicts,
//! and simulates the downstream effect of a single change.
//!
//! The engine is a single-process, in-memory component: callers inject a
//! [`TaskLookup`](oracle::TaskLookup) for task attributes and drive
//! everything through [`GraphEngine`](engine::GraphEngine).

pub mod domain;
pub mod engine;
pub mod graph;
pub mod impact;
pub mod oracle;
pub mod resolve;

pub use domain::{
    ChangeType, Conflict, ConflictId, ConflictKind, DependencyEdge, DependencyKind, EdgeDiff,
    EdgeSpec, ImpactLevel, ImpactReport, Resolution, Severity, TaskId,
};
pub use engine::{AnalysisReport, EngineError, GraphEngine};
pub use graph::{AnalysisLimits, Cycle, DependencyStore, PathRecord};
pub use oracle::{Priority, ScheduleWindow, TaskAttributes, TaskLookup};
