//! Conflict detection and resolution
//!
//! Detection and resolution are kept apart: detectors produce
//! [`Conflict`](crate::domain::Conflict) records, strategies propose
//! [`Resolution`](crate::domain::Resolution)s, and only the orchestrator
//! ever acts on a proposal.

mod detect;
mod registry;
mod strategy;

pub use detect::{
    detect_conflicts, detect_dependency, detect_priority, detect_resource, detect_scheduling,
};
pub use registry::{ResolveError, StrategyRegistry};
pub use strategy::{
    dependency_strategies, priority_strategies, resource_strategies, scheduling_strategies,
    ResolveOptions, Strategy,
};
