//! Graph ownership and traversal
//!
//! The [`DependencyStore`] exclusively owns the forward and reverse
//! adjacency; cycle detection and critical-path analysis query it
//! read-only.

mod critical_path;
mod cycle;
mod store;

pub use critical_path::{
    AnalysisLimits, CriticalPathAnalyzer, CriticalityLevel, PathAnalysis, PathRecord,
    TaskCriticality, DEFAULT_MAX_DEPTH,
};
pub use cycle::{detect_cycles, has_cycle_through, Cycle};
pub use store::{DependencyStore, EdgeRemoval, EdgeUpsert, StoreError};
