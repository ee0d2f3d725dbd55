//! Domain models for the dependency engine
//!
//! Pure data types with no graph logic or I/O concerns.

mod conflict;
mod edge;
mod id;
mod impact;

pub use conflict::{Conflict, ConflictKind, Resolution, ResolutionAction, Severity};
pub use edge::{DependencyEdge, DependencyKind, EdgeDiff, EdgeSpec};
pub use id::{ConflictId, IdError, TaskId};
pub use impact::{ChangeType, ImpactLevel, ImpactReport, RiskFactor};
