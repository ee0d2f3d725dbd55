//! Strategy registry
//!
//! Maps each conflict kind to an ordered list of strategies. Auto
//! resolution applies the first strategy whose predicate holds; named
//! resolution looks a strategy up explicitly and fails with a typed
//! NotFound error when the name is unknown for that conflict's kind.

use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use super::strategy::{
    dependency_strategies, priority_strategies, resource_strategies, scheduling_strategies,
    ResolveOptions, Strategy,
};
use crate::domain::{Conflict, ConflictId, ConflictKind, Resolution};

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("Conflict not found: {0}")]
    ConflictNotFound(ConflictId),

    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),
}

/// Ordered strategies per conflict kind
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ConflictKind, Vec<Strategy>>,
}

impl StrategyRegistry {
    /// Creates an empty registry; auto resolution will find nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry loaded with the built-in strategies
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for strategy in scheduling_strategies() {
            registry.register(ConflictKind::Scheduling, strategy);
        }
        for strategy in resource_strategies() {
            registry.register(ConflictKind::Resource, strategy);
        }
        for strategy in priority_strategies() {
            registry.register(ConflictKind::Priority, strategy);
        }
        for strategy in dependency_strategies() {
            registry.register(ConflictKind::Dependency, strategy);
        }
        registry
    }

    /// Appends a strategy to the end of a kind's preference order
    pub fn register(&mut self, kind: ConflictKind, strategy: Strategy) {
        self.strategies.entry(kind).or_default().push(strategy);
    }

    /// The strategies registered for a kind, in preference order
    pub fn strategies_for(&self, kind: ConflictKind) -> &[Strategy] {
        self.strategies.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Applies the first strategy whose predicate accepts the conflict
    ///
    /// Returns `None` when no registered strategy matches — an explicit
    /// "no resolution available" result, not an error.
    pub fn auto_resolve(&self, conflict: &Conflict, options: &ResolveOptions) -> Option<Resolution> {
        let strategy = self
            .strategies_for(conflict.kind)
            .iter()
            .find(|s| s.can_resolve(conflict))?;
        debug!(conflict = %conflict.id, strategy = strategy.name(), "auto-resolving");
        Some(strategy.resolve(conflict, options))
    }

    /// Applies a named strategy explicitly
    ///
    /// Explicit selection overrides the strategy's own predicate; the
    /// only failure is an unknown name for this conflict's kind.
    pub fn resolve_with(
        &self,
        conflict: &Conflict,
        strategy_name: &str,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        let strategy = self
            .strategies_for(conflict.kind)
            .iter()
            .find(|s| s.name() == strategy_name)
            .ok_or_else(|| ResolveError::StrategyNotFound(strategy_name.to_string()))?;
        Ok(strategy.resolve(conflict, options))
    }
}
