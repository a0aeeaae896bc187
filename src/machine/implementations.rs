//! Named implementation tables.
//!
//! Guards, actions, actor logic and delays may be referenced by name in a
//! definition. Names are looked up here when they are used; a missing name
//! is an `UnresolvedReference` at that point. Tables are plain values merged
//! with [`Implementations::merge`], later entries winning per name.

use super::Machine;
use crate::core::{GuardArgs, GuardFn};
use crate::effects::{Action, ActionArgs};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Computes a named delay from `{context, event, params}`.
pub type DelayFn = Arc<dyn Fn(&ActionArgs<'_>) -> Duration + Send + Sync>;

/// Implementation tables supplied at machine-build time.
///
/// # Example
///
/// ```rust
/// use statechart::machine::Implementations;
/// use std::time::Duration;
///
/// let base = Implementations::new()
///     .guard("isReady", |_| false)
///     .delay("timeout", Duration::from_secs(5));
/// let overrides = Implementations::new().guard("isReady", |_| true);
///
/// let merged = base.merge(overrides);
/// assert!(merged.has_guard("isReady"));
/// assert!(merged.has_delay("timeout"));
/// ```
#[derive(Clone, Default)]
pub struct Implementations {
    pub(crate) guards: HashMap<String, GuardFn>,
    pub(crate) actions: HashMap<String, Action>,
    pub(crate) actors: HashMap<String, Machine>,
    pub(crate) delays: HashMap<String, DelayFn>,
}

impl Implementations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&GuardArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Register any action (built-in or custom) under a name.
    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    /// Register a custom callback under a name.
    pub fn callback<F>(self, name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) + Send + Sync + 'static,
    {
        self.action(name, Action::new(callback))
    }

    /// Register spawnable actor logic.
    pub fn actor(mut self, name: impl Into<String>, logic: Machine) -> Self {
        self.actors.insert(name.into(), logic);
        self
    }

    pub fn delay(mut self, name: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(name.into(), Arc::new(move |_| delay));
        self
    }

    pub fn delay_fn<F>(mut self, name: impl Into<String>, delay: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Duration + Send + Sync + 'static,
    {
        self.delays.insert(name.into(), Arc::new(delay));
        self
    }

    /// Merge `other` into `self`; `other` wins on name collisions.
    pub fn merge(mut self, other: Implementations) -> Self {
        self.guards.extend(other.guards);
        self.actions.extend(other.actions);
        self.actors.extend(other.actors);
        self.delays.extend(other.delays);
        self
    }

    pub fn has_guard(&self, name: &str) -> bool {
        self.guards.contains_key(name)
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn has_actor(&self, name: &str) -> bool {
        self.actors.contains_key(name)
    }

    pub fn has_delay(&self, name: &str) -> bool {
        self.delays.contains_key(name)
    }
}

impl fmt::Debug for Implementations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut guards: Vec<_> = self.guards.keys().collect();
        let mut actions: Vec<_> = self.actions.keys().collect();
        let mut actors: Vec<_> = self.actors.keys().collect();
        let mut delays: Vec<_> = self.delays.keys().collect();
        guards.sort();
        actions.sort();
        actors.sort();
        delays.sort();
        f.debug_struct("Implementations")
            .field("guards", &guards)
            .field("actions", &actions)
            .field("actors", &actors)
            .field("delays", &delays)
            .finish()
    }
}
