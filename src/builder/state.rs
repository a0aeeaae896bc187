//! Declarative state node configuration.

use super::transition::TransitionConfig;
use crate::core::{HistoryKind, StateKind};
use crate::effects::{Action, Delay};
use serde_json::Value;

/// An actor invoked while its state is active.
#[derive(Clone, Debug)]
pub struct InvokeConfig {
    pub(crate) id: String,
    pub(crate) src: String,
    pub(crate) input: Option<Value>,
    pub(crate) on_done: Vec<TransitionConfig>,
}

impl InvokeConfig {
    /// Invoke the `src` entry of the `actors` table under `id`.
    pub fn new(id: impl Into<String>, src: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            input: None,
            on_done: Vec::new(),
        }
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    /// Transition taken when the invoked actor reaches its final state.
    pub fn on_done(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.on_done.push(transition.into());
        self
    }
}

/// Configuration of one state node and its subtree.
///
/// The kind is inferred when not given: a node with children is compound,
/// one without is atomic.
///
/// # Example
///
/// ```rust
/// use statechart::builder::{StateConfig, TransitionConfig};
/// use statechart::effects::Action;
///
/// let player = StateConfig::new("player")
///     .initial("stopped")
///     .state(StateConfig::new("stopped").on("PLAY", "playing"))
///     .state(
///         StateConfig::new("playing")
///             .entry(Action::log("playing"))
///             .on("STOP", TransitionConfig::to("stopped")),
///     )
///     .state(StateConfig::deep_history("resume"));
/// # let _ = player;
/// ```
#[derive(Clone, Debug)]
pub struct StateConfig {
    pub(crate) key: String,
    pub(crate) id: Option<String>,
    pub(crate) kind: Option<StateKind>,
    pub(crate) initial: Option<String>,
    pub(crate) initial_actions: Vec<Action>,
    pub(crate) states: Vec<StateConfig>,
    pub(crate) on: Vec<(String, TransitionConfig)>,
    pub(crate) always: Vec<TransitionConfig>,
    pub(crate) after: Vec<(Delay, TransitionConfig)>,
    pub(crate) on_done: Vec<TransitionConfig>,
    pub(crate) invoke: Vec<InvokeConfig>,
    pub(crate) entry: Vec<Action>,
    pub(crate) exit: Vec<Action>,
    pub(crate) tags: Vec<String>,
    /// Default target of a history state.
    pub(crate) target: Option<TransitionConfig>,
}

impl StateConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: None,
            kind: None,
            initial: None,
            initial_actions: Vec::new(),
            states: Vec::new(),
            on: Vec::new(),
            always: Vec::new(),
            after: Vec::new(),
            on_done: Vec::new(),
            invoke: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            tags: Vec::new(),
            target: None,
        }
    }

    fn with_kind(key: impl Into<String>, kind: StateKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::new(key)
        }
    }

    pub fn atomic(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Atomic)
    }

    pub fn compound(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Compound)
    }

    pub fn parallel(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Parallel)
    }

    pub fn final_state(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::Final)
    }

    pub fn history(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::History(HistoryKind::Shallow))
    }

    pub fn deep_history(key: impl Into<String>) -> Self {
        Self::with_kind(key, StateKind::History(HistoryKind::Deep))
    }

    pub fn kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Explicit id, addressable as `#id` from anywhere in the machine.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Initial child key (or `.`-path, or `#id`) of a compound state.
    pub fn initial(mut self, target: impl Into<String>) -> Self {
        self.initial = Some(target.into());
        self
    }

    /// Actions of the initial transition, run after this state's entry
    /// actions whenever it is entered by default.
    pub fn initial_action(mut self, action: Action) -> Self {
        self.initial_actions.push(action);
        self
    }

    pub fn state(mut self, child: StateConfig) -> Self {
        self.states.push(child);
        self
    }

    pub fn states(mut self, children: impl IntoIterator<Item = StateConfig>) -> Self {
        self.states.extend(children);
        self
    }

    /// Add an alternative for `event_type`. Alternatives are tried in the
    /// order they are added. `"*"` matches any event without its own entry.
    pub fn on(mut self, event_type: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.on.push((event_type.into(), transition.into()));
        self
    }

    /// Eventless transition, checked after every microstep.
    pub fn always(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.always.push(transition.into());
        self
    }

    /// Transition taken once the state has been active for `delay`.
    pub fn after(mut self, delay: impl Into<Delay>, transition: impl Into<TransitionConfig>) -> Self {
        self.after.push((delay.into(), transition.into()));
        self
    }

    /// Transition taken when this compound or parallel state completes.
    pub fn on_done(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.on_done.push(transition.into());
        self
    }

    pub fn invoke(mut self, invoke: InvokeConfig) -> Self {
        self.invoke.push(invoke);
        self
    }

    pub fn entry(mut self, action: Action) -> Self {
        self.entry.push(action);
        self
    }

    pub fn exit(mut self, action: Action) -> Self {
        self.exit.push(action);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Default target of a history state with no memory yet.
    pub fn default_target(mut self, transition: impl Into<TransitionConfig>) -> Self {
        self.target = Some(transition.into());
        self
    }

    pub(crate) fn resolved_kind(&self) -> StateKind {
        match self.kind {
            Some(kind) => kind,
            None if self.states.is_empty() => StateKind::Atomic,
            None => StateKind::Compound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_inferred_from_children() {
        assert_eq!(StateConfig::new("leaf").resolved_kind(), StateKind::Atomic);
        let parent = StateConfig::new("parent").state(StateConfig::new("child"));
        assert_eq!(parent.resolved_kind(), StateKind::Compound);
    }

    #[test]
    fn explicit_kind_wins() {
        let region = StateConfig::parallel("p");
        assert_eq!(region.resolved_kind(), StateKind::Parallel);
        assert_eq!(
            StateConfig::deep_history("h").resolved_kind(),
            StateKind::History(HistoryKind::Deep)
        );
    }

    #[test]
    fn transitions_keep_declaration_order() {
        let state = StateConfig::new("s")
            .on("GO", "a")
            .on("GO", "b")
            .on("STOP", "c");
        let targets: Vec<_> = state
            .on
            .iter()
            .map(|(event, t)| format!("{event}:{}", t.targets[0]))
            .collect();
        assert_eq!(targets, vec!["GO:a", "GO:b", "STOP:c"]);
    }
}
