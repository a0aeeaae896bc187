//! Builder for transition alternatives.

use crate::core::{Guard, GuardArgs};
use crate::effects::Action;

/// One declared transition alternative, before its targets are resolved.
///
/// Targets use the specifier grammar: `child` or `sibling.path` (relative
/// to the source's parent), `.child` (relative to the source), `#id` or
/// `#id.path` (absolute), and `^sibling` for each extra level up.
///
/// # Example
///
/// ```rust
/// use statechart::builder::TransitionConfig;
/// use statechart::effects::Action;
///
/// let transition = TransitionConfig::to("#app.done")
///     .when(|args| args.event.get("ok").is_some())
///     .action(Action::log("finishing"));
/// assert_eq!(transition.target_specs(), ["#app.done"]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TransitionConfig {
    pub(crate) targets: Vec<String>,
    pub(crate) guard: Option<Guard>,
    pub(crate) actions: Vec<Action>,
    pub(crate) reenter: bool,
}

impl TransitionConfig {
    /// A transition with no target: its actions run and nothing is exited.
    pub fn internal() -> Self {
        Self::default()
    }

    pub fn to(target: impl Into<String>) -> Self {
        Self {
            targets: vec![target.into()],
            ..Self::default()
        }
    }

    /// A transition entering several targets at once (parallel regions).
    pub fn to_all<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn guard(mut self, guard: impl Into<Guard>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Guard with an anonymous predicate.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&GuardArgs<'_>) -> bool + Send + Sync + 'static,
    {
        self.guard(Guard::new(predicate))
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Exit and re-enter the target even when it is the source or one of
    /// its descendants. Without a target, the source itself is re-entered.
    pub fn reenter(mut self) -> Self {
        self.reenter = true;
        self
    }

    pub fn target_specs(&self) -> &[String] {
        &self.targets
    }
}

impl From<&str> for TransitionConfig {
    fn from(target: &str) -> Self {
        TransitionConfig::to(target)
    }
}

impl From<String> for TransitionConfig {
    fn from(target: String) -> Self {
        TransitionConfig::to(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_has_no_targets() {
        let transition = TransitionConfig::internal().action(Action::log("tick"));
        assert!(transition.targets.is_empty());
        assert_eq!(transition.actions.len(), 1);
        assert!(!transition.reenter);
    }

    #[test]
    fn to_all_keeps_order() {
        let transition = TransitionConfig::to_all(["a.x", "b.y"]);
        assert_eq!(transition.target_specs(), ["a.x", "b.y"]);
    }

    #[test]
    fn string_converts_to_target() {
        let transition: TransitionConfig = "next".into();
        assert_eq!(transition.target_specs(), ["next"]);
    }
}
