//! Guard predicates for controlling transitions.
//!
//! Guards are pure boolean functions that decide whether a transition
//! alternative is enabled. They never mutate context.

use super::event::Event;
use super::params::Params;
use crate::machine::{ExecutionError, ReferenceKind};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Arguments handed to a guard body.
pub struct GuardArgs<'a> {
    pub context: &'a Value,
    pub event: &'a Event,
    /// Resolved params; `None` when the guard was declared without any.
    pub params: Option<&'a Value>,
}

/// Implementation of a guard body.
pub type GuardFn = Arc<dyn Fn(&GuardArgs<'_>) -> bool + Send + Sync>;

/// Box a guard body, fixing its signature for the implementation table.
pub fn guard_fn<F>(predicate: F) -> GuardFn
where
    F: Fn(&GuardArgs<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(predicate)
}

/// Everything a guard needs from the interpreter at evaluation time.
pub struct GuardEnv<'a> {
    pub context: &'a Value,
    pub event: &'a Event,
    pub guards: &'a HashMap<String, GuardFn>,
    /// Answers `in_state` queries against the source configuration.
    pub in_state: &'a dyn Fn(&str) -> bool,
}

/// Pure predicate gating a transition alternative.
///
/// # Example
///
/// ```rust
/// use statechart::core::{guard_fn, Event, Guard, GuardEnv, GuardFn};
/// use serde_json::json;
/// use std::collections::HashMap;
///
/// let guard = Guard::and(vec![
///     Guard::new(|args| args.context["count"].as_i64() > Some(0)),
///     Guard::not(Guard::named("isLocked")),
/// ]);
///
/// let mut guards: HashMap<String, GuardFn> = HashMap::new();
/// guards.insert("isLocked".into(), guard_fn(|_| false));
///
/// let context = json!({"count": 3});
/// let event = Event::new("GO");
/// let env = GuardEnv { context: &context, event: &event, guards: &guards, in_state: &|_| false };
/// assert!(guard.check(&env).unwrap());
/// ```
#[derive(Clone)]
pub enum Guard {
    Predicate(GuardFn),
    Named { name: String, params: Params },
    And(Vec<Guard>),
    Or(Vec<Guard>),
    Not(Box<Guard>),
    /// True when the given state (`#id` or value path) is active.
    InState(String),
}

impl Guard {
    /// Create a guard from an anonymous predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&GuardArgs<'_>) -> bool + Send + Sync + 'static,
    {
        Guard::Predicate(Arc::new(predicate))
    }

    /// Reference a guard from the implementation table.
    pub fn named(name: impl Into<String>) -> Self {
        Guard::Named {
            name: name.into(),
            params: Params::None,
        }
    }

    pub fn named_with(name: impl Into<String>, params: impl Into<Params>) -> Self {
        Guard::Named {
            name: name.into(),
            params: params.into(),
        }
    }

    pub fn and(guards: Vec<Guard>) -> Self {
        Guard::And(guards)
    }

    pub fn or(guards: Vec<Guard>) -> Self {
        Guard::Or(guards)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(guard: Guard) -> Self {
        Guard::Not(Box::new(guard))
    }

    pub fn in_state(state: impl Into<String>) -> Self {
        Guard::InState(state.into())
    }

    /// Evaluate the guard. Children of composites run left to right and
    /// short-circuit. A name missing from the table is fatal.
    pub fn check(&self, env: &GuardEnv<'_>) -> Result<bool, ExecutionError> {
        match self {
            Guard::Predicate(predicate) => Ok(predicate(&GuardArgs {
                context: env.context,
                event: env.event,
                params: None,
            })),
            Guard::Named { name, params } => {
                let implementation =
                    env.guards
                        .get(name)
                        .ok_or_else(|| ExecutionError::UnresolvedReference {
                            kind: ReferenceKind::Guard,
                            name: name.clone(),
                        })?;
                let resolved = params.resolve(env.context, env.event);
                Ok(implementation(&GuardArgs {
                    context: env.context,
                    event: env.event,
                    params: resolved.as_ref(),
                }))
            }
            Guard::And(guards) => {
                for guard in guards {
                    if !guard.check(env)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Guard::Or(guards) => {
                for guard in guards {
                    if guard.check(env)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Guard::Not(guard) => Ok(!guard.check(env)?),
            Guard::InState(state) => Ok((env.in_state)(state)),
        }
    }
}

impl From<&str> for Guard {
    fn from(name: &str) -> Self {
        Guard::named(name)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Predicate(_) => write!(f, "Predicate(..)"),
            Guard::Named { name, params } => f
                .debug_struct("Named")
                .field("name", name)
                .field("params", params)
                .finish(),
            Guard::And(guards) => f.debug_tuple("And").field(guards).finish(),
            Guard::Or(guards) => f.debug_tuple("Or").field(guards).finish(),
            Guard::Not(guard) => f.debug_tuple("Not").field(guard).finish(),
            Guard::InState(state) => f.debug_tuple("InState").field(state).finish(),
        }
    }
}
