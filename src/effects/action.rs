//! The ordered-action IR.
//!
//! Declarative action lists and imperative `enqueue` blocks both compile to
//! [`Action`] values. The interpreter applies `assign` and plain `raise` in
//! place and turns everything else into [`Effect`](super::Effect)s for the
//! actor runtime.

use crate::actor::ActorRef;
use crate::core::{Event, Params};
use crate::machine::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Arguments handed to every action body and resolver.
pub struct ActionArgs<'a> {
    pub context: &'a Value,
    pub event: &'a Event,
    /// Resolved params; `None` when the action was declared without any.
    pub params: Option<&'a Value>,
}

/// Side-effecting custom action body.
pub type ActionFn = Arc<dyn Fn(&ActionArgs<'_>) + Send + Sync>;

/// Computes a value from `{context, event, params}`.
pub type ValueResolver = Arc<dyn Fn(&ActionArgs<'_>) -> Value + Send + Sync>;

/// Chooses a send target at execution time.
pub type TargetResolver = Arc<dyn Fn(&ActionArgs<'_>) -> SendTarget + Send + Sync>;

/// Imperative action front-end: appends actions through [`Enqueue`].
pub type EnqueueFn = Arc<dyn Fn(&ActionArgs<'_>, &mut Enqueue) + Send + Sync>;

/// Box a custom action body, fixing its signature for the implementation table.
pub fn action_fn<F>(callback: F) -> ActionFn
where
    F: Fn(&ActionArgs<'_>) + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Payload of a `raise` or `send_to`.
#[derive(Clone)]
pub enum EventExpr {
    Static(Event),
    /// Must produce an event object; anything else is a fatal
    /// `InvalidMessagePayload`.
    Dynamic(ValueResolver),
}

impl EventExpr {
    pub(crate) fn resolve(&self, args: &ActionArgs<'_>) -> Result<Event, ExecutionError> {
        match self {
            EventExpr::Static(event) => Ok(event.clone()),
            EventExpr::Dynamic(resolver) => Event::try_from(resolver(args)),
        }
    }
}

/// Where a `send_to` goes.
#[derive(Clone)]
pub enum SendTarget {
    /// A child of the sender by id, falling back to a system-registered id.
    Id(String),
    Ref(ActorRef),
    Parent,
    Resolver(TargetResolver),
}

impl From<&str> for SendTarget {
    fn from(id: &str) -> Self {
        SendTarget::Id(id.to_string())
    }
}

impl From<String> for SendTarget {
    fn from(id: String) -> Self {
        SendTarget::Id(id)
    }
}

impl From<ActorRef> for SendTarget {
    fn from(actor: ActorRef) -> Self {
        SendTarget::Ref(actor)
    }
}

/// Delay of a scheduled raise/send: milliseconds or a `delays` table name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delay {
    Millis(u64),
    Named(String),
}

impl Delay {
    /// Stable label used in generated `after` event types.
    pub fn label(&self) -> String {
        match self {
            Delay::Millis(ms) => ms.to_string(),
            Delay::Named(name) => name.clone(),
        }
    }
}

impl From<u64> for Delay {
    fn from(ms: u64) -> Self {
        Delay::Millis(ms)
    }
}

impl From<Duration> for Delay {
    fn from(duration: Duration) -> Self {
        Delay::Millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }
}

impl From<&str> for Delay {
    fn from(name: &str) -> Self {
        Delay::Named(name.to_string())
    }
}

/// How an `assign` result is folded into context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignMode {
    /// Shallow-merge the returned object into an object context.
    Merge,
    /// Replace the whole context.
    Replace,
}

/// One entry of an ordered action list.
#[derive(Clone)]
pub enum Action {
    Assign {
        mode: AssignMode,
        assigner: ValueResolver,
    },
    Raise {
        event: EventExpr,
        delay: Option<Delay>,
        id: Option<String>,
    },
    SendTo {
        target: SendTarget,
        event: EventExpr,
        delay: Option<Delay>,
        id: Option<String>,
    },
    Cancel(String),
    Spawn {
        src: String,
        id: String,
        input: Option<Value>,
    },
    StopChild(String),
    /// Stop the running actor once the current microstep's actions finish.
    StopSelf,
    Log {
        label: Option<String>,
        value: Option<ValueResolver>,
    },
    Custom(ActionFn),
    Named {
        name: String,
        params: Params,
    },
    Enqueue(EnqueueFn),
}

impl Action {
    /// Create an anonymous custom action.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) + Send + Sync + 'static,
    {
        Action::Custom(Arc::new(callback))
    }

    /// Reference an action from the implementation table.
    pub fn named(name: impl Into<String>) -> Self {
        Action::Named {
            name: name.into(),
            params: Params::None,
        }
    }

    pub fn named_with(name: impl Into<String>, params: impl Into<Params>) -> Self {
        Action::Named {
            name: name.into(),
            params: params.into(),
        }
    }

    /// Merge the returned object into context.
    pub fn assign<F>(assigner: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        Action::Assign {
            mode: AssignMode::Merge,
            assigner: Arc::new(assigner),
        }
    }

    /// Replace context with the returned value.
    pub fn replace_context<F>(assigner: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        Action::Assign {
            mode: AssignMode::Replace,
            assigner: Arc::new(assigner),
        }
    }

    pub fn raise(event: impl Into<Event>) -> Self {
        Action::Raise {
            event: EventExpr::Static(event.into()),
            delay: None,
            id: None,
        }
    }

    pub fn raise_with<F>(resolver: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        Action::Raise {
            event: EventExpr::Dynamic(Arc::new(resolver)),
            delay: None,
            id: None,
        }
    }

    pub fn send_to(target: impl Into<SendTarget>, event: impl Into<Event>) -> Self {
        Action::SendTo {
            target: target.into(),
            event: EventExpr::Static(event.into()),
            delay: None,
            id: None,
        }
    }

    pub fn send_to_with<F>(target: impl Into<SendTarget>, resolver: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        Action::SendTo {
            target: target.into(),
            event: EventExpr::Dynamic(Arc::new(resolver)),
            delay: None,
            id: None,
        }
    }

    /// Send to a target chosen at execution time.
    pub fn send_to_resolved<T>(target: T, event: impl Into<Event>) -> Self
    where
        T: Fn(&ActionArgs<'_>) -> SendTarget + Send + Sync + 'static,
    {
        Action::send_to(SendTarget::Resolver(Arc::new(target)), event)
    }

    pub fn send_parent(event: impl Into<Event>) -> Self {
        Action::send_to(SendTarget::Parent, event)
    }

    pub fn cancel(id: impl Into<String>) -> Self {
        Action::Cancel(id.into())
    }

    pub fn spawn(src: impl Into<String>, id: impl Into<String>) -> Self {
        Action::Spawn {
            src: src.into(),
            id: id.into(),
            input: None,
        }
    }

    pub fn spawn_with_input(src: impl Into<String>, id: impl Into<String>, input: Value) -> Self {
        Action::Spawn {
            src: src.into(),
            id: id.into(),
            input: Some(input),
        }
    }

    pub fn stop_child(id: impl Into<String>) -> Self {
        Action::StopChild(id.into())
    }

    pub fn stop_self() -> Self {
        Action::StopSelf
    }

    pub fn log(label: impl Into<String>) -> Self {
        Action::Log {
            label: Some(label.into()),
            value: None,
        }
    }

    pub fn log_with<F>(label: impl Into<String>, value: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        Action::Log {
            label: Some(label.into()),
            value: Some(Arc::new(value)),
        }
    }

    /// Imperative front-end; see [`Enqueue`].
    pub fn enqueue<F>(build: F) -> Self
    where
        F: Fn(&ActionArgs<'_>, &mut Enqueue) + Send + Sync + 'static,
    {
        Action::Enqueue(Arc::new(build))
    }

    /// Schedule a `raise`/`send_to` after `delay`. Other actions are unchanged.
    pub fn after(self, delay: impl Into<Delay>) -> Self {
        let delay = Some(delay.into());
        match self {
            Action::Raise { event, id, .. } => Action::Raise { event, delay, id },
            Action::SendTo {
                target, event, id, ..
            } => Action::SendTo {
                target,
                event,
                delay,
                id,
            },
            other => other,
        }
    }

    /// Give a `raise`/`send_to` a cancellation id. Other actions are unchanged.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        let id = Some(id.into());
        match self {
            Action::Raise { event, delay, .. } => Action::Raise { event, delay, id },
            Action::SendTo {
                target,
                event,
                delay,
                ..
            } => Action::SendTo {
                target,
                event,
                delay,
                id,
            },
            other => other,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Assign { mode, .. } => write!(f, "Assign({mode:?})"),
            Action::Raise { delay, id, .. } => f
                .debug_struct("Raise")
                .field("delay", delay)
                .field("id", id)
                .finish(),
            Action::SendTo { delay, id, .. } => f
                .debug_struct("SendTo")
                .field("delay", delay)
                .field("id", id)
                .finish(),
            Action::Cancel(id) => f.debug_tuple("Cancel").field(id).finish(),
            Action::Spawn { src, id, .. } => f
                .debug_struct("Spawn")
                .field("src", src)
                .field("id", id)
                .finish(),
            Action::StopChild(id) => f.debug_tuple("StopChild").field(id).finish(),
            Action::StopSelf => write!(f, "StopSelf"),
            Action::Log { label, .. } => f.debug_tuple("Log").field(label).finish(),
            Action::Custom(_) => write!(f, "Custom(..)"),
            Action::Named { name, params } => f
                .debug_struct("Named")
                .field("name", name)
                .field("params", params)
                .finish(),
            Action::Enqueue(_) => write!(f, "Enqueue(..)"),
        }
    }
}

/// Collector handed to `enqueue` blocks.
///
/// # Example
///
/// ```rust
/// use statechart::effects::Action;
/// use serde_json::json;
///
/// let action = Action::enqueue(|args, q| {
///     q.assign(|_| json!({"seen": true}));
///     if args.context["notify"] == json!(true) {
///         q.raise("NOTIFIED");
///     }
/// });
/// # let _ = action;
/// ```
#[derive(Default)]
pub struct Enqueue {
    actions: Vec<Action>,
}

impl Enqueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn assign<F>(&mut self, assigner: F) -> &mut Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        self.action(Action::assign(assigner))
    }

    pub fn raise(&mut self, event: impl Into<Event>) -> &mut Self {
        self.action(Action::raise(event))
    }

    pub fn send_to(&mut self, target: impl Into<SendTarget>, event: impl Into<Event>) -> &mut Self {
        self.action(Action::send_to(target, event))
    }

    pub fn send_parent(&mut self, event: impl Into<Event>) -> &mut Self {
        self.action(Action::send_parent(event))
    }

    pub fn cancel(&mut self, id: impl Into<String>) -> &mut Self {
        self.action(Action::cancel(id))
    }

    pub fn spawn(&mut self, src: impl Into<String>, id: impl Into<String>) -> &mut Self {
        self.action(Action::spawn(src, id))
    }

    pub fn stop_child(&mut self, id: impl Into<String>) -> &mut Self {
        self.action(Action::stop_child(id))
    }

    pub fn log(&mut self, label: impl Into<String>) -> &mut Self {
        self.action(Action::log(label))
    }

    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.action(Action::named(name))
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}
