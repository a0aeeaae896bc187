//! Action execution.
//!
//! `assign` and immediate `raise` take effect in place so later actions in
//! the same list observe them. Everything that reaches outside the instance
//! is recorded as an [`Effect`] in execution order.

use super::definition::Machine;
use super::error::{ExecutionError, ReferenceKind};
use crate::actor::ActorRef;
use crate::core::Event;
use crate::effects::{
    Action, ActionArgs, AssignMode, Delay, Effect, Enqueue, Recipient, SendTarget,
};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

/// Mutable working state of one macrostep.
pub(crate) struct Execution<'m> {
    machine: &'m Machine,
    pub(crate) context: Value,
    pub(crate) internal_queue: VecDeque<Event>,
    pub(crate) children: BTreeMap<String, ActorRef>,
    pub(crate) effects: Vec<Effect>,
    pub(crate) stop_requested: bool,
}

impl<'m> Execution<'m> {
    pub(crate) fn new(
        machine: &'m Machine,
        context: Value,
        internal_queue: VecDeque<Event>,
        children: BTreeMap<String, ActorRef>,
    ) -> Self {
        Self {
            machine,
            context,
            internal_queue,
            children,
            effects: Vec::new(),
            stop_requested: false,
        }
    }

    pub(crate) fn run_all(&mut self, actions: &[Action], event: &Event) -> Result<(), ExecutionError> {
        for action in actions {
            self.run(action, event, None, None)?;
        }
        Ok(())
    }

    fn run(
        &mut self,
        action: &Action,
        event: &Event,
        params: Option<&Value>,
        name: Option<&str>,
    ) -> Result<(), ExecutionError> {
        match action {
            Action::Assign { mode, assigner } => {
                let update = assigner(&self.args(event, params));
                match (mode, &mut self.context, update) {
                    (AssignMode::Merge, Value::Object(context), Value::Object(update)) => {
                        context.extend(update);
                    }
                    (_, context, update) => *context = update,
                }
            }
            Action::Raise { event: expr, delay, id } => {
                let args = self.args(event, params);
                let raised = expr.resolve(&args)?;
                match delay {
                    None => self.internal_queue.push_back(raised),
                    Some(delay) => {
                        let delay = self.resolve_delay(delay, &args)?;
                        self.effects.push(Effect::Deliver {
                            to: Recipient::SelfActor,
                            event: raised,
                            delay: Some(delay),
                            id: id.clone(),
                        });
                    }
                }
            }
            Action::SendTo {
                target,
                event: expr,
                delay,
                id,
            } => {
                let args = self.args(event, params);
                let sent = expr.resolve(&args)?;
                let to = self.recipient(target, &args);
                let delay = match delay {
                    Some(delay) => Some(self.resolve_delay(delay, &args)?),
                    None => None,
                };
                self.effects.push(Effect::Deliver {
                    to,
                    event: sent,
                    delay,
                    id: id.clone(),
                });
            }
            Action::Cancel(id) => self.effects.push(Effect::Cancel { id: id.clone() }),
            Action::Spawn { src, id, input } => {
                let logic = self.machine.implementations.actors.get(src).ok_or_else(|| {
                    ExecutionError::UnresolvedReference {
                        kind: ReferenceKind::Actor,
                        name: src.clone(),
                    }
                })?;
                let actor_ref = ActorRef::new(id.clone());
                self.children.insert(id.clone(), actor_ref.clone());
                self.effects.push(Effect::Spawn {
                    actor_ref,
                    logic: logic.clone(),
                    input: input.clone().unwrap_or(Value::Null),
                });
            }
            Action::StopChild(id) => {
                if let Some(actor_ref) = self.children.remove(id) {
                    self.effects.push(Effect::Stop { actor_ref });
                }
            }
            Action::StopSelf => self.stop_requested = true,
            Action::Log { label, value } => {
                let value = match value {
                    Some(resolver) => resolver(&self.args(event, params)),
                    None => self.context.clone(),
                };
                self.effects.push(Effect::Log {
                    label: label.clone(),
                    value,
                });
            }
            Action::Custom(callback) => self.effects.push(Effect::Run {
                name: name.map(str::to_string),
                callback: callback.clone(),
                context: self.context.clone(),
                event: event.clone(),
                params: params.cloned(),
            }),
            Action::Named {
                name: action_name,
                params: declared,
            } => {
                let machine = self.machine;
                let implementation =
                    machine
                        .implementations
                        .actions
                        .get(action_name)
                        .ok_or_else(|| ExecutionError::UnresolvedReference {
                            kind: ReferenceKind::Action,
                            name: action_name.clone(),
                        })?;
                let resolved = declared.resolve(&self.context, event);
                self.run(implementation, event, resolved.as_ref(), Some(action_name))?;
            }
            Action::Enqueue(build) => {
                let mut queue = Enqueue::new();
                build(&self.args(event, params), &mut queue);
                for queued in queue.into_actions() {
                    self.run(&queued, event, params, name)?;
                }
            }
        }
        Ok(())
    }

    fn args<'a>(&'a self, event: &'a Event, params: Option<&'a Value>) -> ActionArgs<'a> {
        ActionArgs {
            context: &self.context,
            event,
            params,
        }
    }

    fn resolve_delay(&self, delay: &Delay, args: &ActionArgs<'_>) -> Result<Duration, ExecutionError> {
        match delay {
            Delay::Millis(ms) => Ok(Duration::from_millis(*ms)),
            Delay::Named(name) => self
                .machine
                .implementations
                .delays
                .get(name)
                .map(|delay| delay(args))
                .ok_or_else(|| ExecutionError::UnresolvedReference {
                    kind: ReferenceKind::Delay,
                    name: name.clone(),
                }),
        }
    }

    /// Children shadow system-registered ids.
    fn recipient(&self, target: &SendTarget, args: &ActionArgs<'_>) -> Recipient {
        match target {
            SendTarget::Id(id) => match self.children.get(id) {
                Some(child) => Recipient::Ref(child.clone()),
                None => Recipient::Id(id.clone()),
            },
            SendTarget::Ref(actor_ref) => Recipient::Ref(actor_ref.clone()),
            SendTarget::Parent => Recipient::Parent,
            SendTarget::Resolver(resolve) => self.recipient(&resolve(args), args),
        }
    }
}
