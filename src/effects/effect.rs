//! Effects: work the interpreter hands to the actor runtime.
//!
//! A macrostep is computed without touching the outside world. Everything
//! that must reach beyond the snapshot (custom callbacks, deliveries,
//! timers, child lifecycle, logging) is described here, in execution order.

use super::action::ActionFn;
use super::action::ActionArgs;
use crate::actor::ActorRef;
use crate::core::Event;
use crate::machine::Machine;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Resolved recipient of a delivery.
#[derive(Clone, Debug, PartialEq)]
pub enum Recipient {
    SelfActor,
    Parent,
    /// Child id of the sender, or a system-registered id.
    Id(String),
    Ref(ActorRef),
}

#[derive(Clone)]
pub enum Effect {
    /// Run a custom action body against the context it observed in place.
    Run {
        name: Option<String>,
        callback: ActionFn,
        context: Value,
        event: Event,
        params: Option<Value>,
    },
    /// Deliver an event, now or after `delay`. Delayed deliveries are
    /// cancellable by `id` from the scheduling actor only.
    Deliver {
        to: Recipient,
        event: Event,
        delay: Option<Duration>,
        id: Option<String>,
    },
    Cancel {
        id: String,
    },
    Spawn {
        actor_ref: ActorRef,
        logic: Machine,
        input: Value,
    },
    Stop {
        actor_ref: ActorRef,
    },
    Log {
        label: Option<String>,
        value: Value,
    },
}

impl Effect {
    /// Invoke the callback of a `Run` effect. Other effects need the runtime.
    pub fn run_callback(&self) {
        if let Effect::Run {
            callback,
            context,
            event,
            params,
            ..
        } = self
        {
            callback(&ActionArgs {
                context,
                event,
                params: params.as_ref(),
            });
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Run { name, event, .. } => f
                .debug_struct("Run")
                .field("name", name)
                .field("event", &event.event_type())
                .finish(),
            Effect::Deliver {
                to,
                event,
                delay,
                id,
            } => f
                .debug_struct("Deliver")
                .field("to", to)
                .field("event", &event.event_type())
                .field("delay", delay)
                .field("id", id)
                .finish(),
            Effect::Cancel { id } => f.debug_struct("Cancel").field("id", id).finish(),
            Effect::Spawn { actor_ref, .. } => {
                f.debug_struct("Spawn").field("actor", actor_ref).finish()
            }
            Effect::Stop { actor_ref } => f.debug_struct("Stop").field("actor", actor_ref).finish(),
            Effect::Log { label, value } => f
                .debug_struct("Log")
                .field("label", label)
                .field("value", value)
                .finish(),
        }
    }
}
