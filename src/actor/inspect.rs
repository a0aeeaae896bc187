//! Non-fatal warnings and system inspection.

use super::actor_ref::ActorRef;
use crate::core::Event;
use crate::machine::Snapshot;
use thiserror::Error;

/// Conditions the runtime reports without changing any actor's status.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Warning {
    /// The target actor is stopped, finished, or was replaced by a newer
    /// instance under the same id. The event was dropped.
    #[error("Event '{event_type}' dropped: actor '{target}' is not running")]
    StaleTargetDelivery { target: String, event_type: String },

    /// No actor answers to the requested recipient.
    #[error("Event '{event_type}' dropped: no actor named '{target}'")]
    UnknownSendTarget { target: String, event_type: String },
}

/// Everything an inspector observes, in the order it happens.
#[derive(Debug, Clone)]
pub enum InspectionEvent {
    /// An event was taken from an actor's mailbox (or the init event).
    Event { actor: ActorRef, event: Event },
    /// One intermediate result of a macrostep.
    Microstep {
        actor: ActorRef,
        event: Event,
        snapshot: Snapshot,
    },
    /// The snapshot an actor settled on after a macrostep.
    Snapshot { actor: ActorRef, snapshot: Snapshot },
    Stopped { actor: ActorRef },
    Warning(Warning),
}

impl InspectionEvent {
    pub fn actor(&self) -> Option<&ActorRef> {
        match self {
            InspectionEvent::Event { actor, .. }
            | InspectionEvent::Microstep { actor, .. }
            | InspectionEvent::Snapshot { actor, .. }
            | InspectionEvent::Stopped { actor } => Some(actor),
            InspectionEvent::Warning(_) => None,
        }
    }
}

pub type Inspector = Box<dyn FnMut(&InspectionEvent)>;

pub type Subscriber = Box<dyn FnMut(&Snapshot)>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_messages_name_the_target() {
        let warning = Warning::StaleTargetDelivery {
            target: "worker".into(),
            event_type: "PING".into(),
        };
        assert_eq!(
            warning.to_string(),
            "Event 'PING' dropped: actor 'worker' is not running"
        );
    }

    #[test]
    fn warnings_carry_no_actor() {
        let event = InspectionEvent::Warning(Warning::UnknownSendTarget {
            target: "ghost".into(),
            event_type: "PING".into(),
        });
        assert!(event.actor().is_none());
    }
}
