//! Interpreter error types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which implementation table a reference was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    Guard,
    Action,
    Actor,
    Delay,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::Guard => "guard",
            ReferenceKind::Action => "action",
            ReferenceKind::Actor => "actor",
            ReferenceKind::Delay => "delay",
        };
        f.write_str(name)
    }
}

/// Fatal errors raised while interpreting a machine.
///
/// Any of these aborts the macrostep in progress (no partial context
/// commit) and moves the actor to `status: error`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Unresolved {kind} reference '{name}'")]
    UnresolvedReference { kind: ReferenceKind, name: String },

    #[error("Invalid message payload, expected an event object with a string `type`: {payload}")]
    InvalidMessagePayload { payload: String },

    #[error("Eventless transitions did not settle within {limit} microsteps")]
    InfiniteEventlessLoop { limit: usize },

    #[error("Invalid state value: {reason}")]
    InvalidStateValue { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_reference_message_names_table() {
        let error = ExecutionError::UnresolvedReference {
            kind: ReferenceKind::Delay,
            name: "slow".into(),
        };
        assert_eq!(error.to_string(), "Unresolved delay reference 'slow'");
    }

    #[test]
    fn loop_message_includes_limit() {
        let error = ExecutionError::InfiniteEventlessLoop { limit: 100 };
        assert!(error.to_string().contains("100"));
    }
}
