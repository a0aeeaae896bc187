//! Immutable per-microstep snapshots.

use super::configuration::Configuration;
use super::error::ExecutionError;
use crate::actor::ActorRef;
use crate::core::{Event, HistoryMemory, StateValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Done,
    Error,
    Stopped,
}

/// Externally observable state of one machine instance.
///
/// Each microstep supersedes the previous snapshot; snapshots are never
/// mutated in place by the interpreter.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub(crate) value: StateValue,
    pub(crate) context: Value,
    pub(crate) status: Status,
    pub(crate) error: Option<ExecutionError>,
    pub(crate) output: Option<Value>,
    pub(crate) children: BTreeMap<String, ActorRef>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) configuration: Configuration,
    pub(crate) history: HistoryMemory,
    pub(crate) internal_queue: VecDeque<Event>,
}

impl Snapshot {
    pub fn value(&self) -> &StateValue {
        &self.value
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&ExecutionError> {
        self.error.as_ref()
    }

    /// Machine output, set once the machine reaches a top-level final state.
    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn children(&self) -> &BTreeMap<String, ActorRef> {
        &self.children
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub fn history(&self) -> &HistoryMemory {
        &self.history
    }

    /// Raised events not yet drained. Empty on every macrostep's final
    /// snapshot; populated on intermediate microstep snapshots.
    pub fn internal_queue(&self) -> &VecDeque<Event> {
        &self.internal_queue
    }

    /// Whether the active value is at or below `path` (`"a.b"`).
    pub fn matches(&self, path: &str) -> bool {
        self.value.matches(&StateValue::from_path(path))
    }

    pub fn matches_value(&self, value: &StateValue) -> bool {
        self.value.matches(value)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub(crate) fn with_status(&self, status: Status) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    pub(crate) fn with_error(&self, error: ExecutionError) -> Self {
        Self {
            status: Status::Error,
            error: Some(error),
            internal_queue: VecDeque::new(),
            ..self.clone()
        }
    }
}
