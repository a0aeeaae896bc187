//! Event objects delivered to machines.

use crate::machine::ExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type prefix for a compound or parallel state reaching completion.
pub const DONE_STATE_PREFIX: &str = "xstate.done.state.";

/// Event type prefix for a child actor reaching its final state.
pub const DONE_ACTOR_PREFIX: &str = "xstate.done.actor.";

/// Event type prefix for delayed (`after`) transitions.
pub const AFTER_PREFIX: &str = "xstate.after.";

/// Event type used for the initial transition of a machine.
pub const INIT_EVENT: &str = "xstate.init";

/// Event type that matches every event on a transition table.
pub const WILDCARD: &str = "*";

/// An event: a required `type` plus open payload fields.
///
/// # Example
///
/// ```rust
/// use statechart::core::Event;
/// use serde_json::json;
///
/// let event = Event::new("TIMER").with("elapsed", json!(30));
/// assert_eq!(event.event_type(), "TIMER");
/// assert_eq!(event.get("elapsed"), Some(&json!(30)));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field, returning the updated event.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The event as a JSON object, `type` included.
    pub fn to_value(&self) -> Value {
        let mut object = self.payload.clone();
        object.insert("type".to_string(), Value::String(self.event_type.clone()));
        Value::Object(object)
    }

    pub(crate) fn init(input: &Value) -> Self {
        Self::new(INIT_EVENT).with("input", input.clone())
    }

    pub(crate) fn done_state(state_id: &str) -> Self {
        Self::new(format!("{DONE_STATE_PREFIX}{state_id}"))
    }

    pub(crate) fn done_actor(actor_id: &str, output: Option<&Value>) -> Self {
        Self::new(format!("{DONE_ACTOR_PREFIX}{actor_id}"))
            .with("output", output.cloned().unwrap_or(Value::Null))
    }
}

impl TryFrom<Value> for Event {
    type Error = ExecutionError;

    /// Validate an arbitrary payload as an event object.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut object) = value else {
            return Err(ExecutionError::InvalidMessagePayload {
                payload: value.to_string(),
            });
        };
        match object.remove("type") {
            Some(Value::String(event_type)) => Ok(Self {
                event_type,
                payload: object,
            }),
            other => {
                if let Some(original) = other {
                    object.insert("type".to_string(), original);
                }
                Err(ExecutionError::InvalidMessagePayload {
                    payload: Value::Object(object).to_string(),
                })
            }
        }
    }
}

impl From<&str> for Event {
    fn from(event_type: &str) -> Self {
        Self::new(event_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_field() {
        let event = Event::new("PING").with("n", json!(1));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"type": "PING", "n": 1}));
    }

    #[test]
    fn try_from_accepts_event_objects() {
        let event = Event::try_from(json!({"type": "GO", "speed": 3})).unwrap();
        assert_eq!(event.event_type(), "GO");
        assert_eq!(event.get("speed"), Some(&json!(3)));
    }

    #[test]
    fn try_from_rejects_non_objects() {
        let result = Event::try_from(json!("GO"));
        assert!(matches!(
            result,
            Err(ExecutionError::InvalidMessagePayload { .. })
        ));
    }

    #[test]
    fn try_from_rejects_missing_or_non_string_type() {
        assert!(Event::try_from(json!({"speed": 3})).is_err());
        assert!(Event::try_from(json!({"type": 42})).is_err());
    }

    #[test]
    fn to_value_includes_type() {
        let event = Event::new("A").with("x", json!(true));
        assert_eq!(event.to_value(), json!({"type": "A", "x": true}));
    }
}
