//! Externally observable state values.

use super::path::to_state_path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Nested mapping mirroring the active compound/parallel structure.
///
/// A compound node whose active child is atomic contributes the child's key
/// as a string; any other active child contributes a nested mapping.
///
/// # Example
///
/// ```rust
/// use statechart::core::StateValue;
///
/// let value = StateValue::from_path("checkout.payment.card");
/// assert!(value.matches(&StateValue::from("checkout")));
/// assert!(value.matches(&StateValue::from_path("checkout.payment")));
/// assert!(!value.matches(&StateValue::from("cart")));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Leaf(String),
    Nested(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Build a value from a `.`-delimited path (`"a.b.c"` is `{a: {b: "c"}}`).
    pub fn from_path(path: &str) -> Self {
        let mut segments = to_state_path(path);
        let mut value = StateValue::Leaf(segments.pop().unwrap_or_default());
        while let Some(key) = segments.pop() {
            value = StateValue::Nested(BTreeMap::from([(key, value)]));
        }
        value
    }

    /// Whether `self` is at or below the partial value `parent`.
    pub fn matches(&self, parent: &StateValue) -> bool {
        match (parent, self) {
            (StateValue::Leaf(p), StateValue::Leaf(c)) => p == c,
            (StateValue::Leaf(p), StateValue::Nested(map)) => map.contains_key(p),
            (StateValue::Nested(_), StateValue::Leaf(_)) => false,
            (StateValue::Nested(pmap), StateValue::Nested(cmap)) => {
                pmap.iter().all(|(key, pval)| match cmap.get(key) {
                    Some(cval) => cval.matches(pval),
                    None => false,
                })
            }
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            StateValue::Leaf(key) => Some(key),
            StateValue::Nested(_) => None,
        }
    }
}

impl From<&str> for StateValue {
    fn from(key: &str) -> Self {
        StateValue::Leaf(key.to_string())
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateValue::Leaf(key) => write!(f, "{key}"),
            StateValue::Nested(map) => {
                let json = serde_json::to_string(map).map_err(|_| fmt::Error)?;
                write!(f, "{json}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaf_serializes_as_string() {
        let value = StateValue::from("yellow");
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("yellow"));
    }

    #[test]
    fn nested_round_trips_through_json() {
        let json = json!({"a": "a1", "b": {"b1": "x"}});
        let value: StateValue = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&value).unwrap(), json);
    }

    #[test]
    fn from_path_nests_segments() {
        let value = StateValue::from_path("a.b");
        let expected: StateValue = serde_json::from_value(json!({"a": "b"})).unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn matches_partial_parallel_values() {
        let value: StateValue =
            serde_json::from_value(json!({"a": "a2", "b": "b1"})).unwrap();
        let partial: StateValue = serde_json::from_value(json!({"a": "a2"})).unwrap();
        let wrong: StateValue = serde_json::from_value(json!({"a": "a1"})).unwrap();

        assert!(value.matches(&partial));
        assert!(!value.matches(&wrong));
        assert!(value.matches(&StateValue::from("b")));
    }

    #[test]
    fn leaf_does_not_match_nested_parent() {
        let parent: StateValue = serde_json::from_value(json!({"a": "x"})).unwrap();
        assert!(!StateValue::from("a").matches(&parent));
    }
}
