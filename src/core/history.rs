//! History memory for compound and parallel states.
//!
//! When a compound or parallel node exits, the atomic descendants that were
//! active just before the exit are remembered under the node's id. History
//! pseudo-states consult this memory on entry: deep history restores the
//! remembered leaves, shallow history restores only the immediate child that
//! contained them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable record of the last active leaves per exited node.
///
/// `record` returns a new memory, leaving the original untouched.
///
/// # Example
///
/// ```rust
/// use statechart::core::HistoryMemory;
///
/// let memory = HistoryMemory::new();
/// let updated = memory.record("player", vec!["player.playing.fast".to_string()]);
///
/// assert!(memory.get("player").is_none());
/// assert_eq!(updated.get("player").unwrap(), ["player.playing.fast"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMemory {
    entries: BTreeMap<String, Vec<String>>,
}

impl HistoryMemory {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Remember `leaves` for `state_id`, returning a new memory.
    pub fn record(&self, state_id: impl Into<String>, leaves: Vec<String>) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(state_id.into(), leaves);
        Self { entries }
    }

    /// Leaves remembered for `state_id`, if it ever exited.
    pub fn get(&self, state_id: &str) -> Option<&[String]> {
        self.entries.get(state_id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_memory_is_empty() {
        let memory = HistoryMemory::new();
        assert!(memory.is_empty());
        assert!(memory.get("any").is_none());
    }

    #[test]
    fn record_is_immutable() {
        let memory = HistoryMemory::new();
        let updated = memory.record("a", vec!["a.b".into()]);

        assert_eq!(memory.len(), 0);
        assert_eq!(updated.len(), 1);
    }

    #[test]
    fn record_overwrites_previous_entry() {
        let memory = HistoryMemory::new()
            .record("a", vec!["a.b".into()])
            .record("a", vec!["a.c".into()]);

        assert_eq!(memory.get("a").unwrap(), ["a.c"]);
    }

    #[test]
    fn memory_serializes_correctly() {
        let memory = HistoryMemory::new().record("m.a", vec!["m.a.x".into(), "m.a.y".into()]);
        let json = serde_json::to_string(&memory).unwrap();
        let deserialized: HistoryMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(memory, deserialized);
    }
}
