//! Interpreter configuration.

use serde::{Deserialize, Serialize};

/// Default cap on microsteps within one macrostep.
pub const DEFAULT_MAX_MICROSTEPS: usize = 100;

/// Tunables for the interpreter loop.
///
/// # Example
///
/// ```rust
/// use statechart::machine::MachineOptions;
///
/// let options: MachineOptions = serde_json::from_str(r#"{"max_microsteps": 10}"#).unwrap();
/// assert_eq!(options.max_microsteps, 10);
/// assert_eq!(MachineOptions::default().max_microsteps, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Microsteps allowed per macrostep before the loop is declared
    /// infinite.
    pub max_microsteps: usize,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            max_microsteps: DEFAULT_MAX_MICROSTEPS,
        }
    }
}

impl MachineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_microsteps(mut self, limit: usize) -> Self {
        self.max_microsteps = limit;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let options: MachineOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, MachineOptions::default());
    }

    #[test]
    fn builder_sets_limit() {
        assert_eq!(MachineOptions::new().max_microsteps(5).max_microsteps, 5);
    }
}
