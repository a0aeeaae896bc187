//! Build errors for machine definitions.

use thiserror::Error;

/// Errors that can occur when compiling a machine definition.
///
/// Validation runs over the whole tree before failing; when more than one
/// problem is found they are reported together as [`BuildError::Invalid`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("State '{state}' has child states but no initial state. Call .initial(key)")]
    MissingInitialState { state: String },

    #[error("Initial target '{target}' of '{state}' is not one of its descendants")]
    InvalidInitial { state: String, target: String },

    #[error("Transition from '{state}' targets '{target}', which does not exist")]
    UnresolvedTarget { state: String, target: String },

    #[error("State id '{id}' is used more than once")]
    DuplicateStateId { id: String },

    #[error("History state '{state}' must be nested inside a compound or parallel state")]
    HistoryWithoutParent { state: String },

    #[error("State '{state}' is invalid: {reason}")]
    InvalidStateKind { state: String, reason: String },

    #[error("Machine definition has {count} errors: {summary}")]
    Invalid {
        count: usize,
        summary: String,
        errors: Vec<BuildError>,
    },
}

impl BuildError {
    /// Collapse accumulated errors: one error stays as is, several become
    /// [`BuildError::Invalid`].
    pub(crate) fn from_all(mut errors: Vec<BuildError>) -> Self {
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }
        let summary = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        BuildError::Invalid {
            count: errors.len(),
            summary,
            errors,
        }
    }

    /// Every underlying error, flattening [`BuildError::Invalid`].
    pub fn errors(&self) -> Vec<&BuildError> {
        match self {
            BuildError::Invalid { errors, .. } => errors.iter().collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_error_is_not_wrapped() {
        let error = BuildError::from_all(vec![BuildError::DuplicateStateId { id: "a".into() }]);
        assert_eq!(error, BuildError::DuplicateStateId { id: "a".into() });
    }

    #[test]
    fn several_errors_are_summarised() {
        let error = BuildError::from_all(vec![
            BuildError::DuplicateStateId { id: "a".into() },
            BuildError::MissingInitialState { state: "b".into() },
        ]);
        assert_eq!(error.errors().len(), 2);
        let message = error.to_string();
        assert!(message.contains("2 errors"));
        assert!(message.contains("'a'"));
        assert!(message.contains("'b'"));
    }
}
