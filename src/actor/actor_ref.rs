//! Addresses of running actors.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Address of one actor instance.
///
/// The `id` is the name the actor was spawned under (its invoke id, or the
/// machine id for a root actor). The `session` is unique per instance, so
/// a reference held across a stop and respawn under the same id never
/// reaches the newer instance.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef {
    id: String,
    session: Uuid,
}

impl ActorRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            session: Uuid::new_v4(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn session(&self) -> Uuid {
        self.session
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_id_different_sessions() {
        let first = ActorRef::new("worker");
        let second = ActorRef::new("worker");
        assert_eq!(first.id(), second.id());
        assert_ne!(first, second);
    }

    #[test]
    fn display_includes_id() {
        let actor = ActorRef::new("worker");
        assert!(actor.to_string().starts_with("worker#"));
    }
}
