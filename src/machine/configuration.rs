//! Active node sets.

use crate::core::NodeId;
use std::collections::BTreeSet;

/// The set of currently active nodes of one machine instance.
///
/// Iteration is in document order. A configuration produced by the
/// interpreter is always complete: every active node's ancestors are active
/// and every region of an active parallel node is active.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
    nodes: BTreeSet<NodeId>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, node: NodeId) {
        self.nodes.insert(node);
    }

    pub(crate) fn remove(&mut self, node: NodeId) {
        self.nodes.remove(&node);
    }
}

impl FromIterator<NodeId> for Configuration {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}
