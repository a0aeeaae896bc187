//! Compiled state nodes.
//!
//! A machine definition is an arena of [`StateNode`]s indexed by [`NodeId`].
//! Ids are assigned in document (pre-)order, so comparing two `NodeId`s
//! compares their document positions. Parent links are plain indices into
//! the same arena and never own anything.

use super::guard::Guard;
use crate::effects::{Action, Delay};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Index of a node in its machine's arena; doubles as document order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Which descendants a history pseudo-state restores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryKind {
    Shallow,
    Deep,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Atomic,
    Compound,
    Parallel,
    Final,
    History(HistoryKind),
}

/// A transition alternative with its targets resolved to nodes.
#[derive(Clone)]
pub struct TransitionDef {
    pub(crate) source: NodeId,
    pub(crate) event_type: Option<String>,
    pub(crate) guard: Option<Guard>,
    pub(crate) targets: Vec<NodeId>,
    pub(crate) reenter: bool,
    pub(crate) actions: Vec<Action>,
}

impl TransitionDef {
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// `None` for eventless and initial transitions.
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn is_reentering(&self) -> bool {
        self.reenter
    }

    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }
}

impl fmt::Debug for TransitionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDef")
            .field("source", &self.source)
            .field("event_type", &self.event_type)
            .field("targets", &self.targets)
            .field("reenter", &self.reenter)
            .field("guarded", &self.guard.is_some())
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// A delayed (`after`) transition bucket on a node.
#[derive(Clone, Debug)]
pub struct AfterDef {
    pub delay: Delay,
    /// Internal event type the delayed raise uses; also its cancellation id.
    pub event_type: String,
}

/// An actor invoked for the lifetime of its state.
#[derive(Clone, Debug)]
pub struct InvokeDef {
    pub id: String,
    pub src: String,
    pub input: Option<Value>,
}

/// A node of the immutable definition tree.
pub struct StateNode {
    pub(crate) index: NodeId,
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) kind: StateKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) depth: usize,
    pub(crate) entry: Vec<Action>,
    pub(crate) exit: Vec<Action>,
    pub(crate) on: HashMap<String, Vec<TransitionDef>>,
    pub(crate) always: Vec<TransitionDef>,
    /// Initial transition of a compound node, or default target of a
    /// history node.
    pub(crate) initial: Option<TransitionDef>,
    pub(crate) after: Vec<AfterDef>,
    pub(crate) invoke: Vec<InvokeDef>,
    pub(crate) tags: Vec<String>,
}

impl StateNode {
    pub fn node_id(&self) -> NodeId {
        self.index
    }

    /// Globally unique id (explicit, or the escaped dot-path from the root).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> StateKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn entry_actions(&self) -> &[Action] {
        &self.entry
    }

    pub fn exit_actions(&self) -> &[Action] {
        &self.exit
    }

    pub fn initial_transition(&self) -> Option<&TransitionDef> {
        self.initial.as_ref()
    }

    pub fn after(&self) -> &[AfterDef] {
        &self.after
    }

    pub fn invocations(&self) -> &[InvokeDef] {
        &self.invoke
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, StateKind::Atomic | StateKind::Final)
    }

    pub fn is_compound(&self) -> bool {
        self.kind == StateKind::Compound
    }

    pub fn is_parallel(&self) -> bool {
        self.kind == StateKind::Parallel
    }

    pub fn is_final(&self) -> bool {
        self.kind == StateKind::Final
    }

    pub fn is_history(&self) -> bool {
        matches!(self.kind, StateKind::History(_))
    }

    /// Event types this node declares a handler for, wildcard included.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.on.keys().map(String::as_str)
    }

    /// Candidate alternatives for an event type: an exact entry wins over
    /// the wildcard bucket. `None` means the node has no handler at all.
    pub fn candidates(&self, event_type: &str) -> Option<&[TransitionDef]> {
        self.on
            .get(event_type)
            .or_else(|| self.on.get(super::event::WILDCARD))
            .map(Vec::as_slice)
    }

    pub fn eventless(&self) -> Option<&[TransitionDef]> {
        if self.always.is_empty() {
            None
        } else {
            Some(&self.always)
        }
    }
}

impl fmt::Debug for StateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}
