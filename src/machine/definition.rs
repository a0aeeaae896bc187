//! Compiled machine definitions and the tree queries the interpreter uses.

use super::configuration::Configuration;
use super::error::ExecutionError;
use super::implementations::Implementations;
use super::options::MachineOptions;
use super::reconfigure::EntryBuilder;
use crate::core::{HistoryMemory, NodeId, StateKind, StateNode, StateValue, ID_PREFIX};
use crate::effects::ValueResolver;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Builds the initial context from spawn input.
pub type ContextFactory = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// How a fresh instance obtains its context.
#[derive(Clone)]
pub enum ContextInit {
    Static(Value),
    FromInput(ContextFactory),
}

impl ContextInit {
    pub(crate) fn create(&self, input: &Value) -> Value {
        match self {
            ContextInit::Static(value) => value.clone(),
            ContextInit::FromInput(factory) => factory(input),
        }
    }
}

impl Default for ContextInit {
    fn default() -> Self {
        ContextInit::Static(Value::Object(serde_json::Map::new()))
    }
}

/// The immutable node arena of one machine.
///
/// Node 0 is the root; every other node's parent has a smaller index.
pub struct Definition {
    pub(crate) id: String,
    pub(crate) nodes: Vec<StateNode>,
    pub(crate) ids: HashMap<String, NodeId>,
    pub(crate) context: ContextInit,
    pub(crate) output: Option<ValueResolver>,
}

impl Definition {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn node(&self, id: NodeId) -> &StateNode {
        &self.nodes[id.0]
    }

    pub(crate) fn lookup(&self, state_id: &str) -> Option<NodeId> {
        self.ids.get(state_id).copied()
    }

    /// Parent chain of `id`, nearest first, root last.
    pub(crate) fn proper_ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |current| {
            self.node(*current).parent
        })
    }

    /// Strict descendant test.
    pub(crate) fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.proper_ancestors(node).any(|candidate| candidate == ancestor)
    }

    pub(crate) fn is_self_or_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        node == ancestor || self.is_descendant(node, ancestor)
    }

    /// Children that can be active (history pseudo-states excluded).
    pub(crate) fn regions(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(move |child| !self.node(*child).is_history())
    }

    fn child_by_key(&self, parent: NodeId, key: &str) -> Result<NodeId, ExecutionError> {
        self.regions(parent)
            .find(|child| self.node(*child).key == key)
            .ok_or_else(|| ExecutionError::InvalidStateValue {
                reason: format!("'{}' has no child state '{key}'", self.node(parent).id),
            })
    }

    /// Active atomic nodes in document order.
    pub(crate) fn atomic_leaves<'a>(
        &'a self,
        configuration: &'a Configuration,
    ) -> impl Iterator<Item = NodeId> + 'a {
        configuration
            .iter()
            .filter(move |id| self.node(*id).is_atomic())
    }

    /// Whether a compound or parallel node has completed in `configuration`.
    pub(crate) fn is_in_final_state(&self, id: NodeId, configuration: &Configuration) -> bool {
        let node = self.node(id);
        match node.kind {
            StateKind::Compound => self
                .regions(id)
                .any(|child| configuration.contains(child) && self.node(child).is_final()),
            StateKind::Parallel => self
                .regions(id)
                .all(|region| self.is_in_final_state(region, configuration)),
            StateKind::Final => true,
            _ => false,
        }
    }

    pub(crate) fn state_value(&self, configuration: &Configuration) -> StateValue {
        self.value_of(Self::ROOT, configuration)
    }

    fn value_of(&self, id: NodeId, configuration: &Configuration) -> StateValue {
        let node = self.node(id);
        match node.kind {
            StateKind::Compound => {
                let active = self.regions(id).find(|child| configuration.contains(*child));
                match active {
                    Some(child) if self.node(child).is_atomic() => {
                        StateValue::Leaf(self.node(child).key.clone())
                    }
                    Some(child) => StateValue::Nested(BTreeMap::from([(
                        self.node(child).key.clone(),
                        self.value_of(child, configuration),
                    )])),
                    None => StateValue::Nested(BTreeMap::new()),
                }
            }
            StateKind::Parallel => StateValue::Nested(
                self.regions(id)
                    .filter(|region| configuration.contains(*region))
                    .map(|region| {
                        (
                            self.node(region).key.clone(),
                            self.value_of(region, configuration),
                        )
                    })
                    .collect(),
            ),
            _ => StateValue::Nested(BTreeMap::new()),
        }
    }

    pub(crate) fn tags(&self, configuration: &Configuration) -> BTreeSet<String> {
        configuration
            .iter()
            .flat_map(|id| self.node(id).tags.iter().cloned())
            .collect()
    }

    /// Whether `state` (`#id` or a value path) is active.
    pub(crate) fn is_active(&self, configuration: &Configuration, state: &str) -> bool {
        match state.strip_prefix(ID_PREFIX) {
            Some(state_id) => self
                .lookup(state_id)
                .is_some_and(|id| configuration.contains(id)),
            None => self
                .state_value(configuration)
                .matches(&StateValue::from_path(state)),
        }
    }

    /// Turn an external state value into a complete configuration.
    /// Compound nodes the value leaves unspecified are completed with their
    /// initial descendants.
    pub(crate) fn resolve_value(&self, value: &StateValue) -> Result<Configuration, ExecutionError> {
        let mut nodes = BTreeSet::new();
        self.resolve_into(Self::ROOT, Some(value), &mut nodes)?;
        Ok(nodes.into_iter().collect())
    }

    fn resolve_into(
        &self,
        id: NodeId,
        value: Option<&StateValue>,
        out: &mut BTreeSet<NodeId>,
    ) -> Result<(), ExecutionError> {
        out.insert(id);
        let node = self.node(id);
        let invalid = |reason: String| ExecutionError::InvalidStateValue { reason };
        match (node.kind, value) {
            (StateKind::Compound | StateKind::Parallel, None) => {
                let memory = HistoryMemory::new();
                let mut entry = EntryBuilder::new(self, &memory);
                entry.add_descendants(id);
                out.extend(entry.into_states());
                Ok(())
            }
            (StateKind::Compound, Some(StateValue::Leaf(key))) => {
                let child = self.child_by_key(id, key)?;
                self.resolve_into(child, None, out)
            }
            (StateKind::Compound, Some(StateValue::Nested(map))) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((key, nested)), None) => {
                        let child = self.child_by_key(id, key)?;
                        self.resolve_into(child, Some(nested), out)
                    }
                    _ => Err(invalid(format!(
                        "compound state '{}' needs exactly one active child",
                        node.id
                    ))),
                }
            }
            (StateKind::Parallel, Some(StateValue::Nested(map))) => {
                for key in map.keys() {
                    self.child_by_key(id, key)?;
                }
                for region in self.regions(id).collect::<Vec<_>>() {
                    self.resolve_into(region, map.get(&self.node(region).key), out)?;
                }
                Ok(())
            }
            (StateKind::Parallel, Some(StateValue::Leaf(key))) => Err(invalid(format!(
                "parallel state '{}' cannot be given the single child '{key}'",
                node.id
            ))),
            (_, None) => Ok(()),
            (_, Some(StateValue::Nested(map))) if map.is_empty() => Ok(()),
            (_, Some(_)) => Err(invalid(format!(
                "atomic state '{}' has no children",
                node.id
            ))),
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("id", &self.id)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// A compiled, immutable machine: definition plus implementations.
///
/// Cloning is cheap; the node arena is shared.
#[derive(Clone)]
pub struct Machine {
    pub(crate) definition: Arc<Definition>,
    pub(crate) implementations: Implementations,
    pub(crate) options: MachineOptions,
}

impl Machine {
    pub(crate) fn from_definition(definition: Definition) -> Self {
        Self {
            definition: Arc::new(definition),
            implementations: Implementations::default(),
            options: MachineOptions::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn root(&self) -> &StateNode {
        self.definition.node(Definition::ROOT)
    }

    pub fn node(&self, id: NodeId) -> Option<&StateNode> {
        self.definition.nodes.get(id.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StateNode> {
        self.definition.nodes.iter()
    }

    pub fn get_node_by_id(&self, state_id: &str) -> Option<&StateNode> {
        self.definition
            .lookup(state_id)
            .map(|id| self.definition.node(id))
    }

    pub fn implementations(&self) -> &Implementations {
        &self.implementations
    }

    pub fn options(&self) -> &MachineOptions {
        &self.options
    }

    /// Return a machine whose implementations are overridden by `overrides`.
    pub fn provide(&self, overrides: Implementations) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            implementations: self.implementations.clone().merge(overrides),
            options: self.options.clone(),
        }
    }

    pub fn with_options(&self, options: MachineOptions) -> Self {
        Self {
            definition: Arc::clone(&self.definition),
            implementations: self.implementations.clone(),
            options,
        }
    }

    /// Resolve an external state value into a complete configuration.
    pub fn resolve(&self, value: &StateValue) -> Result<Configuration, ExecutionError> {
        self.definition.resolve_value(value)
    }

    /// The configuration a fresh instance enters.
    pub fn initial_configuration(&self) -> Configuration {
        let memory = HistoryMemory::new();
        let mut entry = EntryBuilder::new(&self.definition, &memory);
        entry.add_descendants(Definition::ROOT);
        entry.into_states().into_iter().collect()
    }

    pub fn state_value(&self, configuration: &Configuration) -> StateValue {
        self.definition.state_value(configuration)
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("id", &self.definition.id)
            .field("implementations", &self.implementations)
            .field("options", &self.options)
            .finish()
    }
}
