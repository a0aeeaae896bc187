//! Exit and entry set computation.
//!
//! For every selected transition the domain is the node whose active
//! subtree is rebuilt: the source itself for a non-reentering transition
//! that stays inside it, otherwise the least common compound ancestor of
//! the source and its targets (`None` when only the root's parent would
//! do). Exits run subtree by subtree, children before parents, with the
//! last selected transition first. Entries run in document order.

use super::configuration::Configuration;
use super::definition::Definition;
use crate::core::{HistoryKind, HistoryMemory, NodeId, StateKind, TransitionDef};
use std::collections::{BTreeMap, BTreeSet};

/// Collects the nodes a set of transitions enters.
pub(crate) struct EntryBuilder<'a> {
    definition: &'a Definition,
    history: &'a HistoryMemory,
    states: BTreeSet<NodeId>,
    default_entry: BTreeSet<NodeId>,
    history_defaults: BTreeMap<NodeId, NodeId>,
}

impl<'a> EntryBuilder<'a> {
    pub(crate) fn new(definition: &'a Definition, history: &'a HistoryMemory) -> Self {
        Self {
            definition,
            history,
            states: BTreeSet::new(),
            default_entry: BTreeSet::new(),
            history_defaults: BTreeMap::new(),
        }
    }

    /// Enter `id` and whatever it implies below it: initial children of
    /// compound nodes, every region of parallel nodes, remembered or
    /// default children for history pseudo-states.
    pub(crate) fn add_descendants(&mut self, id: NodeId) {
        let definition = self.definition;
        let node = definition.node(id);
        if let StateKind::History(kind) = node.kind {
            let Some(parent) = node.parent else {
                return;
            };
            let restored = match remembered(definition, self.history, parent, kind) {
                Some(nodes) => nodes,
                None => {
                    if node.initial.is_some() {
                        self.history_defaults.insert(parent, id);
                    }
                    history_default(definition, id)
                }
            };
            for target in &restored {
                self.add_descendants(*target);
            }
            for target in restored {
                self.add_ancestors(target, Some(parent));
            }
            return;
        }
        self.states.insert(id);
        self.enter_children(id);
    }

    /// Enter the default children of `id` without entering `id` itself.
    pub(crate) fn enter_children(&mut self, id: NodeId) {
        let definition = self.definition;
        match definition.node(id).kind {
            StateKind::Compound => {
                self.default_entry.insert(id);
                let targets = definition
                    .node(id)
                    .initial
                    .as_ref()
                    .map(|initial| initial.targets.clone())
                    .unwrap_or_default();
                for target in &targets {
                    self.add_descendants(*target);
                }
                for target in targets {
                    self.add_ancestors(target, Some(id));
                }
            }
            StateKind::Parallel => self.fill_regions(id),
            _ => {}
        }
    }

    /// Enter every ancestor of `id` strictly below `domain`.
    pub(crate) fn add_ancestors(&mut self, id: NodeId, domain: Option<NodeId>) {
        let definition = self.definition;
        for ancestor in definition.proper_ancestors(id) {
            if Some(ancestor) == domain {
                break;
            }
            self.states.insert(ancestor);
            if definition.node(ancestor).is_parallel() {
                self.fill_regions(ancestor);
            }
        }
    }

    fn fill_regions(&mut self, parallel: NodeId) {
        let definition = self.definition;
        for region in definition.regions(parallel).collect::<Vec<_>>() {
            let covered = self
                .states
                .iter()
                .any(|state| definition.is_self_or_descendant(*state, region));
            if !covered {
                self.add_descendants(region);
            }
        }
    }

    pub(crate) fn into_states(self) -> BTreeSet<NodeId> {
        self.states
    }
}

fn history_default(definition: &Definition, history: NodeId) -> Vec<NodeId> {
    let node = definition.node(history);
    let own = node
        .initial
        .as_ref()
        .map(|initial| initial.targets.clone())
        .filter(|targets| !targets.is_empty());
    own.or_else(|| {
        node.parent
            .and_then(|parent| definition.node(parent).initial.as_ref())
            .map(|initial| initial.targets.clone())
    })
    .unwrap_or_default()
}

/// Nodes a history pseudo-state of `parent` restores, if `parent` ever exited.
fn remembered(
    definition: &Definition,
    history: &HistoryMemory,
    parent: NodeId,
    kind: HistoryKind,
) -> Option<Vec<NodeId>> {
    let leaves: Vec<NodeId> = history
        .get(&definition.node(parent).id)?
        .iter()
        .filter_map(|state_id| definition.lookup(state_id))
        .collect();
    if leaves.is_empty() {
        return None;
    }
    match kind {
        HistoryKind::Deep => Some(leaves),
        HistoryKind::Shallow => {
            let children: BTreeSet<NodeId> = leaves
                .iter()
                .filter_map(|leaf| {
                    definition
                        .regions(parent)
                        .find(|child| definition.is_self_or_descendant(*leaf, *child))
                })
                .collect();
            Some(children.into_iter().collect())
        }
    }
}

/// Targets with history pseudo-states replaced by what they restore.
pub(crate) fn effective_targets(
    definition: &Definition,
    history: &HistoryMemory,
    transition: &TransitionDef,
) -> Vec<NodeId> {
    let mut targets = Vec::new();
    for target in &transition.targets {
        match definition.node(*target).kind {
            StateKind::History(kind) => {
                let parent = definition.node(*target).parent;
                let restored = parent
                    .and_then(|parent| remembered(definition, history, parent, kind))
                    .unwrap_or_else(|| history_default(definition, *target));
                targets.extend(restored);
            }
            _ => targets.push(*target),
        }
    }
    targets
}

/// Domain of a targeted transition; `None` means above the root.
pub(crate) fn transition_domain(
    definition: &Definition,
    history: &HistoryMemory,
    transition: &TransitionDef,
) -> Option<NodeId> {
    let source = transition.source;
    let targets = effective_targets(definition, history, transition);
    if !transition.reenter
        && targets
            .iter()
            .all(|target| definition.is_self_or_descendant(*target, source))
    {
        return Some(source);
    }
    definition.proper_ancestors(source).find(|ancestor| {
        (definition.node(*ancestor).is_compound() || *ancestor == Definition::ROOT)
            && targets
                .iter()
                .all(|target| definition.is_descendant(*target, *ancestor))
    })
}

/// Active nodes a transition exits, children before parents.
pub(crate) fn exit_set(
    definition: &Definition,
    configuration: &Configuration,
    history: &HistoryMemory,
    transition: &TransitionDef,
) -> Vec<NodeId> {
    let mut exits = Vec::new();
    if transition.targets.is_empty() {
        return exits;
    }
    match transition_domain(definition, history, transition) {
        Some(domain) => collect_active(definition, configuration, domain, &mut exits),
        None => {
            collect_active(definition, configuration, Definition::ROOT, &mut exits);
            exits.push(Definition::ROOT);
        }
    }
    exits
}

/// Every active node in reverse document order: later regions first,
/// children before parents, root last.
pub(crate) fn exit_all(configuration: &Configuration) -> Vec<NodeId> {
    let mut exits: Vec<NodeId> = configuration.iter().collect();
    exits.reverse();
    exits
}

fn collect_active(
    definition: &Definition,
    configuration: &Configuration,
    id: NodeId,
    out: &mut Vec<NodeId>,
) {
    for child in &definition.node(id).children {
        if configuration.contains(*child) {
            collect_active(definition, configuration, *child, out);
            out.push(*child);
        }
    }
}

/// Outcome of one microstep's reconfiguration.
#[derive(Debug, Default)]
pub(crate) struct Reconfiguration {
    /// Nodes to exit, in exit-action order.
    pub(crate) exit: Vec<NodeId>,
    /// Nodes to enter, in document order.
    pub(crate) entry: Vec<NodeId>,
    /// Compound nodes entered through their initial transition.
    pub(crate) default_entry: BTreeSet<NodeId>,
    /// Parent node -> history pseudo-state whose default transition fired.
    pub(crate) history_defaults: BTreeMap<NodeId, NodeId>,
    pub(crate) next: Configuration,
    pub(crate) history: HistoryMemory,
}

/// Entry from an empty configuration into the machine's initial state.
pub(crate) fn initial(definition: &Definition) -> Reconfiguration {
    let history = HistoryMemory::new();
    let mut builder = EntryBuilder::new(definition, &history);
    builder.add_descendants(Definition::ROOT);
    let default_entry = std::mem::take(&mut builder.default_entry);
    let history_defaults = std::mem::take(&mut builder.history_defaults);
    let states = builder.into_states();
    Reconfiguration {
        exit: Vec::new(),
        entry: states.iter().copied().collect(),
        default_entry,
        history_defaults,
        next: states.into_iter().collect(),
        history,
    }
}

pub(crate) fn reconfigure(
    definition: &Definition,
    configuration: &Configuration,
    history: &HistoryMemory,
    transitions: &[&TransitionDef],
) -> Reconfiguration {
    let mut exit = Vec::new();
    let mut exiting = BTreeSet::new();
    for transition in transitions.iter().rev() {
        for node in exit_set(definition, configuration, history, transition) {
            if exiting.insert(node) {
                exit.push(node);
            }
        }
    }

    let mut builder = EntryBuilder::new(definition, history);
    for transition in transitions {
        if transition.targets.is_empty() {
            continue;
        }
        let domain = transition_domain(definition, history, transition);
        for target in &transition.targets {
            if Some(*target) == domain && !transition.reenter {
                builder.enter_children(*target);
            } else {
                builder.add_descendants(*target);
            }
        }
        for target in effective_targets(definition, history, transition) {
            if Some(target) != domain {
                builder.add_ancestors(target, domain);
            }
        }
    }
    let default_entry = std::mem::take(&mut builder.default_entry);
    let history_defaults = std::mem::take(&mut builder.history_defaults);
    let staying: BTreeSet<NodeId> = configuration
        .iter()
        .filter(|node| !exiting.contains(node))
        .collect();
    let entry: Vec<NodeId> = builder
        .into_states()
        .into_iter()
        .filter(|node| !staying.contains(node))
        .collect();

    let mut memory = history.clone();
    for node in &exit {
        let exited = definition.node(*node);
        if exited.is_compound() || exited.is_parallel() {
            let leaves = definition
                .atomic_leaves(configuration)
                .filter(|leaf| definition.is_descendant(*leaf, *node))
                .map(|leaf| definition.node(leaf).id.clone())
                .collect();
            memory = memory.record(exited.id.clone(), leaves);
        }
    }

    let next = staying.iter().chain(entry.iter()).copied().collect();
    Reconfiguration {
        exit,
        entry,
        default_entry,
        history_defaults,
        next,
        history: memory,
    }
}
