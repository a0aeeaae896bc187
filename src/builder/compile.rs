//! Compilation of a [`StateConfig`] tree into the node arena.
//!
//! All problems are accumulated with `Validation` before failing, so a
//! broken definition reports every unresolved target and misplaced state in
//! one go.

use super::error::BuildError;
use super::state::StateConfig;
use super::transition::TransitionConfig;
use crate::core::{
    escape_key, to_state_path, AfterDef, Event, InvokeDef, NodeId, StateKind, StateNode,
    TransitionDef, AFTER_PREFIX, ANCESTOR_PREFIX, DONE_ACTOR_PREFIX, DONE_STATE_PREFIX,
    ID_PREFIX,
};
use crate::effects::{Action, EventExpr};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check<T> = Validation<T, NonEmptyVec<BuildError>>;

/// Arena plus id table produced by a successful compilation.
pub(crate) struct Compiled {
    pub(crate) nodes: Vec<StateNode>,
    pub(crate) ids: HashMap<String, NodeId>,
}

pub(crate) fn compile(machine_id: &str, root: &StateConfig) -> Result<Compiled, BuildError> {
    let mut skeleton = Skeleton::default();
    skeleton.add(root, None, machine_id);

    let mut errors = Vec::new();
    collect(skeleton.structural_checks(), &mut errors);

    let nodes: Vec<StateNode> = skeleton
        .configs
        .iter()
        .enumerate()
        .filter_map(|(index, config)| skeleton.compile_node(NodeId(index), config, &mut errors))
        .collect();

    if !errors.is_empty() {
        return Err(BuildError::from_all(errors));
    }
    Ok(Compiled {
        nodes,
        ids: skeleton.ids,
    })
}

fn collect<T>(check: Check<T>, errors: &mut Vec<BuildError>) -> Option<T> {
    match check {
        Validation::Success(value) => Some(value),
        Validation::Failure(failures) => {
            errors.extend(failures.iter().cloned());
            None
        }
    }
}

/// Tree shape (ids, keys, parent links) known before any target resolves.
#[derive(Default)]
struct Skeleton<'c> {
    configs: Vec<&'c StateConfig>,
    state_ids: Vec<String>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    depths: Vec<usize>,
    ids: HashMap<String, NodeId>,
    duplicates: Vec<String>,
}

impl<'c> Skeleton<'c> {
    fn add(&mut self, config: &'c StateConfig, parent: Option<NodeId>, machine_id: &str) {
        let index = NodeId(self.configs.len());
        let state_id = match (&config.id, parent) {
            (Some(explicit), _) => explicit.clone(),
            (None, None) => machine_id.to_string(),
            (None, Some(parent)) => format!(
                "{}.{}",
                self.state_ids[parent.0],
                escape_key(&config.key)
            ),
        };
        if self.ids.contains_key(&state_id) {
            self.duplicates.push(state_id.clone());
        } else {
            self.ids.insert(state_id.clone(), index);
        }
        self.configs.push(config);
        self.state_ids.push(state_id);
        self.parents.push(parent);
        self.children.push(Vec::new());
        self.depths
            .push(parent.map_or(0, |parent| self.depths[parent.0] + 1));
        if let Some(parent) = parent {
            self.children[parent.0].push(index);
        }
        for child in &config.states {
            self.add(child, Some(index), machine_id);
        }
    }

    fn structural_checks(&self) -> Check<()> {
        let mut checks: Vec<Check<()>> = Vec::new();

        for id in &self.duplicates {
            checks.push(Validation::fail(BuildError::DuplicateStateId { id: id.clone() }));
        }

        for (index, config) in self.configs.iter().enumerate() {
            let state = self.state_ids[index].clone();
            let kind = config.resolved_kind();
            let has_children = !config.states.is_empty();
            let check = match kind {
                StateKind::History(_) if self.parents[index].is_none() => {
                    Validation::fail(BuildError::HistoryWithoutParent { state })
                }
                StateKind::Atomic | StateKind::Final | StateKind::History(_) if has_children => {
                    Validation::fail(BuildError::InvalidStateKind {
                        state,
                        reason: format!("{kind:?} states cannot have child states"),
                    })
                }
                StateKind::Final if self.parents[index].is_none() => {
                    Validation::fail(BuildError::InvalidStateKind {
                        state,
                        reason: "the root cannot be a final state".to_string(),
                    })
                }
                StateKind::Compound | StateKind::Parallel if !has_children => {
                    Validation::fail(BuildError::InvalidStateKind {
                        state,
                        reason: format!("{kind:?} states need at least one child state"),
                    })
                }
                StateKind::Compound if config.initial.is_none() => {
                    Validation::fail(BuildError::MissingInitialState { state })
                }
                _ => Validation::success(()),
            };
            checks.push(check);
        }

        Validation::all_vec(checks).map(|_| ())
    }

    fn key(&self, id: NodeId) -> &str {
        &self.configs[id.0].key
    }

    fn descend(&self, start: NodeId, segments: &[String]) -> Option<NodeId> {
        segments.iter().try_fold(start, |current, segment| {
            self.children[current.0]
                .iter()
                .copied()
                .find(|child| self.key(*child) == segment.as_str())
        })
    }

    /// Resolve a target specifier written on `source`.
    fn resolve(&self, source: NodeId, specifier: &str) -> Option<NodeId> {
        if let Some(reference) = specifier.strip_prefix(ID_PREFIX) {
            if let Some(id) = self.ids.get(reference) {
                return Some(*id);
            }
            let segments = to_state_path(reference);
            let (first, path) = segments.split_first()?;
            let start = self.ids.get(first)?;
            return self.descend(*start, path);
        }
        if let Some(relative) = specifier.strip_prefix('.') {
            return self.descend(source, &to_state_path(relative));
        }
        let hops = specifier.chars().take_while(|c| *c == ANCESTOR_PREFIX).count();
        let path = &specifier[hops * ANCESTOR_PREFIX.len_utf8()..];
        let mut base = self.parents[source.0].unwrap_or(source);
        for _ in 0..hops {
            base = self.parents[base.0]?;
        }
        self.descend(base, &to_state_path(path))
    }

    fn resolve_targets(&self, source: NodeId, specs: &[String]) -> Check<Vec<NodeId>> {
        let checks: Vec<Check<NodeId>> = specs
            .iter()
            .map(|specifier| match self.resolve(source, specifier) {
                Some(target) => Validation::success(target),
                None => Validation::fail(BuildError::UnresolvedTarget {
                    state: self.state_ids[source.0].clone(),
                    target: specifier.clone(),
                }),
            })
            .collect();
        Validation::all_vec(checks)
    }

    fn transition(
        &self,
        source: NodeId,
        event_type: Option<&str>,
        config: &TransitionConfig,
    ) -> Check<TransitionDef> {
        self.resolve_targets(source, &config.targets)
            .map(|targets| {
                let targets = if targets.is_empty() && config.reenter {
                    vec![source]
                } else {
                    targets
                };
                TransitionDef {
                    source,
                    event_type: event_type.map(str::to_string),
                    guard: config.guard.clone(),
                    targets,
                    reenter: config.reenter,
                    actions: config.actions.clone(),
                }
            })
    }

    fn initial(&self, index: NodeId, config: &StateConfig) -> Check<Option<TransitionDef>> {
        match config.resolved_kind() {
            StateKind::Compound => {
                let Some(specifier) = &config.initial else {
                    // reported by the structural checks
                    return Validation::success(None);
                };
                let resolved = if specifier.starts_with(ID_PREFIX) {
                    self.resolve(index, specifier)
                } else {
                    self.descend(index, &to_state_path(specifier))
                };
                match resolved {
                    Some(target) if self.is_descendant(target, index) => {
                        Validation::success(Some(TransitionDef {
                            source: index,
                            event_type: None,
                            guard: None,
                            targets: vec![target],
                            reenter: false,
                            actions: config.initial_actions.clone(),
                        }))
                    }
                    _ => Validation::fail(BuildError::InvalidInitial {
                        state: self.state_ids[index.0].clone(),
                        target: specifier.clone(),
                    }),
                }
            }
            StateKind::History(_) => match &config.target {
                Some(default) => self.transition(index, None, default).map(Some),
                None => Validation::success(None),
            },
            _ => Validation::success(None),
        }
    }

    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.parents[node.0];
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parents[parent.0];
        }
        false
    }

    /// Compile one node; problems are appended to `errors`.
    fn compile_node(
        &self,
        index: NodeId,
        config: &StateConfig,
        errors: &mut Vec<BuildError>,
    ) -> Option<StateNode> {
        let state_id = &self.state_ids[index.0];
        let mut entry = config.entry.clone();
        let mut exit = config.exit.clone();

        // (event type, declaration) pairs in priority order
        let mut handlers: Vec<(String, &TransitionConfig)> = config
            .on
            .iter()
            .map(|(event_type, transition)| (event_type.clone(), transition))
            .collect();

        let mut after = Vec::new();
        for (delay, transition) in &config.after {
            let event_type = format!("{AFTER_PREFIX}{}.{state_id}", delay.label());
            entry.push(Action::Raise {
                event: EventExpr::Static(Event::new(event_type.clone())),
                delay: Some(delay.clone()),
                id: Some(event_type.clone()),
            });
            exit.push(Action::Cancel(event_type.clone()));
            handlers.push((event_type.clone(), transition));
            after.push(AfterDef {
                delay: delay.clone(),
                event_type,
            });
        }

        for transition in &config.on_done {
            handlers.push((format!("{DONE_STATE_PREFIX}{state_id}"), transition));
        }

        let mut invoke = Vec::new();
        for invocation in &config.invoke {
            entry.push(Action::Spawn {
                src: invocation.src.clone(),
                id: invocation.id.clone(),
                input: invocation.input.clone(),
            });
            exit.push(Action::StopChild(invocation.id.clone()));
            for transition in &invocation.on_done {
                handlers.push((format!("{DONE_ACTOR_PREFIX}{}", invocation.id), transition));
            }
            invoke.push(InvokeDef {
                id: invocation.id.clone(),
                src: invocation.src.clone(),
                input: invocation.input.clone(),
            });
        }

        let on_checks: Vec<Check<TransitionDef>> = handlers
            .iter()
            .map(|(event_type, transition)| {
                self.transition(index, Some(event_type.as_str()), transition)
            })
            .collect();
        let always_checks: Vec<Check<TransitionDef>> = config
            .always
            .iter()
            .map(|transition| self.transition(index, None, transition))
            .collect();

        let on_defs = collect(Validation::all_vec(on_checks), errors);
        let always = collect(Validation::all_vec(always_checks), errors);
        let initial = collect(self.initial(index, config), errors);

        let mut on: HashMap<String, Vec<TransitionDef>> = HashMap::new();
        for definition in on_defs? {
            let event_type = definition.event_type.clone().unwrap_or_default();
            on.entry(event_type).or_default().push(definition);
        }
        Some(StateNode {
            index,
            id: state_id.clone(),
            key: config.key.clone(),
            kind: config.resolved_kind(),
            parent: self.parents[index.0],
            children: self.children[index.0].clone(),
            depth: self.depths[index.0],
            entry,
            exit,
            on,
            always: always?,
            initial: initial?,
            after,
            invoke,
            tags: config.tags.clone(),
        })
    }
}
