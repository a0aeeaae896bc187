//! Transition selection.
//!
//! Each active atomic node searches upward for the innermost node that
//! handles the event. Only a node without any handler defers to its
//! parent: a handler whose guards all fail ends the search for that leaf.

use super::configuration::Configuration;
use super::definition::Definition;
use super::error::ExecutionError;
use super::implementations::Implementations;
use super::reconfigure::exit_set;
use crate::core::{Event, GuardEnv, HistoryMemory, NodeId, StateNode, TransitionDef};
use serde_json::Value;
use std::collections::BTreeSet;

/// Read-only view of an instance used while choosing transitions.
pub(crate) struct Selector<'m, 's> {
    pub(crate) definition: &'m Definition,
    pub(crate) implementations: &'m Implementations,
    pub(crate) configuration: &'s Configuration,
    pub(crate) history: &'s HistoryMemory,
    pub(crate) context: &'s Value,
}

impl<'m, 's> Selector<'m, 's> {
    /// Transitions enabled by `event`, at most one per region.
    pub(crate) fn select(&self, event: &Event) -> Result<Vec<&'m TransitionDef>, ExecutionError> {
        self.select_with(event, |node| node.candidates(event.event_type()))
    }

    /// Enabled eventless transitions, guards evaluated against `event`.
    pub(crate) fn select_eventless(
        &self,
        event: &Event,
    ) -> Result<Vec<&'m TransitionDef>, ExecutionError> {
        self.select_with(event, StateNode::eventless)
    }

    fn select_with<F>(
        &self,
        event: &Event,
        handlers: F,
    ) -> Result<Vec<&'m TransitionDef>, ExecutionError>
    where
        F: Fn(&'m StateNode) -> Option<&'m [TransitionDef]>,
    {
        let definition = self.definition;
        let mut enabled: Vec<&'m TransitionDef> = Vec::new();
        for leaf in definition.atomic_leaves(self.configuration) {
            let chain = std::iter::once(leaf).chain(definition.proper_ancestors(leaf));
            for id in chain {
                let Some(candidates) = handlers(definition.node(id)) else {
                    continue;
                };
                if let Some(chosen) = self.first_enabled(candidates, event)? {
                    if !enabled.iter().any(|existing| std::ptr::eq(*existing, chosen)) {
                        enabled.push(chosen);
                    }
                }
                break;
            }
        }
        Ok(self.remove_conflicting(enabled))
    }

    fn first_enabled(
        &self,
        candidates: &'m [TransitionDef],
        event: &Event,
    ) -> Result<Option<&'m TransitionDef>, ExecutionError> {
        let in_state = |state: &str| self.definition.is_active(self.configuration, state);
        let env = GuardEnv {
            context: self.context,
            event,
            guards: &self.implementations.guards,
            in_state: &in_state,
        };
        for candidate in candidates {
            let passes = match &candidate.guard {
                Some(guard) => guard.check(&env)?,
                None => true,
            };
            if passes {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Drop transitions whose exit sets collide with an earlier one. A
    /// transition from a descendant of the earlier source wins instead.
    fn remove_conflicting(&self, enabled: Vec<&'m TransitionDef>) -> Vec<&'m TransitionDef> {
        let mut kept: Vec<(&'m TransitionDef, BTreeSet<NodeId>)> = Vec::new();
        for transition in enabled {
            let exits: BTreeSet<NodeId> =
                exit_set(self.definition, self.configuration, self.history, transition)
                    .into_iter()
                    .collect();
            let mut preempted = false;
            let mut displaced = Vec::new();
            for (index, (other, other_exits)) in kept.iter().enumerate() {
                if exits.is_disjoint(other_exits) {
                    continue;
                }
                if self.definition.is_descendant(transition.source, other.source) {
                    displaced.push(index);
                } else {
                    preempted = true;
                    break;
                }
            }
            if preempted {
                tracing::debug!(
                    source = %self.definition.node(transition.source).id,
                    "transition preempted by an earlier region"
                );
                continue;
            }
            for index in displaced.into_iter().rev() {
                kept.remove(index);
            }
            kept.push((transition, exits));
        }
        kept.into_iter().map(|(transition, _)| transition).collect()
    }
}
