//! The microstep/macrostep loop.

use super::configuration::Configuration;
use super::definition::{Definition, Machine};
use super::error::ExecutionError;
use super::reconfigure::{self, exit_all, Reconfiguration};
use super::resolve::Execution;
use super::select::Selector;
use super::snapshot::{Snapshot, Status};
use crate::core::{Event, HistoryMemory, NodeId, StateValue, TransitionDef, DONE_ACTOR_PREFIX};
use crate::effects::{ActionArgs, Effect};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// One select/reconfigure/execute cycle.
#[derive(Clone, Debug)]
pub struct Microstep {
    /// Event that enabled the transitions.
    pub event: Event,
    /// Exited nodes, in exit order.
    pub exited: Vec<NodeId>,
    /// Entered nodes, in entry order.
    pub entered: Vec<NodeId>,
    pub snapshot: Snapshot,
}

/// Result of processing one external event.
#[derive(Clone, Debug)]
pub struct Macrostep {
    pub snapshot: Snapshot,
    /// Intermediate results in order; the last one carries `snapshot`.
    pub microsteps: Vec<Microstep>,
    /// Work for the actor runtime, in execution order.
    pub effects: Vec<Effect>,
}

impl Macrostep {
    fn unchanged(snapshot: &Snapshot) -> Self {
        Self {
            snapshot: snapshot.clone(),
            microsteps: Vec::new(),
            effects: Vec::new(),
        }
    }

    fn failed(snapshot: &Snapshot, error: ExecutionError) -> Self {
        tracing::debug!(%error, "macrostep aborted");
        Self {
            snapshot: snapshot.with_error(error),
            microsteps: Vec::new(),
            effects: Vec::new(),
        }
    }
}

struct Stepper<'m> {
    machine: &'m Machine,
    definition: &'m Definition,
    configuration: Configuration,
    history: HistoryMemory,
    status: Status,
    output: Option<Value>,
    exec: Execution<'m>,
    microsteps: Vec<Microstep>,
    /// Consecutive eventless microsteps since the last event-driven one.
    eventless_streak: usize,
}

impl<'m> Stepper<'m> {
    fn new(machine: &'m Machine, snapshot: &Snapshot) -> Self {
        Self {
            machine,
            definition: &machine.definition,
            configuration: snapshot.configuration.clone(),
            history: snapshot.history.clone(),
            status: snapshot.status,
            output: snapshot.output.clone(),
            exec: Execution::new(
                machine,
                snapshot.context.clone(),
                snapshot.internal_queue.clone(),
                snapshot.children.clone(),
            ),
            microsteps: Vec::new(),
            eventless_streak: 0,
        }
    }

    fn selector(&self) -> Selector<'m, '_> {
        Selector {
            definition: self.definition,
            implementations: &self.machine.implementations,
            configuration: &self.configuration,
            history: &self.history,
            context: &self.exec.context,
        }
    }

    fn microstep(
        &mut self,
        transitions: &[&'m TransitionDef],
        event: &Event,
    ) -> Result<(), ExecutionError> {
        let plan = reconfigure::reconfigure(
            self.definition,
            &self.configuration,
            &self.history,
            transitions,
        );
        self.apply(plan, transitions, event)
    }

    fn check_limit(&self) -> Result<(), ExecutionError> {
        let limit = self.machine.options.max_microsteps;
        if self.eventless_streak >= limit {
            return Err(ExecutionError::InfiniteEventlessLoop { limit });
        }
        Ok(())
    }

    fn apply(
        &mut self,
        plan: Reconfiguration,
        transitions: &[&'m TransitionDef],
        event: &Event,
    ) -> Result<(), ExecutionError> {
        let definition = self.definition;
        for node in &plan.exit {
            self.exec.run_all(&definition.node(*node).exit, event)?;
        }
        for transition in transitions {
            self.exec.run_all(&transition.actions, event)?;
        }
        let mut done = false;
        for node in &plan.entry {
            let state = definition.node(*node);
            self.exec.run_all(&state.entry, event)?;
            if plan.default_entry.contains(node) {
                if let Some(initial) = &state.initial {
                    self.exec.run_all(&initial.actions, event)?;
                }
            }
            if let Some(history) = plan.history_defaults.get(node) {
                if let Some(default) = &definition.node(*history).initial {
                    self.exec.run_all(&default.actions, event)?;
                }
            }
            if state.is_final() {
                done |= self.final_entered(*node, &plan.next);
            }
        }
        self.configuration = plan.next;
        self.history = plan.history;

        if done {
            self.complete(event)?;
        }
        if self.exec.stop_requested && self.status == Status::Active {
            self.status = Status::Stopped;
            self.exec.internal_queue.clear();
        }

        tracing::debug!(
            event = event.event_type(),
            exited = plan.exit.len(),
            entered = plan.entry.len(),
            "microstep"
        );
        let snapshot = self.snapshot();
        self.microsteps.push(Microstep {
            event: event.clone(),
            exited: plan.exit,
            entered: plan.entry,
            snapshot,
        });
        Ok(())
    }

    /// Queue done events for a newly entered final node. Returns true when
    /// the machine as a whole is done.
    fn final_entered(&mut self, node: NodeId, next: &Configuration) -> bool {
        let definition = self.definition;
        let Some(parent) = definition.node(node).parent else {
            return true;
        };
        if parent == Definition::ROOT {
            return true;
        }
        self.exec
            .internal_queue
            .push_back(Event::done_state(&definition.node(parent).id));
        if let Some(grandparent) = definition.node(parent).parent {
            if definition.node(grandparent).is_parallel()
                && definition.is_in_final_state(grandparent, next)
            {
                if grandparent == Definition::ROOT {
                    return true;
                }
                self.exec
                    .internal_queue
                    .push_back(Event::done_state(&definition.node(grandparent).id));
            }
        }
        false
    }

    /// Top-level completion: compute output, then exit what is left.
    fn complete(&mut self, event: &Event) -> Result<(), ExecutionError> {
        let definition = self.definition;
        let output = match &definition.output {
            Some(resolver) => resolver(&ActionArgs {
                context: &self.exec.context,
                event,
                params: None,
            }),
            None => Value::Null,
        };
        for node in exit_all(&self.configuration) {
            self.exec.run_all(&definition.node(node).exit, event)?;
        }
        self.exec.internal_queue.clear();
        self.output = Some(output);
        self.status = Status::Done;
        Ok(())
    }

    /// Run eventless transitions and drain raised events until stable.
    ///
    /// Eventless selection stops at a fixed point: a microstep that leaves
    /// configuration, history and context as they were. Only consecutive
    /// eventless microsteps count against the cap.
    fn settle(&mut self, event: &Event) -> Result<(), ExecutionError> {
        let mut current = event.clone();
        let mut stable = false;
        while self.status == Status::Active {
            if !stable {
                let eventless = self.selector().select_eventless(&current)?;
                if !eventless.is_empty() {
                    self.check_limit()?;
                    self.eventless_streak += 1;
                    let before = self.state_key();
                    self.microstep(&eventless, &current)?;
                    stable = before == self.state_key();
                    continue;
                }
            }
            let Some(next) = self.exec.internal_queue.pop_front() else {
                break;
            };
            let transitions = self.selector().select(&next)?;
            if !transitions.is_empty() {
                self.eventless_streak = 0;
                self.microstep(&transitions, &next)?;
            }
            stable = false;
            current = next;
        }
        Ok(())
    }

    fn state_key(&self) -> (Configuration, HistoryMemory, Value) {
        (
            self.configuration.clone(),
            self.history.clone(),
            self.exec.context.clone(),
        )
    }

    /// Drop a finished child from the children map. Returns true when one
    /// was removed.
    fn forget_finished_child(&mut self, event: &Event) -> bool {
        event
            .event_type()
            .strip_prefix(DONE_ACTOR_PREFIX)
            .is_some_and(|id| self.exec.children.remove(id).is_some())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            value: self.definition.state_value(&self.configuration),
            context: self.exec.context.clone(),
            status: self.status,
            error: None,
            output: self.output.clone(),
            children: self.exec.children.clone(),
            tags: self.definition.tags(&self.configuration),
            configuration: self.configuration.clone(),
            history: self.history.clone(),
            internal_queue: self.exec.internal_queue.clone(),
        }
    }

    fn finish(self) -> Macrostep {
        let snapshot = self.snapshot();
        Macrostep {
            snapshot,
            microsteps: self.microsteps,
            effects: self.exec.effects,
        }
    }
}

impl Machine {
    fn blank_snapshot(&self, context: Value) -> Snapshot {
        Snapshot {
            value: StateValue::Nested(BTreeMap::new()),
            context,
            status: Status::Active,
            error: None,
            output: None,
            children: BTreeMap::new(),
            tags: Default::default(),
            configuration: Configuration::new(),
            history: HistoryMemory::new(),
            internal_queue: VecDeque::new(),
        }
    }

    /// Enter the initial configuration, running entry actions and settling
    /// eventless transitions and raised events.
    pub fn initial_transition(&self, input: &Value) -> Macrostep {
        let blank = self.blank_snapshot(self.definition.context.create(input));
        let event = Event::init(input);
        let mut stepper = Stepper::new(self, &blank);
        let result = stepper
            .apply(reconfigure::initial(&self.definition), &[], &event)
            .and_then(|()| stepper.settle(&event));
        match result {
            Ok(()) => stepper.finish(),
            Err(error) => Macrostep::failed(&blank, error),
        }
    }

    pub fn initial_snapshot(&self, input: &Value) -> Snapshot {
        self.initial_transition(input).snapshot
    }

    /// Compute the macrostep `event` causes from `snapshot`.
    ///
    /// Pure: nothing outside the returned value is touched. Events sent to
    /// a snapshot that is not active are ignored. An event that enables no
    /// transition returns the snapshot unchanged with no effects. A fatal
    /// error returns the previous snapshot in error status.
    ///
    /// # Example
    ///
    /// ```rust
    /// use statechart::builder::{MachineBuilder, StateConfig, TransitionConfig};
    /// use serde_json::Value;
    ///
    /// let machine = MachineBuilder::new("light")
    ///     .initial("green")
    ///     .state(StateConfig::atomic("green").on("TIMER", TransitionConfig::to("yellow")))
    ///     .state(StateConfig::atomic("yellow"))
    ///     .build()
    ///     .unwrap();
    ///
    /// let start = machine.initial_snapshot(&Value::Null);
    /// let step = machine.transition(&start, &"TIMER".into());
    /// assert!(step.snapshot.matches("yellow"));
    /// ```
    pub fn transition(&self, snapshot: &Snapshot, event: &Event) -> Macrostep {
        if !snapshot.is_active() {
            tracing::debug!(
                event = event.event_type(),
                status = ?snapshot.status,
                "event ignored by inactive snapshot"
            );
            return Macrostep::unchanged(snapshot);
        }
        tracing::debug!(machine = %self.id(), event = event.event_type(), "macrostep");
        let mut stepper = Stepper::new(self, snapshot);
        let forgotten = stepper.forget_finished_child(event);
        let selected = stepper.selector().select(event);
        let result = selected.and_then(|transitions| {
            if transitions.is_empty() {
                return Ok(false);
            }
            stepper.microstep(&transitions, event)?;
            stepper.settle(event)?;
            Ok(true)
        });
        match result {
            Ok(true) => stepper.finish(),
            Ok(false) if forgotten => stepper.finish(),
            Ok(false) => Macrostep::unchanged(snapshot),
            Err(error) => Macrostep::failed(snapshot, error),
        }
    }

    /// Whether `event` would enable any transition from `snapshot`.
    pub fn can(&self, snapshot: &Snapshot, event: &Event) -> bool {
        if !snapshot.is_active() {
            return false;
        }
        let selector = Selector {
            definition: &self.definition,
            implementations: &self.implementations,
            configuration: &snapshot.configuration,
            history: &snapshot.history,
            context: &snapshot.context,
        };
        selector
            .select(event)
            .map(|transitions| !transitions.is_empty())
            .unwrap_or(false)
    }

    /// Build an active snapshot at `value` with the given context, without
    /// running any actions.
    pub fn resolve_state(&self, value: &StateValue, context: Value) -> Result<Snapshot, ExecutionError> {
        let configuration = self.definition.resolve_value(value)?;
        Ok(Snapshot {
            value: self.definition.state_value(&configuration),
            tags: self.definition.tags(&configuration),
            configuration,
            ..self.blank_snapshot(context)
        })
    }
}
