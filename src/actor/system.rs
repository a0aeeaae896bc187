//! The actor system: mailboxes, delivery, timers and lifecycle.

use super::actor_ref::ActorRef;
use super::clock::{Clock, SystemClock};
use super::inspect::{InspectionEvent, Inspector, Subscriber, Warning};
use super::scheduler::Scheduler;
use crate::core::Event;
use crate::effects::{Effect, Recipient};
use crate::machine::{Machine, Macrostep, Snapshot, Status};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Runtime configuration of an [`ActorSystem`].
#[derive(Clone)]
pub struct SystemOptions {
    pub clock: Arc<dyn Clock>,
}

impl SystemOptions {
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
        }
    }
}

impl Default for SystemOptions {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl fmt::Debug for SystemOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemOptions")
            .field("now", &self.clock.now())
            .finish()
    }
}

struct ActorCell {
    actor_ref: ActorRef,
    machine: Machine,
    input: Value,
    /// Lookup only; a parent owns its children, never the reverse.
    parent: Option<ActorRef>,
    /// `None` until started.
    snapshot: Option<Snapshot>,
    mailbox: VecDeque<Event>,
    subscribers: Vec<Subscriber>,
    stopped: bool,
}

/// Runs machine instances as actors.
///
/// Processing is cooperative and single-threaded: `send`, `start` and
/// `tick` return once every mailbox they fed is drained. Each actor
/// handles one event at a time, in FIFO order. Delayed deliveries fire on
/// [`tick`](ActorSystem::tick) against the configured [`Clock`].
///
/// # Example
///
/// ```rust
/// use statechart::actor::ActorSystem;
/// use statechart::builder::{MachineBuilder, StateConfig};
/// use serde_json::Value;
///
/// let machine = MachineBuilder::new("toggle")
///     .initial("off")
///     .state(StateConfig::new("off").on("FLIP", "on"))
///     .state(StateConfig::new("on").on("FLIP", "off"))
///     .build()
///     .unwrap();
///
/// let mut system = ActorSystem::default();
/// let actor = system.spawn(machine, Value::Null);
/// system.start(&actor);
/// system.send(&actor, "FLIP");
/// assert!(system.snapshot(&actor).unwrap().matches("on"));
/// ```
pub struct ActorSystem {
    actors: HashMap<Uuid, ActorCell>,
    registry: HashMap<String, ActorRef>,
    run_queue: VecDeque<Uuid>,
    scheduler: Scheduler,
    clock: Arc<dyn Clock>,
    inspectors: Vec<Inspector>,
    warnings: Vec<Warning>,
    /// Stopped children waiting to be released.
    retired: Vec<Uuid>,
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new(SystemOptions::default())
    }
}

impl ActorSystem {
    pub fn new(options: SystemOptions) -> Self {
        Self {
            actors: HashMap::new(),
            registry: HashMap::new(),
            run_queue: VecDeque::new(),
            scheduler: Scheduler::new(),
            clock: options.clock,
            inspectors: Vec::new(),
            warnings: Vec::new(),
            retired: Vec::new(),
        }
    }

    /// Create a root actor for `machine`. It does nothing until started;
    /// events sent before then wait in its mailbox.
    pub fn spawn(&mut self, machine: Machine, input: Value) -> ActorRef {
        let actor_ref = ActorRef::new(machine.id());
        self.insert(actor_ref.clone(), machine, input, None);
        actor_ref
    }

    /// Make `actor` addressable by `system_id` from any `send_to`.
    pub fn register(&mut self, system_id: impl Into<String>, actor: &ActorRef) {
        self.registry.insert(system_id.into(), actor.clone());
    }

    pub fn lookup(&self, system_id: &str) -> Option<&ActorRef> {
        self.registry.get(system_id)
    }

    /// Enter the initial configuration, then process any queued events.
    pub fn start(&mut self, actor: &ActorRef) {
        self.start_cell(actor.session());
        self.drain();
    }

    /// Deliver `event` to `actor` and process until every mailbox is idle.
    /// An actor that is not running drops the event with a warning.
    pub fn send(&mut self, actor: &ActorRef, event: impl Into<Event>) {
        self.deliver(actor, event.into());
        self.drain();
    }

    /// Stop `actor` and, first, every descendant. Idempotent.
    ///
    /// Mailboxes and pending timers are discarded. No exit actions run.
    pub fn stop(&mut self, actor: &ActorRef) {
        self.shut_down(actor.session());
        self.evict();
    }

    /// Fire every delayed delivery due by the clock's current time, in due
    /// order. Each fired event is fully processed before the next fires.
    /// Returns the number of timers fired.
    pub fn tick(&mut self) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.scheduler.pop_due(self.clock.now()) {
            tracing::debug!(
                actor = %timer.owner,
                id = %timer.id,
                event = timer.event.event_type(),
                "delayed delivery due"
            );
            fired += 1;
            self.deliver(&timer.target, timer.event);
            self.drain();
        }
        fired
    }

    /// Latest snapshot of `actor`. Stopped root actors keep theirs; a
    /// stopped child is released once processing settles.
    pub fn snapshot(&self, actor: &ActorRef) -> Option<&Snapshot> {
        self.cell(actor)?.snapshot.as_ref()
    }

    /// Whether `actor` is started, or will be, and has not stopped.
    pub fn is_running(&self, actor: &ActorRef) -> bool {
        self.cell(actor).is_some_and(|cell| !cell.stopped)
    }

    pub fn parent(&self, actor: &ActorRef) -> Option<&ActorRef> {
        self.cell(actor)?.parent.as_ref()
    }

    /// Invoked children of `actor`, keyed by invoke id.
    pub fn child(&self, actor: &ActorRef, id: &str) -> Option<&ActorRef> {
        self.snapshot(actor)?.children().get(id)
    }

    /// Call `subscriber` with every snapshot `actor` settles on.
    pub fn subscribe<F>(&mut self, actor: &ActorRef, subscriber: F)
    where
        F: FnMut(&Snapshot) + 'static,
    {
        if let Some(cell) = self.actors.get_mut(&actor.session()) {
            cell.subscribers.push(Box::new(subscriber));
        }
    }

    /// Observe every processed event, microstep, snapshot, stop and
    /// warning in the system.
    pub fn inspect<F>(&mut self, inspector: F)
    where
        F: FnMut(&InspectionEvent) + 'static,
    {
        self.inspectors.push(Box::new(inspector));
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Actors held by the system: every live actor plus stopped roots.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether `actor` has a pending delayed delivery keyed by `id`.
    pub fn is_scheduled(&self, actor: &ActorRef, id: &str) -> bool {
        self.scheduler.is_pending(actor.session(), id)
    }

    /// Clock time the next delayed delivery is due.
    pub fn next_due(&self) -> Option<Duration> {
        self.scheduler.next_due()
    }

    fn cell(&self, actor: &ActorRef) -> Option<&ActorCell> {
        self.actors
            .get(&actor.session())
            .filter(|cell| cell.actor_ref == *actor)
    }

    fn insert(&mut self, actor_ref: ActorRef, machine: Machine, input: Value, parent: Option<ActorRef>) {
        tracing::debug!(
            actor = %actor_ref,
            parent = parent.as_ref().map(ActorRef::id),
            "actor spawned"
        );
        self.actors.insert(
            actor_ref.session(),
            ActorCell {
                actor_ref,
                machine,
                input,
                parent,
                snapshot: None,
                mailbox: VecDeque::new(),
                subscribers: Vec::new(),
                stopped: false,
            },
        );
    }

    fn start_cell(&mut self, session: Uuid) {
        let (actor, event, macrostep, queued) = match self.actors.get(&session) {
            Some(cell) if !cell.stopped && cell.snapshot.is_none() => (
                cell.actor_ref.clone(),
                Event::init(&cell.input),
                cell.machine.initial_transition(&cell.input),
                cell.mailbox.len(),
            ),
            _ => return,
        };
        self.emit(InspectionEvent::Event {
            actor: actor.clone(),
            event,
        });
        self.commit(&actor, macrostep);
        // Events sent before start were held back from the run queue.
        if self.is_running(&actor) {
            self.run_queue.extend(std::iter::repeat(session).take(queued));
        }
    }

    fn deliver(&mut self, target: &ActorRef, event: Event) {
        match self.actors.get_mut(&target.session()) {
            Some(cell) if !cell.stopped => {
                cell.mailbox.push_back(event);
                if cell.snapshot.is_some() {
                    self.run_queue.push_back(target.session());
                }
            }
            _ => self.warn(Warning::StaleTargetDelivery {
                target: target.id().to_string(),
                event_type: event.event_type().to_string(),
            }),
        }
    }

    fn drain(&mut self) {
        while let Some(session) = self.run_queue.pop_front() {
            self.process(session);
        }
        self.evict();
    }

    /// Drop the cells of stopped children. Late deliveries to them warn
    /// as stale.
    fn evict(&mut self) {
        for session in std::mem::take(&mut self.retired) {
            if let Some(cell) = self.actors.remove(&session) {
                tracing::debug!(actor = %cell.actor_ref, "actor released");
            }
        }
    }

    /// Take one event from the actor's mailbox and run its macrostep.
    fn process(&mut self, session: Uuid) {
        let Some(cell) = self.actors.get_mut(&session) else {
            return;
        };
        if cell.stopped {
            return;
        }
        let Some(event) = cell.mailbox.pop_front() else {
            return;
        };
        let Some(snapshot) = cell.snapshot.as_ref() else {
            return;
        };
        let macrostep = cell.machine.transition(snapshot, &event);
        let actor = cell.actor_ref.clone();
        self.emit(InspectionEvent::Event {
            actor: actor.clone(),
            event,
        });
        self.commit(&actor, macrostep);
    }

    /// Adopt a macrostep's snapshot, execute its effects in order, then
    /// act on the resulting status.
    fn commit(&mut self, actor: &ActorRef, macrostep: Macrostep) {
        let Macrostep {
            snapshot,
            microsteps,
            effects,
        } = macrostep;
        for microstep in microsteps {
            self.emit(InspectionEvent::Microstep {
                actor: actor.clone(),
                event: microstep.event,
                snapshot: microstep.snapshot,
            });
        }
        let status = snapshot.status();
        match self.actors.get_mut(&actor.session()) {
            Some(cell) => cell.snapshot = Some(snapshot),
            None => return,
        }
        for effect in effects {
            self.execute(actor, effect);
        }
        match status {
            Status::Active => {}
            Status::Done => self.finish(actor),
            Status::Error => self.fail(actor),
            Status::Stopped => self.shut_down(actor.session()),
        }
        self.publish(actor.session());
    }

    fn execute(&mut self, actor: &ActorRef, effect: Effect) {
        match effect {
            run @ Effect::Run { .. } => run.run_callback(),
            Effect::Log { label: Some(label), value } => {
                tracing::info!(actor = actor.id(), %label, %value, "log");
            }
            Effect::Log { label: None, value } => {
                tracing::info!(actor = actor.id(), %value, "log");
            }
            Effect::Deliver {
                to,
                event,
                delay,
                id,
            } => {
                let Some(target) = self.recipient(actor, to, &event) else {
                    return;
                };
                match delay {
                    Some(delay) => {
                        let due = self.clock.now() + delay;
                        let id = self.scheduler.schedule(actor, id, due, target, event);
                        tracing::debug!(actor = %actor, id = %id, ?delay, "delayed delivery scheduled");
                    }
                    None => self.deliver(&target, event),
                }
            }
            Effect::Cancel { id } => {
                if self.scheduler.cancel(actor.session(), &id) {
                    tracing::debug!(actor = %actor, id = %id, "delayed delivery cancelled");
                }
            }
            Effect::Spawn {
                actor_ref,
                logic,
                input,
            } => {
                let session = actor_ref.session();
                self.insert(actor_ref, logic, input, Some(actor.clone()));
                self.start_cell(session);
            }
            Effect::Stop { actor_ref } => self.shut_down(actor_ref.session()),
        }
    }

    fn recipient(&mut self, sender: &ActorRef, to: Recipient, event: &Event) -> Option<ActorRef> {
        let resolved = match to {
            Recipient::SelfActor => Ok(sender.clone()),
            Recipient::Ref(actor) => Ok(actor),
            Recipient::Parent => self
                .actors
                .get(&sender.session())
                .and_then(|cell| cell.parent.clone())
                .ok_or_else(|| format!("parent of {}", sender.id())),
            Recipient::Id(id) => self.registry.get(&id).cloned().ok_or(id),
        };
        match resolved {
            Ok(actor) => Some(actor),
            Err(target) => {
                self.warn(Warning::UnknownSendTarget {
                    target,
                    event_type: event.event_type().to_string(),
                });
                None
            }
        }
    }

    /// A finished child reports its output to the parent, then stops.
    fn finish(&mut self, actor: &ActorRef) {
        let Some(cell) = self.actors.get(&actor.session()) else {
            return;
        };
        let parent = cell.parent.clone();
        let output = cell.snapshot.as_ref().and_then(|s| s.output().cloned());
        tracing::debug!(actor = %actor, "actor done");
        if let Some(parent) = parent {
            self.deliver(&parent, Event::done_actor(actor.id(), output.as_ref()));
        }
        self.shut_down(actor.session());
    }

    /// Errors are not forwarded; observers see them through subscriptions.
    fn fail(&mut self, actor: &ActorRef) {
        if let Some(error) = self.snapshot(actor).and_then(Snapshot::error) {
            tracing::error!(actor = %actor, %error, "actor failed");
        }
        self.shut_down(actor.session());
    }

    fn shut_down(&mut self, session: Uuid) {
        let Some(cell) = self.actors.get_mut(&session) else {
            return;
        };
        if cell.stopped {
            return;
        }
        cell.stopped = true;
        cell.mailbox.clear();
        let actor = cell.actor_ref.clone();
        if cell.parent.is_some() {
            self.retired.push(session);
        }

        let mut children: Vec<&ActorRef> = self
            .actors
            .values()
            .filter(|child| {
                !child.stopped
                    && child
                        .parent
                        .as_ref()
                        .is_some_and(|parent| parent.session() == session)
            })
            .map(|child| &child.actor_ref)
            .collect();
        children.sort_by(|a, b| a.id().cmp(b.id()));
        let children: Vec<Uuid> = children.into_iter().map(ActorRef::session).collect();
        for child in children {
            self.shut_down(child);
        }

        self.scheduler.cancel_all(session);
        let mut interrupted = false;
        if let Some(snapshot) = self
            .actors
            .get_mut(&session)
            .and_then(|cell| cell.snapshot.as_mut())
            .filter(|snapshot| snapshot.is_active())
        {
            *snapshot = snapshot.with_status(Status::Stopped);
            interrupted = true;
        }
        tracing::debug!(actor = %actor, "actor stopped");
        self.emit(InspectionEvent::Stopped { actor });
        if interrupted {
            self.publish(session);
        }
    }

    fn publish(&mut self, session: Uuid) {
        let Some(cell) = self.actors.get_mut(&session) else {
            return;
        };
        let Some(snapshot) = cell.snapshot.as_ref() else {
            return;
        };
        for subscriber in cell.subscribers.iter_mut() {
            subscriber(snapshot);
        }
        let event = InspectionEvent::Snapshot {
            actor: cell.actor_ref.clone(),
            snapshot: snapshot.clone(),
        };
        self.emit(event);
    }

    fn warn(&mut self, warning: Warning) {
        tracing::warn!(%warning, "event dropped");
        self.emit(InspectionEvent::Warning(warning.clone()));
        self.warnings.push(warning);
    }

    fn emit(&mut self, event: InspectionEvent) {
        for inspector in self.inspectors.iter_mut() {
            inspector(&event);
        }
    }
}

impl fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("actors", &self.actors.len())
            .field("pending_timers", &self.scheduler.len())
            .field("retired", &self.retired.len())
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
