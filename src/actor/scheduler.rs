//! Delayed deliveries, ordered by due time.

use super::actor_ref::ActorRef;
use crate::core::Event;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;
use uuid::Uuid;

/// A delivery that has come due.
#[derive(Clone, Debug)]
pub(crate) struct Timer {
    pub(crate) owner: ActorRef,
    pub(crate) id: String,
    pub(crate) target: ActorRef,
    pub(crate) event: Event,
}

struct TimerEntry {
    due: Duration,
    /// Insertion sequence; breaks ties between equal due times.
    seq: u64,
    timer: Timer,
}

impl Eq for TimerEntry {}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Ord for TimerEntry {
    // BinaryHeap is a max-heap; reverse for earliest-due first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending delayed deliveries of every actor in a system.
///
/// Timers are keyed by the scheduling actor's session and the send id, so
/// two actors may use the same id independently. Cancelled or replaced
/// entries stay in the heap and are skipped when they surface, until they
/// outnumber the live ones and the heap is rebuilt.
#[derive(Default)]
pub(crate) struct Scheduler {
    heap: BinaryHeap<TimerEntry>,
    live: HashMap<(Uuid, String), u64>,
    next_seq: u64,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` for `target` at `due`. Reusing a pending id
    /// replaces that timer. Returns the id the timer is keyed by.
    pub(crate) fn schedule(
        &mut self,
        owner: &ActorRef,
        id: Option<String>,
        due: Duration,
        target: ActorRef,
        event: Event,
    ) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = id.unwrap_or_else(|| format!("xstate.timer.{seq}"));
        let replaced = self.live.insert((owner.session(), id.clone()), seq).is_some();
        self.heap.push(TimerEntry {
            due,
            seq,
            timer: Timer {
                owner: owner.clone(),
                id: id.clone(),
                target,
                event,
            },
        });
        if replaced {
            tracing::debug!(actor = %owner, id = %id, "delayed delivery rescheduled");
            self.compact();
        }
        id
    }

    /// Cancel the owner's pending timer `id`. Returns whether one was pending.
    pub(crate) fn cancel(&mut self, owner: Uuid, id: &str) -> bool {
        let cancelled = self.live.remove(&(owner, id.to_string())).is_some();
        if cancelled {
            self.compact();
        }
        cancelled
    }

    pub(crate) fn cancel_all(&mut self, owner: Uuid) {
        self.live.retain(|(session, _), _| *session != owner);
        self.compact();
    }

    pub(crate) fn is_pending(&self, owner: Uuid, id: &str) -> bool {
        self.live.contains_key(&(owner, id.to_string()))
    }

    /// Remove and return the earliest live timer due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<Timer> {
        while let Some(entry) = self.heap.peek() {
            if entry.due > now {
                return None;
            }
            let entry = self.heap.pop()?;
            if self.is_live(&entry) {
                self.live.remove(&(entry.timer.owner.session(), entry.timer.id.clone()));
                return Some(entry.timer);
            }
        }
        None
    }

    /// Due time of the earliest live timer.
    pub(crate) fn next_due(&self) -> Option<Duration> {
        self.heap
            .iter()
            .filter(|entry| self.is_live(entry))
            .map(|entry| entry.due)
            .min()
    }

    pub(crate) fn len(&self) -> usize {
        self.live.len()
    }

    fn is_live(&self, entry: &TimerEntry) -> bool {
        let key = (entry.timer.owner.session(), entry.timer.id.clone());
        self.live.get(&key) == Some(&entry.seq)
    }

    /// Drop dead entries once they outnumber live ones.
    fn compact(&mut self) {
        if self.heap.len() <= 2 * self.live.len() {
            return;
        }
        let live = &self.live;
        self.heap.retain(|entry| {
            let key = (entry.timer.owner.session(), entry.timer.id.clone());
            live.get(&key) == Some(&entry.seq)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn schedule(scheduler: &mut Scheduler, owner: &ActorRef, id: &str, due: u64) {
        scheduler.schedule(owner, Some(id.into()), ms(due), owner.clone(), Event::new(id));
    }

    #[test]
    fn timers_fire_in_due_order() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &owner, "late", 300);
        schedule(&mut scheduler, &owner, "early", 100);
        schedule(&mut scheduler, &owner, "middle", 200);

        let fired: Vec<_> = std::iter::from_fn(|| scheduler.pop_due(ms(1000)))
            .map(|timer| timer.id)
            .collect();
        assert_eq!(fired, vec!["early", "middle", "late"]);
    }

    #[test]
    fn nothing_fires_before_due() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &owner, "t", 100);
        assert!(scheduler.pop_due(ms(99)).is_none());
        assert_eq!(scheduler.next_due(), Some(ms(100)));
        assert!(scheduler.pop_due(ms(100)).is_some());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &owner, "t", 100);
        assert!(scheduler.cancel(owner.session(), "t"));
        assert!(scheduler.pop_due(ms(1000)).is_none());
        assert!(!scheduler.cancel(owner.session(), "t"));
    }

    #[test]
    fn ids_are_scoped_to_the_owner() {
        let first = ActorRef::new("a");
        let second = ActorRef::new("b");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &first, "t", 100);
        schedule(&mut scheduler, &second, "t", 100);
        scheduler.cancel(first.session(), "t");

        let fired = scheduler.pop_due(ms(100)).map(|timer| timer.owner);
        assert_eq!(fired, Some(second));
        assert_eq!(scheduler.len(), 0);
    }

    #[test]
    fn rescheduling_replaces_pending_timer() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &owner, "t", 100);
        schedule(&mut scheduler, &owner, "t", 500);
        assert!(scheduler.pop_due(ms(200)).is_none());
        assert!(scheduler.pop_due(ms(500)).is_some());
    }

    #[test]
    fn generated_ids_are_unique() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        let first = scheduler.schedule(&owner, None, ms(1), owner.clone(), Event::new("x"));
        let second = scheduler.schedule(&owner, None, ms(1), owner.clone(), Event::new("x"));
        assert_ne!(first, second);
        assert!(scheduler.is_pending(owner.session(), &first));
        assert_eq!(scheduler.len(), 2);
    }

    #[test]
    fn cancel_all_clears_only_that_owner() {
        let first = ActorRef::new("a");
        let second = ActorRef::new("b");
        let mut scheduler = Scheduler::new();
        schedule(&mut scheduler, &first, "x", 1);
        schedule(&mut scheduler, &first, "y", 2);
        schedule(&mut scheduler, &second, "x", 3);
        scheduler.cancel_all(first.session());
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.is_pending(second.session(), "x"));
    }

    #[test]
    fn cancelled_and_replaced_entries_do_not_accumulate() {
        let owner = ActorRef::new("a");
        let mut scheduler = Scheduler::new();
        for round in 0..1000 {
            schedule(&mut scheduler, &owner, "reentered", 60_000 + round);
            scheduler.cancel(owner.session(), "reentered");
            schedule(&mut scheduler, &owner, "replaced", 60_000 + round);
        }

        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.heap.len() <= 2 * scheduler.len() + 1);
        assert_eq!(scheduler.next_due(), Some(ms(60_999)));
        assert_eq!(
            scheduler.pop_due(ms(120_000)).map(|timer| timer.id),
            Some("replaced".to_string())
        );
        assert!(scheduler.heap.is_empty());
    }
}
