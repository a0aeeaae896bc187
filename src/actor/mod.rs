//! The imperative shell: running machines as actors.
//!
//! The interpreter in [`crate::machine`] computes what should happen; this
//! module makes it happen. An [`ActorSystem`] owns every actor's snapshot
//! and mailbox, executes effects in order, delivers delayed events from a
//! [`Clock`], and manages spawned children.
//!
//! - **Addresses**: [`ActorRef`], unique per instance
//! - **Time**: [`SystemClock`] and [`VirtualClock`]
//! - **Observation**: per-actor subscriptions and system-wide inspection
//! - **Warnings**: non-fatal delivery problems, never a status change

mod actor_ref;
mod clock;
mod inspect;
mod scheduler;
mod system;

pub use actor_ref::ActorRef;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use inspect::{InspectionEvent, Inspector, Subscriber, Warning};
pub use system::{ActorSystem, SystemOptions};
