//! Statechart: a hierarchical state machine interpreter with an actor runtime
//!
//! Statechart follows a "pure core, imperative shell" design. The
//! interpreter is a pure function from a snapshot and an event to the next
//! snapshot plus an ordered list of effects; the actor runtime executes
//! those effects, owns mailboxes and timers, and supervises children.
//!
//! # Core Concepts
//!
//! - **State nodes**: atomic, compound, parallel, final and history nodes
//!   compiled into an immutable arena
//! - **Transitions**: event-driven, eventless (`always`) and delayed
//!   (`after`), with guards and ordered actions
//! - **Snapshots**: immutable values carrying the active state value,
//!   context, status and children
//! - **Actors**: running instances with FIFO mailboxes, cancellable
//!   delayed sends and depth-first stop cascades
//!
//! # Example
//!
//! ```rust
//! use statechart::builder::{MachineBuilder, StateConfig, TransitionConfig};
//! use statechart::effects::Action;
//! use serde_json::{json, Value};
//!
//! let machine = MachineBuilder::new("light")
//!     .context(json!({"cycles": 0}))
//!     .initial("green")
//!     .state(StateConfig::new("green").on("TIMER", "yellow"))
//!     .state(StateConfig::new("yellow").on("TIMER", "red"))
//!     .state(
//!         StateConfig::new("red").on(
//!             "TIMER",
//!             TransitionConfig::to("green").action(Action::assign(|args| {
//!                 json!({"cycles": args.context["cycles"].as_i64().unwrap_or(0) + 1})
//!             })),
//!         ),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut snapshot = machine.initial_snapshot(&Value::Null);
//! for _ in 0..3 {
//!     snapshot = machine.transition(&snapshot, &"TIMER".into()).snapshot;
//! }
//! assert!(snapshot.matches("green"));
//! assert_eq!(snapshot.context()["cycles"], json!(1));
//! ```

pub mod actor;
pub mod builder;
pub mod core;
pub mod effects;
pub mod machine;

// Re-export commonly used types
pub use actor::{ActorRef, ActorSystem};
pub use builder::{MachineBuilder, StateConfig, TransitionConfig};
pub use core::{Event, StateValue};
pub use effects::Action;
pub use machine::{Machine, Snapshot, Status};
