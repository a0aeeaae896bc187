//! Core definition types.
//!
//! This module contains the pure building blocks of a statechart:
//! - State nodes and resolved transitions (`StateNode`, `TransitionDef`)
//! - Guard predicates with named and composite forms
//! - Events, state values and history memory
//! - Escape-aware path parsing for target specifiers
//!
//! Nothing in this module performs side effects.

mod event;
mod guard;
mod history;
mod params;
mod path;
mod state;
mod value;

pub use event::{
    Event, AFTER_PREFIX, DONE_ACTOR_PREFIX, DONE_STATE_PREFIX, INIT_EVENT, WILDCARD,
};
pub use guard::{guard_fn, Guard, GuardArgs, GuardEnv, GuardFn};
pub use history::HistoryMemory;
pub use params::{Params, ParamsResolver};
pub use path::{escape_key, join_path, to_state_path, ANCESTOR_PREFIX, DELIMITER, ESCAPE, ID_PREFIX};
pub use state::{AfterDef, HistoryKind, InvokeDef, NodeId, StateKind, StateNode, TransitionDef};
pub use value::StateValue;
