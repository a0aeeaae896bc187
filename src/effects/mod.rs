//! Actions and effects.
//!
//! This module provides the "imperative shell" vocabulary around the pure
//! interpreter:
//!
//! - **Actions**: the ordered IR attached to entry, exit and transitions
//! - **Enqueue**: the imperative builder front-end compiling to the same IR
//! - **Effects**: what a computed macrostep asks the actor runtime to do

mod action;
mod effect;

pub use action::{
    action_fn, Action, ActionArgs, ActionFn, AssignMode, Delay, Enqueue, EnqueueFn, EventExpr,
    SendTarget, TargetResolver, ValueResolver,
};
pub use effect::{Effect, Recipient};
