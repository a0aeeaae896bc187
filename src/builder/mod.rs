//! Builder API for machine construction.
//!
//! Machines are described as a tree of [`StateConfig`]s, either in code
//! through the fluent builders or as data through [`MachineSchema`], and
//! compiled once into an immutable [`Machine`](crate::machine::Machine).
//! Every target specifier is resolved at build time; all problems found are
//! reported together.

mod compile;
pub mod error;
pub mod machine;
pub mod schema;
pub mod state;
pub mod transition;

pub use error::BuildError;
pub use machine::MachineBuilder;
pub use schema::MachineSchema;
pub use state::{InvokeConfig, StateConfig};
pub use transition::TransitionConfig;
