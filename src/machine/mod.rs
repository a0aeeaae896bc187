//! The pure interpreter.
//!
//! A [`Machine`] is an immutable compiled definition plus its
//! implementation tables. Given a [`Snapshot`] and an [`Event`] it computes
//! the next snapshot, the intermediate microsteps and the ordered effects,
//! without touching anything else:
//!
//! ```text
//! select transitions -> reconfigure (exit/entry sets) -> execute actions
//!        ^                                                     |
//!        +---- eventless transitions / raised events ----------+
//! ```
//!
//! [`Event`]: crate::core::Event

mod configuration;
mod definition;
mod error;
mod implementations;
mod options;
mod reconfigure;
mod resolve;
mod select;
mod snapshot;
mod step;

pub use configuration::Configuration;
pub use definition::{ContextFactory, ContextInit, Definition, Machine};
pub use error::{ExecutionError, ReferenceKind};
pub use implementations::{DelayFn, Implementations};
pub use options::{MachineOptions, DEFAULT_MAX_MICROSTEPS};
pub use snapshot::{Snapshot, Status};
pub use step::{Macrostep, Microstep};
