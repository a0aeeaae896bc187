//! Static and dynamic parameters for named guards and actions.

use super::event::Event;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Resolver evaluated against `{context, event}` before a guard or action runs.
pub type ParamsResolver = Arc<dyn Fn(&Value, &Event) -> Value + Send + Sync>;

/// Parameters attached to a guard or action reference.
///
/// `Params::None` resolves to `None`, so implementations can tell "declared
/// without params" apart from an explicit `null`.
#[derive(Clone, Default)]
pub enum Params {
    #[default]
    None,
    Static(Value),
    Dynamic(ParamsResolver),
}

impl Params {
    pub fn dynamic<F>(resolver: F) -> Self
    where
        F: Fn(&Value, &Event) -> Value + Send + Sync + 'static,
    {
        Params::Dynamic(Arc::new(resolver))
    }

    pub fn resolve(&self, context: &Value, event: &Event) -> Option<Value> {
        match self {
            Params::None => None,
            Params::Static(value) => Some(value.clone()),
            Params::Dynamic(resolver) => Some(resolver(context, event)),
        }
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Params::Static(value)
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::None => write!(f, "None"),
            Params::Static(value) => write!(f, "Static({value})"),
            Params::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}
