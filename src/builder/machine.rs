//! Builder for constructing machines.

use super::compile::compile;
use super::error::BuildError;
use super::state::{InvokeConfig, StateConfig};
use super::transition::TransitionConfig;
use crate::core::StateKind;
use crate::effects::{Action, ActionArgs, Delay};
use crate::machine::{ContextInit, Definition, Implementations, Machine, MachineOptions};
use serde_json::Value;
use std::sync::Arc;

/// Fluent builder for a [`Machine`]. The builder itself configures the
/// root state node; child states are added with [`StateConfig`].
///
/// # Example
///
/// ```rust
/// use statechart::builder::{MachineBuilder, StateConfig, TransitionConfig};
/// use statechart::effects::Action;
/// use serde_json::json;
///
/// let machine = MachineBuilder::new("counter")
///     .context(json!({"count": 0}))
///     .initial("active")
///     .state(
///         StateConfig::new("active").on(
///             "INC",
///             TransitionConfig::internal().action(Action::assign(|args| {
///                 json!({"count": args.context["count"].as_i64().unwrap_or(0) + 1})
///             })),
///         ),
///     )
///     .build()
///     .unwrap();
///
/// let snapshot = machine.initial_snapshot(&json!(null));
/// let next = machine.transition(&snapshot, &"INC".into()).snapshot;
/// assert_eq!(next.context()["count"], json!(1));
/// ```
pub struct MachineBuilder {
    id: String,
    root: StateConfig,
    context: ContextInit,
    output: Option<crate::effects::ValueResolver>,
    implementations: Implementations,
    options: MachineOptions,
}

impl MachineBuilder {
    /// Create a new builder; `id` is the machine id and the root state's id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            root: StateConfig::new(id.clone()),
            id,
            context: ContextInit::default(),
            output: None,
            implementations: Implementations::default(),
            options: MachineOptions::default(),
        }
    }

    /// Start from an existing root configuration.
    pub fn from_config(id: impl Into<String>, root: StateConfig) -> Self {
        Self {
            root,
            ..Self::new(id)
        }
    }

    fn root(mut self, update: impl FnOnce(StateConfig) -> StateConfig) -> Self {
        self.root = update(self.root);
        self
    }

    /// Make the root a parallel state.
    pub fn parallel(self) -> Self {
        self.root(|root| root.kind(StateKind::Parallel))
    }

    pub fn initial(self, target: impl Into<String>) -> Self {
        self.root(|root| root.initial(target))
    }

    pub fn state(self, child: StateConfig) -> Self {
        self.root(|root| root.state(child))
    }

    pub fn states(self, children: impl IntoIterator<Item = StateConfig>) -> Self {
        self.root(|root| root.states(children))
    }

    /// Root-level transition, taken when no active descendant handles the event.
    pub fn on(self, event_type: impl Into<String>, transition: impl Into<TransitionConfig>) -> Self {
        self.root(|root| root.on(event_type, transition))
    }

    pub fn always(self, transition: impl Into<TransitionConfig>) -> Self {
        self.root(|root| root.always(transition))
    }

    pub fn after(self, delay: impl Into<Delay>, transition: impl Into<TransitionConfig>) -> Self {
        self.root(|root| root.after(delay, transition))
    }

    pub fn invoke(self, invoke: InvokeConfig) -> Self {
        self.root(|root| root.invoke(invoke))
    }

    pub fn entry(self, action: Action) -> Self {
        self.root(|root| root.entry(action))
    }

    pub fn exit(self, action: Action) -> Self {
        self.root(|root| root.exit(action))
    }

    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.root(|root| root.tag(tag))
    }

    /// Initial context, the same for every instance.
    pub fn context(mut self, context: Value) -> Self {
        self.context = ContextInit::Static(context);
        self
    }

    /// Initial context computed from the spawn input.
    pub fn context_from_input<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.context = ContextInit::FromInput(Arc::new(factory));
        self
    }

    /// Output computed when the machine reaches a top-level final state.
    pub fn output<F>(mut self, output: F) -> Self
    where
        F: Fn(&ActionArgs<'_>) -> Value + Send + Sync + 'static,
    {
        self.output = Some(Arc::new(output));
        self
    }

    /// Attach implementations; later calls override earlier ones per name.
    pub fn implementations(mut self, implementations: Implementations) -> Self {
        self.implementations = self.implementations.merge(implementations);
        self
    }

    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile and validate the definition.
    /// Returns every problem found, not only the first.
    pub fn build(self) -> Result<Machine, BuildError> {
        let compiled = compile(&self.id, &self.root)?;
        tracing::debug!(machine = %self.id, nodes = compiled.nodes.len(), "machine built");
        let definition = Definition {
            id: self.id,
            nodes: compiled.nodes,
            ids: compiled.ids,
            context: self.context,
            output: self.output,
        };
        Ok(Machine::from_definition(definition)
            .provide(self.implementations)
            .with_options(self.options))
    }
}
