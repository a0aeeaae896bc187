//! Declarative machine definitions as data.
//!
//! A [`MachineSchema`] deserializes the usual statechart config shape
//! (`initial`, `states`, `on`, `always`, `after`, `invoke`, `type`,
//! `history`, `id`, `entry`, `exit`, `tags`). Guards and actions are
//! referenced by name and resolved through [`Implementations`] at run time.
//!
//! [`Implementations`]: crate::machine::Implementations

use super::machine::MachineBuilder;
use super::state::{InvokeConfig, StateConfig};
use super::transition::TransitionConfig;
use crate::core::{Guard, HistoryKind, StateKind};
use crate::effects::{Action, Delay};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;

/// Top-level definition: the root state plus machine-wide settings.
///
/// # Example
///
/// ```rust
/// use statechart::builder::MachineSchema;
/// use serde_json::json;
///
/// let schema: MachineSchema = serde_json::from_value(json!({
///     "id": "light",
///     "initial": "green",
///     "context": {"cycles": 0},
///     "states": {
///         "green": {"on": {"TIMER": "yellow"}},
///         "yellow": {"on": {"TIMER": "red"}},
///         "red": {"after": {"1000": "green"}}
///     }
/// }))
/// .unwrap();
///
/// let machine = schema.into_builder().build().unwrap();
/// assert!(machine.initial_snapshot(&json!(null)).matches("green"));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MachineSchema {
    pub id: String,
    #[serde(default)]
    pub context: Option<Value>,
    #[serde(flatten)]
    pub root: StateSchema,
}

impl MachineSchema {
    pub fn into_builder(self) -> MachineBuilder {
        let root = self.root.into_config(&self.id);
        let builder = MachineBuilder::from_config(self.id, root);
        match self.context {
            Some(context) => builder.context(context),
            None => builder,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KindSchema {
    Atomic,
    Compound,
    Parallel,
    Final,
    History,
}

/// `history: "shallow" | "deep" | true`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HistorySchema {
    Flag(bool),
    Kind(HistoryKind),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateSchema {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<KindSchema>,
    #[serde(default)]
    pub history: Option<HistorySchema>,
    #[serde(default)]
    pub initial: Option<String>,
    #[serde(default)]
    pub states: OrderedStates,
    #[serde(default)]
    pub on: OrderedTransitions,
    #[serde(default)]
    pub always: Option<TransitionsSchema>,
    #[serde(default)]
    pub after: OrderedTransitions,
    #[serde(default, rename = "onDone")]
    pub on_done: Option<TransitionsSchema>,
    #[serde(default)]
    pub invoke: Option<OneOrMany<InvokeSchema>>,
    #[serde(default)]
    pub entry: Option<OneOrMany<ActionSchema>>,
    #[serde(default)]
    pub exit: Option<OneOrMany<ActionSchema>>,
    #[serde(default)]
    pub tags: Option<OneOrMany<String>>,
    /// Default target of a history state.
    #[serde(default)]
    pub target: Option<String>,
}

impl StateSchema {
    fn kind(&self) -> Option<StateKind> {
        let history = match &self.history {
            Some(HistorySchema::Kind(kind)) => Some(*kind),
            Some(HistorySchema::Flag(true)) => Some(HistoryKind::Shallow),
            Some(HistorySchema::Flag(false)) | None => None,
        };
        match (self.kind, history) {
            (Some(KindSchema::History), kind) | (None, kind @ Some(_)) => {
                Some(StateKind::History(kind.unwrap_or(HistoryKind::Shallow)))
            }
            (Some(KindSchema::Atomic), _) => Some(StateKind::Atomic),
            (Some(KindSchema::Compound), _) => Some(StateKind::Compound),
            (Some(KindSchema::Parallel), _) => Some(StateKind::Parallel),
            (Some(KindSchema::Final), _) => Some(StateKind::Final),
            (None, None) => None,
        }
    }

    pub fn into_config(self, key: &str) -> StateConfig {
        let mut config = StateConfig::new(key);
        if let Some(kind) = self.kind() {
            config = config.kind(kind);
        }
        if let Some(id) = self.id {
            config = config.id(id);
        }
        if let Some(initial) = self.initial {
            config = config.initial(initial);
        }
        if let Some(target) = self.target {
            config = config.default_target(target);
        }
        for (child_key, child) in self.states.0 {
            config = config.state(child.into_config(&child_key));
        }
        for (event_type, transitions) in self.on.0 {
            for transition in transitions.into_configs() {
                config = config.on(event_type.clone(), transition);
            }
        }
        for transition in self.always.map(TransitionsSchema::into_configs).unwrap_or_default() {
            config = config.always(transition);
        }
        for (delay, transitions) in self.after.0 {
            let delay = match delay.parse::<u64>() {
                Ok(ms) => Delay::Millis(ms),
                Err(_) => Delay::Named(delay),
            };
            for transition in transitions.into_configs() {
                config = config.after(delay.clone(), transition);
            }
        }
        for transition in self.on_done.map(TransitionsSchema::into_configs).unwrap_or_default() {
            config = config.on_done(transition);
        }
        for invoke in self.invoke.map(OneOrMany::into_vec).unwrap_or_default() {
            config = config.invoke(invoke.into_config());
        }
        for action in self.entry.map(OneOrMany::into_vec).unwrap_or_default() {
            config = config.entry(action.into_action());
        }
        for action in self.exit.map(OneOrMany::into_vec).unwrap_or_default() {
            config = config.exit(action.into_action());
        }
        for tag in self.tags.map(OneOrMany::into_vec).unwrap_or_default() {
            config = config.tag(tag);
        }
        config
    }
}

/// A single value or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// `"target"` or a transition object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransitionSchema {
    Target(String),
    Object(TransitionObject),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransitionObject {
    #[serde(default)]
    pub target: Option<OneOrMany<String>>,
    #[serde(default)]
    pub guard: Option<GuardSchema>,
    #[serde(default)]
    pub actions: Option<OneOrMany<ActionSchema>>,
    #[serde(default)]
    pub reenter: bool,
}

impl TransitionSchema {
    fn into_config(self) -> TransitionConfig {
        match self {
            TransitionSchema::Target(target) => TransitionConfig::to(target),
            TransitionSchema::Object(object) => {
                let targets = object.target.map(OneOrMany::into_vec).unwrap_or_default();
                let mut config = TransitionConfig::to_all(targets).actions(
                    object
                        .actions
                        .map(OneOrMany::into_vec)
                        .unwrap_or_default()
                        .into_iter()
                        .map(ActionSchema::into_action),
                );
                if let Some(guard) = object.guard {
                    config = config.guard(guard.into_guard());
                }
                if object.reenter {
                    config = config.reenter();
                }
                config
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TransitionsSchema {
    Many(Vec<TransitionSchema>),
    One(TransitionSchema),
    /// `null`: a targetless transition with no actions.
    Targetless(()),
}

impl TransitionsSchema {
    fn into_configs(self) -> Vec<TransitionConfig> {
        match self {
            TransitionsSchema::Many(transitions) => transitions
                .into_iter()
                .map(TransitionSchema::into_config)
                .collect(),
            TransitionsSchema::One(transition) => vec![transition.into_config()],
            TransitionsSchema::Targetless(()) => vec![TransitionConfig::internal()],
        }
    }
}

/// `"name"` or `{ "type": name, "params": ... }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ActionSchema {
    Name(String),
    Object {
        #[serde(rename = "type")]
        name: String,
        #[serde(default)]
        params: Option<Value>,
    },
}

impl ActionSchema {
    fn into_action(self) -> Action {
        match self {
            ActionSchema::Name(name) => Action::named(name),
            ActionSchema::Object { name, params: None } => Action::named(name),
            ActionSchema::Object {
                name,
                params: Some(params),
            } => Action::named_with(name, params),
        }
    }
}

/// `"name"`, `{ "type": name, "params": ... }`, or a composite:
/// `{ "type": "and" | "or" | "not", "guards": [...] }` and
/// `{ "type": "stateIn", "state": "#id" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GuardSchema {
    Name(String),
    Object(GuardObject),
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardObject {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub guards: Vec<GuardSchema>,
    #[serde(default)]
    pub state: Option<String>,
}

impl GuardSchema {
    fn into_guard(self) -> Guard {
        match self {
            GuardSchema::Name(name) => Guard::named(name),
            GuardSchema::Object(object) => {
                let children = || object.guards.iter().cloned().map(GuardSchema::into_guard).collect();
                match object.name.as_str() {
                    "and" => Guard::and(children()),
                    "or" => Guard::or(children()),
                    "not" => Guard::not(Guard::and(children())),
                    "stateIn" => Guard::in_state(object.state.clone().unwrap_or_default()),
                    _ => match object.params {
                        Some(params) => Guard::named_with(object.name, params),
                        None => Guard::named(object.name),
                    },
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvokeSchema {
    pub id: String,
    pub src: String,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default, rename = "onDone")]
    pub on_done: Option<TransitionsSchema>,
}

impl InvokeSchema {
    fn into_config(self) -> InvokeConfig {
        let mut config = InvokeConfig::new(self.id, self.src);
        if let Some(input) = self.input {
            config = config.input(input);
        }
        for transition in self.on_done.map(TransitionsSchema::into_configs).unwrap_or_default() {
            config = config.on_done(transition);
        }
        config
    }
}

/// Child states in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OrderedStates(pub Vec<(String, StateSchema)>);

/// Event-keyed (or delay-keyed) transitions in declaration order.
#[derive(Debug, Clone, Default)]
pub struct OrderedTransitions(pub Vec<(String, TransitionsSchema)>);

struct OrderedVisitor<T>(std::marker::PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
    type Value = Vec<(String, T)>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, T>()? {
            entries.push(entry);
        }
        Ok(entries)
    }
}

impl<'de> Deserialize<'de> for OrderedStates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(OrderedVisitor(std::marker::PhantomData))
            .map(OrderedStates)
    }
}

impl<'de> Deserialize<'de> for OrderedTransitions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer
            .deserialize_map(OrderedVisitor(std::marker::PhantomData))
            .map(OrderedTransitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Implementations;
    use serde_json::json;

    fn build(definition: Value) -> crate::machine::Machine {
        serde_json::from_value::<MachineSchema>(definition)
            .unwrap()
            .into_builder()
            .build()
            .unwrap()
    }

    #[test]
    fn states_keep_document_order() {
        let schema: MachineSchema = serde_json::from_value(json!({
            "id": "m",
            "initial": "zeta",
            "states": {"zeta": {}, "alpha": {}, "mid": {}}
        }))
        .unwrap();
        let keys: Vec<_> = schema.root.states.0.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn history_flags_become_history_kinds() {
        let deep: StateSchema = serde_json::from_value(json!({"history": "deep"})).unwrap();
        let shallow: StateSchema = serde_json::from_value(json!({"history": true})).unwrap();
        let typed: StateSchema = serde_json::from_value(json!({"type": "history"})).unwrap();
        assert_eq!(deep.kind(), Some(StateKind::History(HistoryKind::Deep)));
        assert_eq!(shallow.kind(), Some(StateKind::History(HistoryKind::Shallow)));
        assert_eq!(typed.kind(), Some(StateKind::History(HistoryKind::Shallow)));
    }

    #[test]
    fn named_guards_and_actions_resolve_through_implementations() {
        let machine = build(json!({
            "id": "door",
            "initial": "closed",
            "context": {"locked": false},
            "states": {
                "closed": {
                    "on": {
                        "OPEN": [
                            {"target": "open", "guard": {"type": "not", "guards": ["isLocked"]}, "actions": "creak"},
                            {"actions": {"type": "complain", "params": {"why": "locked"}}}
                        ]
                    }
                },
                "open": {"tags": ["visible"]}
            }
        }))
        .provide(
            Implementations::new()
                .guard("isLocked", |args| args.context["locked"] == json!(true))
                .callback("creak", |_| {})
                .callback("complain", |_| {}),
        );

        let start = machine.initial_snapshot(&Value::Null);
        let step = machine.transition(&start, &"OPEN".into());
        assert!(step.snapshot.matches("open"));
        assert!(step.snapshot.has_tag("visible"));
        assert_eq!(step.effects.len(), 1);
    }

    #[test]
    fn parallel_and_final_types_are_honoured() {
        let machine = build(json!({
            "id": "job",
            "type": "parallel",
            "states": {
                "upload": {"initial": "busy", "states": {"busy": {"on": {"UP": "done"}}, "done": {"type": "final"}}},
                "scan": {"initial": "busy", "states": {"busy": {"on": {"SCANNED": "done"}}, "done": {"type": "final"}}}
            }
        }));
        let start = machine.initial_snapshot(&Value::Null);
        let half = machine.transition(&start, &"UP".into()).snapshot;
        assert!(half.is_active());
        let done = machine.transition(&half, &"SCANNED".into()).snapshot;
        assert_eq!(done.status(), crate::machine::Status::Done);
    }
}
