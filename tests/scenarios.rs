//! End-to-end interpreter scenarios through the pure API.

use serde_json::{json, Value};
use statechart::builder::{MachineBuilder, MachineSchema, StateConfig, TransitionConfig};
use statechart::core::{Event, Guard, StateValue};
use statechart::effects::{Action, Effect, Recipient};
use statechart::machine::{
    ExecutionError, Implementations, Machine, MachineOptions, ReferenceKind, Status,
};
use std::time::Duration;

/// Labels of every `log` effect, in execution order.
fn trace(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Log {
                label: Some(label), ..
            } => Some(label.clone()),
            _ => None,
        })
        .collect()
}

fn traced(key: &str) -> StateConfig {
    StateConfig::new(key)
        .entry(Action::log(format!("enter: {key}")))
        .exit(Action::log(format!("exit: {key}")))
}

fn send(machine: &Machine, snapshot: &statechart::Snapshot, event: &str) -> statechart::Snapshot {
    machine.transition(snapshot, &Event::new(event)).snapshot
}

#[test]
fn traffic_light_trace() {
    let machine = MachineBuilder::new("light")
        .initial("green")
        .state(traced("green").on("TIMER", "yellow"))
        .state(traced("yellow"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"TIMER".into());

    assert_eq!(step.snapshot.value(), &StateValue::from("yellow"));
    assert_eq!(trace(&step.effects), vec!["exit: green", "enter: yellow"]);
}

#[test]
fn initial_entry_runs_root_to_leaf() {
    let machine = MachineBuilder::new("m")
        .initial("outer")
        .state(
            traced("outer")
                .initial("inner")
                .state(traced("inner")),
        )
        .build()
        .unwrap();

    let step = machine.initial_transition(&Value::Null);
    assert_eq!(trace(&step.effects), vec!["enter: outer", "enter: inner"]);
    assert!(step.snapshot.matches("outer.inner"));
}

#[test]
fn parallel_regions_exit_in_reverse_and_enter_in_order() {
    let machine = MachineBuilder::new("m")
        .parallel()
        .state(
            StateConfig::new("a")
                .initial("a1")
                .state(traced("a1").on("CHANGE", "a2"))
                .state(traced("a2")),
        )
        .state(
            StateConfig::new("b")
                .initial("b1")
                .state(traced("b1").on("CHANGE", "b2"))
                .state(traced("b2")),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"CHANGE".into());

    assert_eq!(
        trace(&step.effects),
        vec!["exit: b1", "exit: a1", "enter: a2", "enter: b2"]
    );
    assert!(step.snapshot.matches("a.a2"));
    assert!(step.snapshot.matches("b.b2"));
}

#[test]
fn leaving_a_parallel_state_exits_regions_in_post_order() {
    let machine = MachineBuilder::new("m")
        .initial("p")
        .state(
            traced("p")
                .kind(statechart::core::StateKind::Parallel)
                .state(traced("C").initial("C1").state(traced("C1")))
                .state(traced("D").initial("D1").state(traced("D1")))
                .on("LEAVE", "out"),
        )
        .state(traced("out"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"LEAVE".into());

    assert_eq!(
        trace(&step.effects),
        vec!["exit: C1", "exit: C", "exit: D1", "exit: D", "exit: p", "enter: out"]
    );
}

#[test]
fn completion_exits_remaining_nodes_in_reverse_document_order() {
    let machine = MachineBuilder::new("m")
        .parallel()
        .state(
            traced("a")
                .initial("a1")
                .state(traced("a1").on("FINISH", "a2"))
                .state(traced("a2").kind(statechart::core::StateKind::Final)),
        )
        .state(
            traced("b")
                .initial("b1")
                .state(traced("b1").kind(statechart::core::StateKind::Final)),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"FINISH".into());

    assert_eq!(step.snapshot.status(), Status::Done);
    assert_eq!(
        trace(&step.effects),
        vec!["exit: a1", "enter: a2", "exit: b1", "exit: b", "exit: a2", "exit: a"]
    );
}

#[test]
fn unhandled_event_is_a_no_op() {
    let machine = MachineBuilder::new("m")
        .context(json!({"n": 1}))
        .initial("idle")
        .state(traced("idle").on("GO", "busy"))
        .state(traced("busy"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"UNKNOWN".into());

    assert_eq!(step.snapshot.value(), start.value());
    assert_eq!(step.snapshot.context(), start.context());
    assert!(step.effects.is_empty());
    assert!(step.microsteps.is_empty());
    assert!(!machine.can(&start, &"UNKNOWN".into()));
    assert!(machine.can(&start, &"GO".into()));
}

#[test]
fn self_transition_without_reenter_runs_nothing() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(
            traced("idle")
                .on("STAY", "idle")
                .on("RESTART", TransitionConfig::to("idle").reenter()),
        )
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);

    let stay = machine.transition(&start, &"STAY".into());
    assert!(trace(&stay.effects).is_empty());
    assert!(stay.snapshot.matches("idle"));

    let restart = machine.transition(&start, &"RESTART".into());
    assert_eq!(trace(&restart.effects), vec!["exit: idle", "enter: idle"]);
}

#[test]
fn targetless_reenter_reenters_the_source() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(traced("idle").on("RESET", TransitionConfig::internal().reenter()))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"RESET".into());
    assert_eq!(trace(&step.effects), vec!["exit: idle", "enter: idle"]);
}

#[test]
fn actions_run_exit_then_transition_then_entry() {
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(traced("a").on(
            "GO",
            TransitionConfig::to("b").action(Action::log("transition")),
        ))
        .state(traced("b"))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"GO".into());
    assert_eq!(trace(&step.effects), vec!["exit: a", "transition", "enter: b"]);
}

#[test]
fn history_falls_back_then_remembers() {
    let machine = MachineBuilder::new("m")
        .initial("off")
        .state(StateConfig::new("off").on("ON", "player.hist"))
        .state(
            StateConfig::new("player")
                .initial("a")
                .state(StateConfig::new("a").on("NEXT", "b"))
                .state(StateConfig::new("b"))
                .state(StateConfig::history("hist"))
                .on("OFF", "off"),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let first = send(&machine, &start, "ON");
    assert!(first.matches("player.a"));

    let visited = send(&machine, &first, "NEXT");
    let away = send(&machine, &visited, "OFF");
    assert!(away.matches("off"));
    let back = send(&machine, &away, "ON");
    assert!(back.matches("player.b"));
}

#[test]
fn deep_history_restores_the_subtree_and_shallow_only_the_child() {
    let machine = MachineBuilder::new("m")
        .initial("c")
        .state(
            StateConfig::new("c")
                .initial("outer")
                .state(
                    StateConfig::new("outer")
                        .initial("inner1")
                        .state(StateConfig::new("inner1").on("N", "inner2"))
                        .state(StateConfig::new("inner2")),
                )
                .state(StateConfig::history("hs"))
                .state(StateConfig::deep_history("hd"))
                .on("LEAVE", "away"),
        )
        .state(
            StateConfig::new("away")
                .on("BACK_SHALLOW", "c.hs")
                .on("BACK_DEEP", "c.hd"),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let inner2 = send(&machine, &start, "N");
    let away = send(&machine, &inner2, "LEAVE");

    let deep = send(&machine, &away, "BACK_DEEP");
    assert!(deep.matches("c.outer.inner2"));

    let away = send(&machine, &deep, "LEAVE");
    let shallow = send(&machine, &away, "BACK_SHALLOW");
    assert!(shallow.matches("c.outer.inner1"));
}

#[test]
fn first_passing_guard_wins() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(
            StateConfig::new("idle")
                .on("GO", TransitionConfig::to("a").when(|_| false))
                .on("GO", TransitionConfig::to("b"))
                .on("GO", TransitionConfig::to("c")),
        )
        .states([StateConfig::new("a"), StateConfig::new("b"), StateConfig::new("c")])
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    assert!(send(&machine, &start, "GO").matches("b"));
}

#[test]
fn failing_guard_does_not_defer_to_parent() {
    let machine = MachineBuilder::new("m")
        .initial("p")
        .state(
            StateConfig::new("p")
                .initial("child")
                .state(StateConfig::new("child").on("GO", TransitionConfig::to("#m.x").when(|_| false)))
                .on("GO", "x"),
        )
        .state(StateConfig::new("x"))
        .state(StateConfig::new("y"))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"GO".into());
    assert!(step.snapshot.matches("p.child"));
    assert!(step.microsteps.is_empty());
}

#[test]
fn unhandled_leaf_defers_to_parent() {
    let machine = MachineBuilder::new("m")
        .initial("p")
        .state(
            StateConfig::new("p")
                .initial("child")
                .state(StateConfig::new("child"))
                .on("GO", "x"),
        )
        .state(StateConfig::new("x"))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    assert!(send(&machine, &start, "GO").matches("x"));
}

#[test]
fn exact_event_type_beats_wildcard() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(
            StateConfig::new("idle")
                .on("*", "caught")
                .on("GO", "specific"),
        )
        .states([StateConfig::new("caught"), StateConfig::new("specific")])
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    assert!(send(&machine, &start, "GO").matches("specific"));
    assert!(send(&machine, &start, "OTHER").matches("caught"));
}

#[test]
fn named_guards_receive_params_and_check_other_regions() {
    let machine = MachineBuilder::new("m")
        .parallel()
        .state(
            StateConfig::new("left")
                .initial("l1")
                .state(StateConfig::new("l1").on("FLIP", "l2"))
                .state(StateConfig::new("l2")),
        )
        .state(
            StateConfig::new("right")
                .initial("r1")
                .state(StateConfig::new("r1").on(
                    "GO",
                    TransitionConfig::to("r2").guard(Guard::and(vec![
                        Guard::in_state("#m.left.l2"),
                        Guard::named_with("atLeast", json!({"min": 3})),
                    ])),
                ))
                .state(StateConfig::new("r2")),
        )
        .context(json!({"count": 5}))
        .implementations(Implementations::new().guard("atLeast", |args| {
            let min = args.params.and_then(|p| p["min"].as_i64()).unwrap_or(0);
            args.context["count"].as_i64().unwrap_or(0) >= min
        }))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    assert!(send(&machine, &start, "GO").matches("right.r1"));

    let flipped = send(&machine, &start, "FLIP");
    assert!(send(&machine, &flipped, "GO").matches("right.r2"));
}

#[test]
fn unresolved_guard_is_fatal_and_keeps_context() {
    let machine = MachineBuilder::new("m")
        .context(json!({"n": 1}))
        .initial("idle")
        .state(StateConfig::new("idle").on("GO", TransitionConfig::to("next").guard(Guard::named("missing"))))
        .state(StateConfig::new("next"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"GO".into());

    assert_eq!(step.snapshot.status(), Status::Error);
    assert_eq!(
        step.snapshot.error(),
        Some(&ExecutionError::UnresolvedReference {
            kind: ReferenceKind::Guard,
            name: "missing".into(),
        })
    );
    assert_eq!(step.snapshot.context(), &json!({"n": 1}));
    assert!(step.snapshot.matches("idle"));
    assert!(step.effects.is_empty());

    let after = machine.transition(&step.snapshot, &"GO".into());
    assert!(after.microsteps.is_empty());
}

#[test]
fn non_event_payload_is_fatal() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(StateConfig::new("idle").on(
            "GO",
            TransitionConfig::internal().action(Action::raise_with(|_| json!(42))),
        ))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"GO".into());
    assert!(matches!(
        step.snapshot.error(),
        Some(ExecutionError::InvalidMessagePayload { .. })
    ));
}

#[test]
fn raised_events_settle_within_the_macrostep() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(StateConfig::new("idle").on("START", "a"))
        .state(StateConfig::new("a").entry(Action::raise("PING")).on("PING", "b"))
        .state(StateConfig::new("b"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"START".into());

    assert!(step.snapshot.matches("b"));
    assert_eq!(step.microsteps.len(), 2);
    assert!(step.microsteps[0].snapshot.matches("a"));
    assert_eq!(step.microsteps[0].snapshot.internal_queue().len(), 1);
    assert_eq!(step.microsteps[1].event.event_type(), "PING");
    assert!(step.snapshot.internal_queue().is_empty());
}

#[test]
fn eventless_transitions_follow_context() {
    let machine = MachineBuilder::new("m")
        .context(json!({"count": 0}))
        .initial("counting")
        .state(
            StateConfig::new("counting")
                .always(TransitionConfig::to("full").when(|args| {
                    args.context["count"].as_i64().unwrap_or(0) >= 2
                }))
                .on(
                    "INC",
                    TransitionConfig::internal().action(Action::assign(|args| {
                        json!({"count": args.context["count"].as_i64().unwrap_or(0) + 1})
                    })),
                ),
        )
        .state(StateConfig::new("full"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let once = send(&machine, &start, "INC");
    assert!(once.matches("counting"));
    let twice = send(&machine, &once, "INC");
    assert!(twice.matches("full"));
}

#[test]
fn eventless_cycle_hits_the_microstep_cap() {
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(StateConfig::new("a").always("b"))
        .state(StateConfig::new("b").always("a"))
        .options(MachineOptions::new().max_microsteps(10))
        .build()
        .unwrap();

    let snapshot = machine.initial_snapshot(&Value::Null);
    assert_eq!(snapshot.status(), Status::Error);
    assert_eq!(
        snapshot.error(),
        Some(&ExecutionError::InfiniteEventlessLoop { limit: 10 })
    );
}

#[test]
fn targetless_eventless_transition_reaches_a_fixed_point() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(
            StateConfig::new("idle")
                .always(TransitionConfig::internal().action(Action::log("tick")))
                .on("GO", "busy"),
        )
        .state(StateConfig::new("busy"))
        .build()
        .unwrap();

    let step = machine.initial_transition(&Value::Null);
    assert_eq!(step.snapshot.status(), Status::Active);
    assert_eq!(step.snapshot.error(), None);
    assert!(step.snapshot.matches("idle"));
    assert_eq!(trace(&step.effects), vec!["tick"]);

    let next = send(&machine, &step.snapshot, "GO");
    assert!(next.matches("busy"));
}

#[test]
fn long_raised_event_chains_are_not_capped() {
    let machine = MachineBuilder::new("m")
        .context(json!({"n": 150}))
        .initial("counting")
        .state(
            StateConfig::new("counting").on(
                "DEC",
                TransitionConfig::internal()
                    .when(|args| args.context["n"].as_i64().unwrap_or(0) > 0)
                    .action(Action::assign(|args| {
                        json!({"n": args.context["n"].as_i64().unwrap_or(0) - 1})
                    }))
                    .action(Action::raise("DEC")),
            ),
        )
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"DEC".into());

    assert_eq!(step.snapshot.status(), Status::Active);
    assert_eq!(step.snapshot.context()["n"], json!(0));
    assert_eq!(step.microsteps.len(), 150);
}

#[test]
fn eventless_cap_counts_only_consecutive_eventless_microsteps() {
    // Each raised STEP resets the count; the eventless hop per STEP stays
    // well under the cap.
    let machine = MachineBuilder::new("m")
        .context(json!({"n": 0}))
        .initial("a")
        .state(
            StateConfig::new("a")
                .always(TransitionConfig::to("b").when(|args| {
                    args.context["n"].as_i64().unwrap_or(0) < 20
                })),
        )
        .state(StateConfig::new("b").entry(Action::assign(|args| {
            json!({"n": args.context["n"].as_i64().unwrap_or(0) + 1})
        }))
        .entry(Action::raise("STEP"))
        .on("STEP", "a"))
        .options(MachineOptions::new().max_microsteps(3))
        .build()
        .unwrap();

    let snapshot = machine.initial_snapshot(&Value::Null);
    assert_eq!(snapshot.status(), Status::Active);
    assert_eq!(snapshot.context()["n"], json!(20));
    assert!(snapshot.matches("a"));
}

#[test]
fn assignments_are_visible_to_later_actions() {
    let machine = MachineBuilder::new("m")
        .context(json!({"count": 0}))
        .initial("idle")
        .state(StateConfig::new("idle").on(
            "INC",
            TransitionConfig::internal()
                .action(Action::assign(|_| json!({"count": 1})))
                .action(Action::log_with("seen", |args| args.context["count"].clone())),
        ))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"INC".into());
    let logged: Vec<_> = step
        .effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::Log { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(logged, vec![json!(1)]);
}

#[test]
fn final_child_triggers_on_done_and_machine_output() {
    let machine = MachineBuilder::new("m")
        .context(json!({"result": "ok"}))
        .initial("work")
        .state(
            StateConfig::new("work")
                .initial("step")
                .state(StateConfig::new("step").on("NEXT", "finished"))
                .state(StateConfig::final_state("finished"))
                .on_done("complete"),
        )
        .state(StateConfig::final_state("complete").entry(Action::log("complete")))
        .output(|args| args.context["result"].clone())
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"NEXT".into());

    assert_eq!(step.snapshot.status(), Status::Done);
    assert_eq!(step.snapshot.output(), Some(&json!("ok")));
    assert!(step.snapshot.matches("complete"));
    assert_eq!(step.microsteps[1].event.event_type(), "xstate.done.state.m.work");
    assert_eq!(trace(&step.effects), vec!["complete"]);
}

#[test]
fn parallel_state_is_done_when_every_region_is_final() {
    let machine = MachineBuilder::new("m")
        .initial("both")
        .state(
            StateConfig::parallel("both")
                .state(
                    StateConfig::new("x")
                        .initial("x1")
                        .state(StateConfig::new("x1").on("X", "xf"))
                        .state(StateConfig::final_state("xf")),
                )
                .state(
                    StateConfig::new("y")
                        .initial("y1")
                        .state(StateConfig::new("y1").on("Y", "yf"))
                        .state(StateConfig::final_state("yf")),
                )
                .on_done("after"),
        )
        .state(StateConfig::new("after"))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let half = send(&machine, &start, "X");
    assert!(half.matches("both.x.xf"));
    let done = send(&machine, &half, "Y");
    assert!(done.matches("after"));
    assert_eq!(done.status(), Status::Active);
}

#[test]
fn stop_self_lets_the_microstep_finish() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(traced("idle").on(
            "QUIT",
            TransitionConfig::internal()
                .action(Action::stop_self())
                .action(Action::log("still running")),
        ))
        .build()
        .unwrap();

    let start = machine.initial_snapshot(&Value::Null);
    let step = machine.transition(&start, &"QUIT".into());
    assert_eq!(step.snapshot.status(), Status::Stopped);
    assert_eq!(trace(&step.effects), vec!["still running"]);
}

#[test]
fn after_schedules_and_cancels_a_keyed_raise() {
    let machine = MachineBuilder::new("m")
        .initial("waiting")
        .state(StateConfig::new("waiting").after(1000, "timeout"))
        .state(StateConfig::new("timeout"))
        .build()
        .unwrap();

    let initial = machine.initial_transition(&Value::Null);
    let key = "xstate.after.1000.m.waiting";
    assert!(initial.effects.iter().any(|effect| matches!(
        effect,
        Effect::Deliver { to: Recipient::SelfActor, delay: Some(delay), id: Some(id), .. }
            if *delay == Duration::from_millis(1000) && id == key
    )));

    let fired = machine.transition(&initial.snapshot, &Event::new(key));
    assert!(fired.snapshot.matches("timeout"));
    assert!(fired
        .effects
        .iter()
        .any(|effect| matches!(effect, Effect::Cancel { id } if id == key)));
}

#[test]
fn named_delay_resolves_through_the_table() {
    let machine = MachineBuilder::new("m")
        .initial("waiting")
        .state(StateConfig::new("waiting").after("patience", "timeout"))
        .state(StateConfig::new("timeout"))
        .implementations(Implementations::new().delay("patience", Duration::from_secs(2)))
        .build()
        .unwrap();

    let initial = machine.initial_transition(&Value::Null);
    assert!(initial.effects.iter().any(|effect| matches!(
        effect,
        Effect::Deliver { delay: Some(delay), .. } if *delay == Duration::from_secs(2)
    )));

    let missing = MachineBuilder::new("m")
        .initial("waiting")
        .state(StateConfig::new("waiting").after("patience", "timeout"))
        .state(StateConfig::new("timeout"))
        .build()
        .unwrap();
    let snapshot = missing.initial_snapshot(&Value::Null);
    assert_eq!(
        snapshot.error(),
        Some(&ExecutionError::UnresolvedReference {
            kind: ReferenceKind::Delay,
            name: "patience".into(),
        })
    );
}

#[test]
fn provide_overrides_implementations() {
    let machine = MachineBuilder::new("m")
        .initial("idle")
        .state(StateConfig::new("idle").on("GO", TransitionConfig::to("next").guard(Guard::named("allowed"))))
        .state(StateConfig::new("next"))
        .implementations(Implementations::new().guard("allowed", |_| false))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    assert!(send(&machine, &start, "GO").matches("idle"));

    let permissive = machine.provide(Implementations::new().guard("allowed", |_| true));
    assert!(send(&permissive, &start, "GO").matches("next"));
}

#[test]
fn tags_follow_the_configuration() {
    let machine = MachineBuilder::new("m")
        .initial("loading")
        .state(StateConfig::new("loading").tag("busy").on("LOADED", "ready"))
        .state(StateConfig::new("ready"))
        .build()
        .unwrap();
    let start = machine.initial_snapshot(&Value::Null);
    assert!(start.has_tag("busy"));
    assert!(!send(&machine, &start, "LOADED").has_tag("busy"));
}

#[test]
fn resolve_state_restores_a_configuration() {
    let machine = MachineBuilder::new("m")
        .initial("a")
        .state(
            StateConfig::new("a")
                .initial("a1")
                .state(StateConfig::new("a1"))
                .state(StateConfig::new("a2").on("GO", "#m.b")),
        )
        .state(StateConfig::new("b"))
        .build()
        .unwrap();

    let restored = machine
        .resolve_state(&StateValue::from_path("a.a2"), json!({}))
        .unwrap();
    assert!(restored.matches("a.a2"));
    assert!(send(&machine, &restored, "GO").matches("b"));

    let invalid = machine.resolve_state(&StateValue::from_path("nope"), json!({}));
    assert!(matches!(invalid, Err(ExecutionError::InvalidStateValue { .. })));
}

#[test]
fn json_definitions_build_the_same_machine() {
    let schema: MachineSchema = serde_json::from_value(json!({
        "id": "light",
        "initial": "green",
        "states": {
            "green": { "on": { "TIMER": "yellow" } },
            "yellow": { "on": { "TIMER": "red" } },
            "red": { "type": "final" }
        }
    }))
    .unwrap();
    let machine = schema.into_builder().build().unwrap();

    let mut snapshot = machine.initial_snapshot(&Value::Null);
    snapshot = send(&machine, &snapshot, "TIMER");
    snapshot = send(&machine, &snapshot, "TIMER");
    assert!(snapshot.matches("red"));
    assert_eq!(snapshot.status(), Status::Done);
}
