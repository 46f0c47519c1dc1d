//! Driver scenarios: linear chains, branches, merges, cycles, sentinel
//! stripping, cancellation and failure handling.

use hyperway::graph::Graph;
use hyperway::pack::ArgPack;
use hyperway::stepper::{run_to_exhaustion, Row, StepError, StepperConfig};
use hyperway::unit::{LeafPolicy, UnitId};
use hyperway::utils::collections::kwargs;
use hyperway::utils::testing::{
    adder, bare_value_wire, doubler_wire, failing_unit, failing_wire, nullary, printer,
};
use serde_json::{json, Value};

/// Build the branch topology shared by the merge scenarios:
/// `add_1` fans out to `add_3` and `add_4`, both feeding `printer`.
fn branch_graph(merge_sink: bool) -> (Graph, UnitId, UnitId) {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let left = graph.as_unit(adder(3));
    let right = graph.as_unit(adder(4));
    let sink_unit = if merge_sink { printer().merge() } else { printer() };
    let sink = graph.as_unit(sink_unit);
    graph.add(start, left);
    graph.add(start, right);
    graph.add(left, sink);
    graph.add(right, sink);
    (graph, start, sink)
}

#[test]
fn linear_chain_exhausts_in_five_steps() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(10));
    let edges = graph.chain([start.into(), adder(20).into(), adder(30).into()]);
    let sink = graph.get_edge(edges[1]).expect("edge").b();

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(10));

    let mut steps = 0;
    loop {
        let report = stepper.step().expect("step");
        steps += 1;
        if report.completed {
            break;
        }
    }

    assert_eq!(steps, 5);
    assert_eq!(stepper.stash().get(sink), &[ArgPack::of(70)]);
    assert_eq!(stepper.stash().total(), 1);
}

#[test]
fn pluck_with_wire_runs_both_halves() {
    let mut graph = Graph::new();
    let e = graph
        .connect(adder(1), adder(2))
        .wire(doubler_wire())
        .finish();
    let edge = graph.edge(e).expect("edge");

    assert_eq!(edge.pluck(&ArgPack::of(1)).unwrap(), ArgPack::of(6));
    assert_eq!(edge.pluck(&ArgPack::of(10)).unwrap(), ArgPack::of(24));
}

#[test]
fn self_loop_cycles_forever_under_step_bound() {
    let mut graph = Graph::new();
    let u = graph.as_unit(adder(2));
    graph.add(u, u);

    let mut stepper = graph.stepper();
    stepper.prepare(u, ArgPack::of(1));

    // Odd steps invoke the unit; their produced partials carry the
    // successive results 3, 5, 7.
    let mut seen: Vec<Value> = Vec::new();
    for _ in 0..3 {
        let invoked = stepper.step().expect("unit step");
        seen.push(invoked.produced[0].pack().first().cloned().expect("value"));
        let resolved = stepper.step().expect("partial step");
        assert!(!resolved.completed);
    }
    assert_eq!(seen, vec![json!(3), json!(5), json!(7)]);
    assert!(stepper.stash().is_empty());
}

#[test]
fn run_with_max_steps_returns_after_exactly_that_many() {
    let mut graph = Graph::new();
    let u = graph.as_unit(adder(2));
    graph.add(u, u);

    let mut stepper = graph.stepper();
    stepper.prepare(u, ArgPack::of(1));
    stepper.run(Some(6)).expect("bounded run");

    assert_eq!(stepper.current_step(), 6);
    assert!(stepper.stash().is_empty());
    assert!(!stepper.rows().is_empty());
}

#[test]
fn branch_without_merge_stashes_one_pack_per_path() {
    let (graph, start, sink) = branch_graph(false);
    let stash = run_to_exhaustion(&graph, start, ArgPack::of(0), None).expect("run");

    assert_eq!(stash.get(sink), &[ArgPack::of(4), ArgPack::of(5)]);
}

#[test]
fn branch_with_merge_folds_into_one_invocation() {
    let (graph, start, sink) = branch_graph(true);
    let mut stepper = graph.stepper_with(StepperConfig {
        merge_aware: true,
        ..Default::default()
    });
    stepper.prepare(start, ArgPack::of(0));
    stepper.run(None).expect("run");

    let expected = ArgPack::new(vec![json!(4), json!(5)], Default::default());
    assert_eq!(stepper.stash().get(sink), &[expected]);
}

#[test]
fn merge_flag_alone_is_inert_without_awareness() {
    // A merge-marked sink under a default stepper still sees two calls.
    let (graph, start, sink) = branch_graph(true);
    let stash = run_to_exhaustion(&graph, start, ArgPack::of(0), None).expect("run");
    assert_eq!(stash.get(sink).len(), 2);
}

#[test]
fn broadcast_merge_keeps_one_row_per_member() {
    let (graph, start, sink) = branch_graph(true);
    let mut stepper = graph.stepper_with(StepperConfig {
        merge_aware: true,
        broadcast_merge: true,
        ..Default::default()
    });
    stepper.prepare(start, ArgPack::of(0));
    stepper.run(None).expect("run");

    // Both members survive, each carrying the folded pack.
    let folded = ArgPack::new(vec![json!(4), json!(5)], Default::default());
    assert_eq!(stepper.stash().get(sink), &[folded.clone(), folded]);
}

#[test]
fn sentinel_null_is_stripped_before_invocation() {
    let mut graph = Graph::new();
    let u = graph.as_unit(nullary(42).with_sentinel(Value::Null));

    let stash = run_to_exhaustion(&graph, u, ArgPack::of(Value::Null), None).expect("run");
    assert_eq!(stash.get(u), &[ArgPack::of(42)]);
}

#[test]
fn seed_without_outgoing_edges_stashes_and_terminates() {
    let mut graph = Graph::new();
    let lonely = graph.as_unit(adder(5));

    let mut stepper = graph.stepper();
    stepper.prepare(lonely, ArgPack::of(1));
    let report = stepper.step().expect("step");

    assert!(report.completed);
    assert_eq!(report.stashed, vec![lonely]);
    assert_eq!(stepper.stash().get(lonely), &[ArgPack::of(6)]);
}

#[test]
fn discard_leaf_policy_suppresses_stash() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let sink = graph.as_unit(printer().with_leaf_policy(LeafPolicy::Discard));
    graph.add(start, sink);

    let stash = run_to_exhaustion(&graph, start, ArgPack::of(0), None).expect("run");
    assert!(stash.is_empty());
}

#[test]
fn callable_failure_propagates_and_drops_successors() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let bad = graph.as_unit(failing_unit());
    let sink = graph.as_unit(printer());
    graph.add(start, bad);
    graph.add(bad, sink);

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(0));
    stepper.step().expect("invoke start");
    stepper.step().expect("resolve partial");
    let err = stepper.step().expect_err("failing unit");

    assert!(matches!(err, StepError::UnitRun { unit, .. } if unit == bad));
    assert!(stepper.rows().is_empty());
    assert!(stepper.stash().is_empty());
}

#[test]
fn wire_contract_violation_leaves_partial_queue() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let good = graph.as_unit(printer());
    let bad_target = graph.as_unit(printer());
    graph.add(start, good);
    graph
        .connect(start, bad_target)
        .wire(bare_value_wire())
        .finish();

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(0));
    stepper.step().expect("fan out");
    let err = stepper.step().expect_err("bad wire");

    assert!(matches!(err, StepError::WireContract { .. }));
    // The good edge's successor survives in the queue for inspection.
    assert_eq!(stepper.rows().len(), 1);
    assert!(matches!(stepper.rows()[0], Row::Unit { unit, .. } if unit == good));
}

#[test]
fn wire_failure_is_distinct_from_contract_violation() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let sink = graph.as_unit(printer());
    let e = graph.connect(start, sink).wire(failing_wire()).finish();

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(0));
    stepper.step().expect("invoke start");
    let err = stepper.step().expect_err("wire failure");

    assert!(matches!(err, StepError::WireRun { edge, .. } if edge == e));
    assert!(stepper.rows().is_empty());
}

#[test]
fn cancellation_is_observed_and_reversible() {
    let mut graph = Graph::new();
    let u = graph.as_unit(adder(2));
    graph.add(u, u);

    let mut stepper = graph.stepper();
    stepper.prepare(u, ArgPack::of(1));
    stepper.step().expect("first step");

    stepper.cancel();
    let queue_before: Vec<Row> = stepper.rows().to_vec();
    let report = stepper.step().expect("cancelled step");
    assert!(report.cancelled);
    assert!(report.produced.is_empty());
    assert_eq!(stepper.rows(), queue_before.as_slice());

    // Resume continues from the intact queue.
    stepper.resume();
    let report = stepper.step().expect("resumed step");
    assert!(!report.cancelled);
    assert_eq!(report.produced.len(), 1);
}

#[test]
fn run_breaks_on_cancellation() {
    let mut graph = Graph::new();
    let u = graph.as_unit(adder(2));
    graph.add(u, u);

    let mut stepper = graph.stepper();
    stepper.prepare(u, ArgPack::of(1));
    stepper.cancel();
    stepper.run(None).expect("run observes cancellation");
    assert_eq!(stepper.current_step(), 0);
}

#[test]
fn step_before_prepare_is_an_error() {
    let graph = Graph::new();
    let mut stepper = graph.stepper();
    assert!(matches!(stepper.step(), Err(StepError::NotPrepared)));
}

#[test]
fn foreign_unit_handle_is_rejected() {
    let mut other = Graph::new();
    other.as_unit(adder(1));
    let foreign = other.as_unit(adder(2));

    let mut graph = Graph::new();
    graph.as_unit(adder(1));

    let mut stepper = graph.stepper();
    stepper.prepare(foreign, ArgPack::of(0));
    assert!(matches!(
        stepper.step(),
        Err(StepError::UnknownUnit { unit }) if unit == foreign
    ));
}

#[test]
fn prepare_many_seeds_independent_rows() {
    let mut graph = Graph::new();
    let a = graph.as_unit(adder(1));
    let b = graph.as_unit(adder(2));

    let mut stepper = graph.stepper();
    stepper.prepare_many(&[a, b], ArgPack::of(10));
    stepper.run(None).expect("run");

    assert_eq!(stepper.stash().get(a), &[ArgPack::of(11)]);
    assert_eq!(stepper.stash().get(b), &[ArgPack::of(12)]);
}

#[test]
fn seeded_leaf_row_goes_straight_to_stash() {
    let mut graph = Graph::new();
    let sink = graph.as_unit(printer());

    let mut stepper = graph.stepper();
    stepper.seed_rows(vec![Row::Leaf {
        unit: sink,
        pack: ArgPack::of(9),
    }]);
    let report = stepper.step().expect("leaf step");

    // The leaf is terminal: stashed on this step, no successor produced.
    assert!(report.completed);
    assert_eq!(report.stashed, vec![sink]);
    assert_eq!(stepper.stash().get(sink), &[ArgPack::of(9)]);
}

#[test]
fn steps_iterator_yields_every_report() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(10));
    graph.chain([start.into(), adder(20).into(), adder(30).into()]);

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(10));

    let reports: Vec<_> = stepper
        .steps(None)
        .collect::<Result<Vec<_>, _>>()
        .expect("reports");
    assert_eq!(reports.len(), 5);
    assert!(reports.last().expect("last").completed);
}

#[test]
fn steps_iterator_respects_bound() {
    let mut graph = Graph::new();
    let u = graph.as_unit(adder(2));
    graph.add(u, u);

    let mut stepper = graph.stepper();
    stepper.prepare(u, ArgPack::of(1));
    assert_eq!(stepper.steps(Some(4)).count(), 4);
}

#[test]
fn flush_drains_stash_between_runs() {
    let mut graph = Graph::new();
    let start = graph.as_unit(adder(1));
    let sink = graph.as_unit(printer());
    graph.add(start, sink);

    let mut stepper = graph.stepper();
    stepper.prepare(start, ArgPack::of(0));
    stepper.run(None).expect("first run");

    let drained = stepper.stash_mut().flush();
    assert_eq!(drained, vec![(sink, vec![ArgPack::of(1)])]);
    assert!(stepper.stash().is_empty());

    stepper.prepare(start, ArgPack::of(10));
    stepper.run(None).expect("second run");
    assert_eq!(stepper.stash().get(sink), &[ArgPack::of(11)]);
}

#[test]
fn kwargs_survive_the_whole_path() {
    let mut graph = Graph::new();
    let start = graph.as_unit(printer());
    let sink = graph.as_unit(printer());
    graph.add(start, sink);

    let seed = ArgPack::of(1).with_kwarg("trace_id", "abc");
    let stash = run_to_exhaustion(&graph, start, seed.clone(), None).expect("run");
    assert_eq!(stash.get(sink), &[seed]);
}

#[test]
fn merge_fold_applies_kwargs_last_write_wins() {
    let mut graph = Graph::new();
    let sink = graph.as_unit(printer().merge());

    let mut stepper = graph.stepper_with(StepperConfig {
        merge_aware: true,
        ..Default::default()
    });
    stepper.seed_rows(vec![
        Row::Unit {
            unit: sink,
            pack: ArgPack::new(vec![json!(4)], kwargs([("mode", json!("first"))])),
        },
        Row::Unit {
            unit: sink,
            pack: ArgPack::new(vec![json!(5)], kwargs([("mode", json!("second"))])),
        },
    ]);
    let report = stepper.step().expect("fold step");
    assert_eq!(report.folded, 1);

    let stashed = stepper.stash().get(sink);
    assert_eq!(stashed.len(), 1);
    assert_eq!(stashed[0].args(), &[json!(4), json!(5)]);
    assert_eq!(stashed[0].kwargs()["mode"], json!("second"));
}
