//! The execution driver: row queue, fan-out, merge folding, stash and
//! cancellation.
//!
//! A [`Stepper`] is seeded with one row `(unit, pack)` and advances the
//! graph one round at a time. Each [`step`](Stepper::step) consumes the
//! current row set and produces the next one:
//!
//! - a [`Row::Unit`] invokes its unit; the result fans out as one
//!   [`Row::Partial`] per outgoing edge, or becomes a [`Row::Leaf`] when
//!   the unit has no outgoing edges;
//! - a [`Row::Partial`] applies the edge's wire (if any) and enqueues a
//!   [`Row::Unit`] for the target, so a step boundary lies between
//!   source-invocation and wire-then-target;
//! - a [`Row::Leaf`] is written to the [`Stash`] and contributes no
//!   successor.
//!
//! Scheduling is single-threaded and cooperative: each step runs to
//! completion synchronously on the caller's thread, and "concurrent" means
//! the logical fan-out across paths. The graph is treated as immutable
//! during a run; the stepper owns its queue and stash exclusively, so
//! multiple steppers over one graph are independent.
//!
//! A run is complete when a step produces an empty row set. Cyclic graphs
//! never complete on their own; bound them with
//! [`run`](Stepper::run)'s `max_steps`.
//!
//! # Examples
//!
//! ```rust
//! use hyperway::graph::Graph;
//! use hyperway::pack::ArgPack;
//! use hyperway::utils::testing::adder;
//!
//! let mut graph = Graph::new();
//! let start = graph.as_unit(adder(10));
//! let edges = graph.chain([start.into(), adder(20).into(), adder(30).into()]);
//! let sink = graph.get_edge(edges[1]).expect("edge").b();
//!
//! let mut stepper = graph.stepper();
//! stepper.prepare(start, ArgPack::of(10));
//! stepper.run(None).unwrap();
//!
//! assert_eq!(stepper.stash().get(sink), &[ArgPack::of(70)]);
//! ```

pub mod expand;
pub mod stash;

pub use stash::Stash;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::edge::EdgeId;
use crate::graph::Graph;
use crate::pack::{ArgPack, Packable};
use crate::unit::{CallableError, LeafPolicy, UnitId};

use expand::ExpandFn;

/// One scheduled work item in the driver's queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Row {
    /// Invoke `unit` on `pack` next step.
    Unit { unit: UnitId, pack: ArgPack },
    /// Apply the edge's wire (if any) to `pack`, then enqueue the target.
    Partial { edge: EdgeId, pack: ArgPack },
    /// Terminal: written to the stash, never re-enqueued.
    Leaf { unit: UnitId, pack: ArgPack },
}

impl Row {
    /// The pack this row carries.
    #[must_use]
    pub fn pack(&self) -> &ArgPack {
        match self {
            Row::Unit { pack, .. } | Row::Partial { pack, .. } | Row::Leaf { pack, .. } => pack,
        }
    }
}

/// Errors surfaced by the driver.
///
/// A failing row is consumed: its successors are not enqueued, and the
/// queue is left holding the successors already produced this step followed
/// by the unconsumed remainder of the input rows, so state can be
/// inspected.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// A wire returned a bare value instead of an argument pack.
    #[error("wire on edge {edge} returned a bare value instead of an argument pack (step {step})")]
    #[diagnostic(
        code(hyperway::stepper::wire_contract),
        help("Wires must return an ArgPack; build them with edge::wire or wrap the value explicitly.")
    )]
    WireContract { edge: EdgeId, step: u64 },

    /// A unit's callable failed.
    #[error("unit {unit} failed at step {step}")]
    #[diagnostic(code(hyperway::stepper::unit_run))]
    UnitRun {
        unit: UnitId,
        step: u64,
        #[source]
        source: CallableError,
    },

    /// A wire callable failed.
    #[error("wire on edge {edge} failed at step {step}")]
    #[diagnostic(code(hyperway::stepper::wire_run))]
    WireRun {
        edge: EdgeId,
        step: u64,
        #[source]
        source: CallableError,
    },

    /// A row referenced a unit this graph never minted.
    #[error("row references unknown unit {unit}")]
    #[diagnostic(
        code(hyperway::stepper::unknown_unit),
        help("UnitIds are only valid for the graph that produced them.")
    )]
    UnknownUnit { unit: UnitId },

    /// A row referenced an edge this graph never minted.
    #[error("row references unknown edge {edge}")]
    #[diagnostic(
        code(hyperway::stepper::unknown_edge),
        help("EdgeIds are only valid for the graph that produced them.")
    )]
    UnknownEdge { edge: EdgeId },

    /// `step()` was called before any seed was prepared.
    #[error("step() called before prepare()")]
    #[diagnostic(
        code(hyperway::stepper::unprepared),
        help("Call prepare() with a start unit and an initial pack first.")
    )]
    NotPrepared,
}

/// Driver configuration, injected at construction.
#[derive(Clone)]
pub struct StepperConfig {
    /// Fold concurrent arrivals at merge-marked units into one invocation
    /// per step.
    pub merge_aware: bool,
    /// Instead of collapsing a fold group to a single row, keep one row per
    /// group member, each carrying the folded pack.
    pub broadcast_merge: bool,
    /// Strategy used to flatten per-row successor batches into the next
    /// queue. Defaults to [`expand::accumulate`].
    pub expand: ExpandFn,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            merge_aware: false,
            broadcast_merge: false,
            expand: Arc::new(expand::accumulate),
        }
    }
}

impl fmt::Debug for StepperConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepperConfig")
            .field("merge_aware", &self.merge_aware)
            .field("broadcast_merge", &self.broadcast_merge)
            .finish_non_exhaustive()
    }
}

/// Result of executing one step.
#[derive(Clone, Debug)]
pub struct StepReport {
    /// The step number, starting at 1.
    pub step: u64,
    /// The rows produced into the next queue, in order.
    pub produced: Vec<Row>,
    /// Units whose terminal packs were stashed this step.
    pub stashed: Vec<UnitId>,
    /// Number of fold groups collapsed by merge awareness this step.
    pub folded: usize,
    /// The stepper was cancelled; the queue is intact and nothing ran.
    pub cancelled: bool,
    /// No rows remain: the run is complete.
    pub completed: bool,
}

/// The cooperative single-threaded driver.
///
/// Holds a borrow of the graph plus its own row queue and stash. See the
/// [module documentation](self) for the step semantics.
pub struct Stepper<'g> {
    graph: &'g Graph,
    rows: Vec<Row>,
    stash: Stash,
    config: StepperConfig,
    cancelled: bool,
    prepared: bool,
    step: u64,
}

impl<'g> Stepper<'g> {
    /// Create a stepper with default configuration.
    #[must_use]
    pub fn new(graph: &'g Graph) -> Self {
        Self::with_config(graph, StepperConfig::default())
    }

    /// Create a stepper with explicit configuration.
    #[must_use]
    pub fn with_config(graph: &'g Graph, config: StepperConfig) -> Self {
        Self {
            graph,
            rows: Vec::new(),
            stash: Stash::new(),
            config,
            cancelled: false,
            prepared: false,
            step: 0,
        }
    }

    /// Seed the queue with a single `(unit, pack)` row.
    ///
    /// The start unit does not need any outgoing edges; a bare seed
    /// produces a single stash entry and terminates.
    pub fn prepare(&mut self, start: UnitId, pack: ArgPack) {
        self.rows = vec![Row::Unit { unit: start, pack }];
        self.prepared = true;
    }

    /// Seed the queue with several start units sharing one pack, in order.
    pub fn prepare_many(&mut self, starts: &[UnitId], pack: ArgPack) {
        self.rows = starts
            .iter()
            .map(|&unit| Row::Unit {
                unit,
                pack: pack.clone(),
            })
            .collect();
        self.prepared = true;
    }

    /// Seed the queue with explicit rows.
    pub fn seed_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.prepared = true;
    }

    /// The current queue: the rows the next `step()` will consume.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The terminal results accumulated so far.
    #[must_use]
    pub fn stash(&self) -> &Stash {
        &self.stash
    }

    /// Mutable access to the stash, e.g. for [`Stash::flush`].
    pub fn stash_mut(&mut self) -> &mut Stash {
        &mut self.stash
    }

    /// Consume the stepper, keeping only its stash.
    #[must_use]
    pub fn into_stash(self) -> Stash {
        self.stash
    }

    /// The number of steps executed so far.
    #[must_use]
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Request cooperative cancellation: subsequent steps return empty
    /// reports and leave the queue intact for inspection. No in-flight row
    /// is abandoned; cancellation only affects future steps.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Clear a previous cancellation; stepping resumes from the intact
    /// queue.
    pub fn resume(&mut self) {
        self.cancelled = false;
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Execute one step: consume the current row set, produce the next.
    ///
    /// Returns a report whose `produced` field holds the new queue
    /// contents, so callers can drive to exhaustion by looping until it is
    /// empty.
    #[instrument(skip(self), err)]
    pub fn step(&mut self) -> Result<StepReport, StepError> {
        if self.cancelled {
            debug!(step = self.step, "step observed cancellation");
            return Ok(StepReport {
                step: self.step,
                produced: Vec::new(),
                stashed: Vec::new(),
                folded: 0,
                cancelled: true,
                completed: false,
            });
        }
        if !self.prepared {
            return Err(StepError::NotPrepared);
        }

        self.step += 1;
        let step = self.step;

        let input = std::mem::take(&mut self.rows);
        let (input, folded) = if self.config.merge_aware {
            self.fold_rows(input)
        } else {
            (input, 0)
        };
        if folded > 0 {
            debug!(step, folded, "merge folding applied");
        }

        let mut batches: Vec<Vec<Row>> = Vec::with_capacity(input.len());
        let mut stashed: Vec<UnitId> = Vec::new();
        let mut iter = input.into_iter();
        while let Some(row) = iter.next() {
            match self.resolve_row(row, step) {
                Ok(successors) => {
                    let mut batch = Vec::with_capacity(successors.len());
                    for successor in successors {
                        match successor {
                            Row::Leaf { unit, pack } => {
                                if self.stash_leaf(unit, pack)? {
                                    stashed.push(unit);
                                }
                            }
                            other => batch.push(other),
                        }
                    }
                    batches.push(batch);
                }
                Err(err) => {
                    // Leave the queue in its documented partial form: the
                    // successors produced so far, then the unconsumed input.
                    let mut queue = (self.config.expand)(batches);
                    queue.extend(iter);
                    self.rows = queue;
                    return Err(err);
                }
            }
        }

        self.rows = (self.config.expand)(batches);
        let produced = self.rows.clone();
        debug!(
            step,
            produced = produced.len(),
            stashed = stashed.len(),
            "step complete"
        );
        Ok(StepReport {
            step,
            produced,
            stashed,
            folded,
            cancelled: false,
            completed: self.rows.is_empty(),
        })
    }

    /// Step until the produced row set is empty, cancellation is observed,
    /// or `max_steps` is reached; return the stash.
    #[instrument(skip(self))]
    pub fn run(&mut self, max_steps: Option<u64>) -> Result<&Stash, StepError> {
        let mut taken: u64 = 0;
        loop {
            if let Some(max) = max_steps {
                if taken >= max {
                    debug!(taken, "step bound reached");
                    break;
                }
            }
            let report = self.step()?;
            taken += 1;
            if report.completed || report.cancelled {
                break;
            }
        }
        Ok(&self.stash)
    }

    /// Iterate step reports, stopping after completion, cancellation, an
    /// error, or `max_steps` reports.
    pub fn steps(&mut self, max_steps: Option<u64>) -> Steps<'_, 'g> {
        Steps {
            stepper: self,
            remaining: max_steps,
            done: false,
        }
    }

    fn is_merge_unit(&self, unit: UnitId) -> bool {
        self.graph
            .get_unit(unit)
            .is_some_and(|u| u.is_merge_node())
    }

    /// Fold concurrent unit rows targeting the same merge-marked unit.
    ///
    /// Only `Row::Unit` rows participate; partials resolve first and fold
    /// on the following step. The folded row sits at the group's
    /// first-occurrence position, its pack the row-concat of the members in
    /// arrival order.
    fn fold_rows(&self, rows: Vec<Row>) -> (Vec<Row>, usize) {
        enum Slot {
            Single(Row),
            Group {
                unit: UnitId,
                members: usize,
                packs: Vec<ArgPack>,
            },
        }

        let mut slots: Vec<Slot> = Vec::with_capacity(rows.len());
        let mut index: FxHashMap<UnitId, usize> = FxHashMap::default();
        for row in rows {
            match row {
                Row::Unit { unit, pack } if self.is_merge_unit(unit) => {
                    if let Some(&at) = index.get(&unit) {
                        if let Slot::Group { members, packs, .. } = &mut slots[at] {
                            *members += 1;
                            packs.push(pack);
                        }
                    } else {
                        index.insert(unit, slots.len());
                        slots.push(Slot::Group {
                            unit,
                            members: 1,
                            packs: vec![pack],
                        });
                    }
                }
                other => slots.push(Slot::Single(other)),
            }
        }

        let mut out: Vec<Row> = Vec::with_capacity(slots.len());
        let mut folded = 0;
        for slot in slots {
            match slot {
                Slot::Single(row) => out.push(row),
                Slot::Group {
                    unit,
                    members,
                    packs,
                } => {
                    if members > 1 {
                        folded += 1;
                    }
                    let pack = ArgPack::concat(packs);
                    if self.config.broadcast_merge {
                        for _ in 0..members {
                            out.push(Row::Unit {
                                unit,
                                pack: pack.clone(),
                            });
                        }
                    } else {
                        out.push(Row::Unit { unit, pack });
                    }
                }
            }
        }
        (out, folded)
    }

    fn resolve_row(&self, row: Row, step: u64) -> Result<Vec<Row>, StepError> {
        match row {
            Row::Unit { unit, pack } => {
                let u = self
                    .graph
                    .get_unit(unit)
                    .ok_or(StepError::UnknownUnit { unit })?;
                let result = u.invoke(&pack).map_err(|source| StepError::UnitRun {
                    unit,
                    step,
                    source,
                })?;
                let out = self.graph.outgoing(unit);
                if out.is_empty() {
                    trace!(step, unit = %unit, "unit is a leaf");
                    Ok(vec![Row::Leaf { unit, pack: result }])
                } else {
                    trace!(step, unit = %unit, fan_out = out.len(), "unit fans out");
                    Ok(out
                        .iter()
                        .map(|&edge| Row::Partial {
                            edge,
                            pack: result.clone(),
                        })
                        .collect())
                }
            }
            Row::Partial { edge, pack } => {
                let e = self
                    .graph
                    .get_edge(edge)
                    .ok_or(StepError::UnknownEdge { edge })?;
                let mid = match e.wire() {
                    Some(w) => match w(&pack) {
                        Ok(Packable::Pack(mid)) => mid,
                        Ok(Packable::Value(_)) => {
                            return Err(StepError::WireContract { edge, step })
                        }
                        Err(source) => return Err(StepError::WireRun { edge, step, source }),
                    },
                    None => pack,
                };
                Ok(vec![Row::Unit {
                    unit: e.b(),
                    pack: mid,
                }])
            }
            // A leaf fed back through the queue stays terminal.
            leaf @ Row::Leaf { .. } => Ok(vec![leaf]),
        }
    }

    fn stash_leaf(&mut self, unit: UnitId, pack: ArgPack) -> Result<bool, StepError> {
        let policy = self
            .graph
            .get_unit(unit)
            .ok_or(StepError::UnknownUnit { unit })?
            .leaf_policy();
        match policy {
            LeafPolicy::Stash => {
                self.stash.put(unit, pack);
                Ok(true)
            }
            LeafPolicy::Discard => {
                debug!(unit = %unit, "leaf discarded without stashing");
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for Stepper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stepper")
            .field("rows", &self.rows.len())
            .field("stash", &self.stash.total())
            .field("step", &self.step)
            .field("cancelled", &self.cancelled)
            .field("config", &self.config)
            .finish()
    }
}

/// Iterator over step reports; see [`Stepper::steps`].
///
/// Fused: after the run completes, is cancelled, errors, or the step bound
/// is reached, the iterator yields `None` forever.
pub struct Steps<'s, 'g> {
    stepper: &'s mut Stepper<'g>,
    remaining: Option<u64>,
    done: bool,
}

impl Iterator for Steps<'_, '_> {
    type Item = Result<StepReport, StepError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(remaining) = &mut self.remaining {
            if *remaining == 0 {
                self.done = true;
                return None;
            }
            *remaining -= 1;
        }
        match self.stepper.step() {
            Ok(report) => {
                if report.completed || report.cancelled {
                    self.done = true;
                }
                Some(Ok(report))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Prepare a fresh stepper, drive it to exhaustion (or `max_steps`), and
/// return the stash.
///
/// # Examples
///
/// ```rust
/// use hyperway::graph::Graph;
/// use hyperway::pack::ArgPack;
/// use hyperway::stepper::run_to_exhaustion;
/// use hyperway::utils::testing::adder;
///
/// let mut graph = Graph::new();
/// let start = graph.as_unit(adder(10));
/// let sink = graph.as_unit(adder(20));
/// graph.add(start, sink);
///
/// let stash = run_to_exhaustion(&graph, start, ArgPack::of(0), None).unwrap();
/// assert_eq!(stash.get(sink), &[ArgPack::of(30)]);
/// ```
pub fn run_to_exhaustion(
    graph: &Graph,
    start: UnitId,
    pack: ArgPack,
    max_steps: Option<u64>,
) -> Result<Stash, StepError> {
    let mut stepper = graph.stepper();
    stepper.prepare(start, pack);
    stepper.run(max_steps)?;
    Ok(stepper.into_stash())
}
