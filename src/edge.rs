//! Edges: ordered connections from a source unit, through an optional wire,
//! to a target unit.
//!
//! An edge supports two-phase execution. `invoke_a` runs the source unit;
//! `transfer` applies the wire (if any) and then the target unit; `pluck`
//! composes the two for direct, graph-less edge execution. The phase
//! separation is the point of the design: the stepper schedules a pending
//! partial row *between* the two halves, which makes every edge a
//! breakpoint and lets concurrent paths interleave without lock-step
//! between source and target.
//!
//! Wires are pure functions from pack to pack in the engine's eyes. A wire
//! that returns a bare value instead of a pack violates its contract and
//! surfaces as [`EdgeError::WireContract`].

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::graph::Graph;
use crate::pack::{ArgPack, Packable};
use crate::unit::{CallableError, UnitId};

/// Handle of an edge inside its graph's arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Boxed wire transform stored on an edge.
///
/// The contract: a wire receives a pack and must return a pack
/// ([`Packable::Pack`]). Returning a bare value is a programming error and
/// surfaces as a distinct failure kind. The [`wire`] helper lifts an
/// infallible `Fn(&ArgPack) -> ArgPack` into this shape and cannot violate
/// the contract.
pub type WireFn =
    Arc<dyn Fn(&ArgPack) -> Result<Packable, CallableError> + Send + Sync + 'static>;

/// Lift a plain pack-to-pack function into a contract-safe [`WireFn`].
///
/// # Examples
///
/// ```rust
/// use hyperway::edge::wire;
/// use hyperway::pack::ArgPack;
/// use serde_json::Value;
///
/// let doubler = wire(|pack: &ArgPack| {
///     let v = pack.first().and_then(Value::as_i64).unwrap_or(0);
///     ArgPack::of(v * 2)
/// });
/// ```
pub fn wire<F>(f: F) -> WireFn
where
    F: Fn(&ArgPack) -> ArgPack + Send + Sync + 'static,
{
    Arc::new(move |pack| Ok(Packable::Pack(f(pack))))
}

/// Errors surfaced by direct edge execution.
#[derive(Debug, Error, Diagnostic)]
pub enum EdgeError {
    /// The wire returned a bare value instead of a pack.
    #[error("wire on edge {edge} returned a bare value instead of an argument pack")]
    #[diagnostic(
        code(hyperway::edge::wire_contract),
        help("Wires must return an ArgPack; build them with edge::wire or wrap the value explicitly.")
    )]
    WireContract { edge: EdgeId },

    /// The wire callable itself failed.
    #[error("wire on edge {edge} failed")]
    #[diagnostic(code(hyperway::edge::wire_run))]
    Wire {
        edge: EdgeId,
        #[source]
        source: CallableError,
    },

    /// One of the edge's units failed.
    #[error("unit {unit} failed during edge execution")]
    #[diagnostic(code(hyperway::edge::unit_run))]
    Unit {
        unit: UnitId,
        #[source]
        source: CallableError,
    },
}

/// An ordered relation `a -> wire? -> b` stored in the graph's edge arena.
///
/// Self-loops are permitted, and parallel edges between the same pair each
/// execute independently. The optional `name` exists purely for user-side
/// selection; the engine does not interpret it.
#[derive(Clone)]
pub struct Edge {
    a: UnitId,
    b: UnitId,
    wire: Option<WireFn>,
    name: Option<String>,
}

impl Edge {
    pub(crate) fn new(a: UnitId, b: UnitId, wire: Option<WireFn>, name: Option<String>) -> Self {
        Self { a, b, wire, name }
    }

    /// The source unit.
    #[must_use]
    pub fn a(&self) -> UnitId {
        self.a
    }

    /// The target unit.
    #[must_use]
    pub fn b(&self) -> UnitId {
        self.b
    }

    /// The user-facing edge name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The in-transit transform, if any.
    #[must_use]
    pub fn wire(&self) -> Option<&WireFn> {
        self.wire.as_ref()
    }

    /// Whether a wire is attached.
    #[must_use]
    pub fn has_wire(&self) -> bool {
        self.wire.is_some()
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("a", &self.a)
            .field("b", &self.b)
            .field("wired", &self.wire.is_some())
            .field("name", &self.name)
            .finish()
    }
}

/// A borrowed view of one edge, bound to its graph so the two-phase
/// operations can resolve the endpoint units.
///
/// Obtained from [`Graph::edge`](crate::graph::Graph::edge).
///
/// # Examples
///
/// ```rust
/// use hyperway::graph::Graph;
/// use hyperway::pack::ArgPack;
/// use hyperway::utils::testing::adder;
///
/// let mut graph = Graph::new();
/// let e = graph.add(adder(1), adder(2));
/// let edge = graph.edge(e).expect("edge exists");
///
/// // Both halves end-to-end: (1 + 1) + 2 = 4.
/// assert_eq!(edge.pluck(&ArgPack::of(1)).unwrap(), ArgPack::of(4));
/// ```
#[derive(Clone, Copy)]
pub struct EdgeRef<'g> {
    graph: &'g Graph,
    id: EdgeId,
    edge: &'g Edge,
}

impl<'g> EdgeRef<'g> {
    pub(crate) fn new(graph: &'g Graph, id: EdgeId, edge: &'g Edge) -> Self {
        Self { graph, id, edge }
    }

    /// This edge's handle.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// The source unit.
    #[must_use]
    pub fn a(&self) -> UnitId {
        self.edge.a()
    }

    /// The target unit.
    #[must_use]
    pub fn b(&self) -> UnitId {
        self.edge.b()
    }

    /// The user-facing edge name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.edge.name()
    }

    /// Whether a wire is attached.
    #[must_use]
    pub fn has_wire(&self) -> bool {
        self.edge.has_wire()
    }

    /// Invoke the source unit with the given pack and return its result.
    pub fn invoke_a(&self, pack: &ArgPack) -> Result<ArgPack, EdgeError> {
        let a = self.edge.a();
        self.graph
            .unit_raw(a)
            .invoke(pack)
            .map_err(|source| EdgeError::Unit { unit: a, source })
    }

    /// Apply the wire (if any) to the pack, then invoke the target unit.
    ///
    /// If a wire is present it must return a pack; a bare value is a
    /// [`EdgeError::WireContract`] violation.
    pub fn transfer(&self, pack: ArgPack) -> Result<ArgPack, EdgeError> {
        let mid = match self.edge.wire() {
            Some(w) => match w(&pack) {
                Ok(Packable::Pack(mid)) => mid,
                Ok(Packable::Value(_)) => {
                    return Err(EdgeError::WireContract { edge: self.id })
                }
                Err(source) => {
                    return Err(EdgeError::Wire {
                        edge: self.id,
                        source,
                    })
                }
            },
            None => pack,
        };
        let b = self.edge.b();
        self.graph
            .unit_raw(b)
            .invoke(&mid)
            .map_err(|source| EdgeError::Unit { unit: b, source })
    }

    /// Execute both halves end-to-end: `transfer(invoke_a(pack))`.
    ///
    /// Provided for direct, graph-less edge execution; the stepper never
    /// calls this, since its whole purpose is to pause between the halves.
    pub fn pluck(&self, pack: &ArgPack) -> Result<ArgPack, EdgeError> {
        let a_result = self.invoke_a(pack)?;
        self.transfer(a_result)
    }
}

/// Convert a bare value into a sole-positional pack: the fallback a wire is
/// *not* allowed to rely on.
///
/// Exists so tests and callers can state the contract explicitly.
pub fn bare(value: impl Into<Value>) -> Packable {
    Packable::Value(value.into())
}
