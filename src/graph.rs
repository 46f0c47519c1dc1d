//! Graph construction: arenas of units and edges plus insertion-ordered
//! outgoing adjacency.
//!
//! The graph is the owner. Units and edges live in append-only arenas and
//! are addressed by integer handles ([`UnitId`], [`EdgeId`]); the stepper
//! borrows the graph and keeps its own queue and stash, so several steppers
//! can drive the same graph independently.
//!
//! Conversion follows one rule: a raw callable (a [`Unit`] value) entering
//! the builder mints a fresh handle, while an existing handle is reused
//! as-is. Adding the same pair twice produces two parallel edges — edges
//! are never deduplicated — and self-loops are permitted.
//!
//! # Examples
//!
//! ```rust
//! use hyperway::graph::Graph;
//! use hyperway::utils::testing::adder;
//!
//! let mut graph = Graph::new();
//! let a = graph.as_unit(adder(1));
//! let first = graph.add(a, adder(3));
//! let second = graph.add(a, adder(4));
//!
//! // Outgoing edges keep insertion order.
//! assert_eq!(graph.outgoing(a), &[first, second]);
//! ```

use rustc_hash::FxHashMap;

use crate::edge::{Edge, EdgeId, EdgeRef, WireFn};
use crate::stepper::{Stepper, StepperConfig};
use crate::unit::{Unit, UnitId};

/// Either an existing vertex handle or a unit definition about to become
/// one.
///
/// This encodes the builder's conversion rule: [`Graph::as_unit`] is the
/// identity on `Id` and an arena insertion on `New`.
pub enum UnitRef {
    /// Reuse the vertex this handle names.
    Id(UnitId),
    /// Insert this unit as a fresh vertex.
    New(Unit),
}

impl From<UnitId> for UnitRef {
    fn from(id: UnitId) -> Self {
        UnitRef::Id(id)
    }
}

impl From<Unit> for UnitRef {
    fn from(unit: Unit) -> Self {
        UnitRef::New(unit)
    }
}

/// Identity-keyed multimap of outgoing edges per unit, append-only during
/// construction.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    units: Vec<Unit>,
    edges: Vec<Edge>,
    outgoing: FxHashMap<UnitId, Vec<EdgeId>>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit into the arena, minting a fresh handle.
    ///
    /// Every call mints a new identity: two insertions of units built from
    /// the same closure produce two distinct vertices.
    pub fn add_unit(&mut self, unit: Unit) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        tracing::trace!(unit = %id, label = unit.label(), "unit added");
        self.units.push(unit);
        id
    }

    /// Resolve a [`UnitRef`]: identity on handles, insertion on fresh
    /// units.
    pub fn as_unit(&mut self, unit: impl Into<UnitRef>) -> UnitId {
        match unit.into() {
            UnitRef::Id(id) => id,
            UnitRef::New(unit) => self.add_unit(unit),
        }
    }

    /// Connect `a` to `b` with a plain edge and return its handle.
    pub fn add(&mut self, a: impl Into<UnitRef>, b: impl Into<UnitRef>) -> EdgeId {
        self.connect(a, b).finish()
    }

    /// Start building an edge from `a` to `b`; attach a wire or a name
    /// before calling [`EdgeBuilder::finish`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hyperway::graph::Graph;
    /// use hyperway::utils::testing::{adder, doubler_wire};
    ///
    /// let mut graph = Graph::new();
    /// let e = graph
    ///     .connect(adder(1), adder(2))
    ///     .wire(doubler_wire())
    ///     .name("double-hop")
    ///     .finish();
    /// assert_eq!(graph.find_edges("double-hop"), vec![e]);
    /// ```
    pub fn connect(&mut self, a: impl Into<UnitRef>, b: impl Into<UnitRef>) -> EdgeBuilder<'_> {
        let a = self.as_unit(a);
        let b = self.as_unit(b);
        EdgeBuilder {
            graph: self,
            a,
            b,
            wire: None,
            name: None,
        }
    }

    /// Chain several units in sequence, returning the edges produced.
    ///
    /// Each intermediate entry resolves to exactly one vertex, reused for
    /// both its incoming and outgoing edge: a three-unit chain yields three
    /// vertices and two edges, not five vertices.
    pub fn chain(&mut self, items: impl IntoIterator<Item = UnitRef>) -> Vec<EdgeId> {
        let ids: Vec<UnitId> = items.into_iter().map(|r| self.as_unit(r)).collect();
        ids.windows(2).map(|pair| self.add(pair[0], pair[1])).collect()
    }

    /// Chain several units in sequence, attaching a clone of the wire to
    /// every hop.
    pub fn chain_wired(
        &mut self,
        items: impl IntoIterator<Item = UnitRef>,
        wire: WireFn,
    ) -> Vec<EdgeId> {
        let ids: Vec<UnitId> = items.into_iter().map(|r| self.as_unit(r)).collect();
        ids.windows(2)
            .map(|pair| self.connect(pair[0], pair[1]).wire(wire.clone()).finish())
            .collect()
    }

    /// The outgoing edges of a unit, in insertion order. Empty for a unit
    /// with no outgoing edges (a leaf).
    #[must_use]
    pub fn outgoing(&self, unit: UnitId) -> &[EdgeId] {
        self.outgoing.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a unit by handle.
    #[must_use]
    pub fn get_unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index())
    }

    /// Look up an edge by handle.
    #[must_use]
    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// A graph-bound view of one edge, exposing the two-phase operations.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<EdgeRef<'_>> {
        self.edges
            .get(id.index())
            .map(|edge| EdgeRef::new(self, id, edge))
    }

    /// Edges whose `name` attribute equals the given name, in insertion
    /// order. The engine never interprets names; this exists for user-side
    /// selection only.
    #[must_use]
    pub fn find_edges(&self, name: &str) -> Vec<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, edge)| edge.name() == Some(name))
            .map(|(i, _)| EdgeId(i as u32))
            .collect()
    }

    /// Iterate all units with their handles, in insertion order.
    pub fn units(&self) -> impl Iterator<Item = (UnitId, &Unit)> {
        self.units
            .iter()
            .enumerate()
            .map(|(i, unit)| (UnitId(i as u32), unit))
    }

    /// Iterate all edges with their handles, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, edge)| (EdgeId(i as u32), edge))
    }

    /// Number of units in the arena.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Number of edges in the arena.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// A stepper over this graph with default configuration.
    #[must_use]
    pub fn stepper(&self) -> Stepper<'_> {
        Stepper::new(self)
    }

    /// A stepper over this graph with explicit configuration.
    #[must_use]
    pub fn stepper_with(&self, config: StepperConfig) -> Stepper<'_> {
        Stepper::with_config(self, config)
    }

    /// Arena access for edge endpoints, which are minted by this graph and
    /// therefore always in range.
    pub(crate) fn unit_raw(&self, id: UnitId) -> &Unit {
        &self.units[id.index()]
    }

    fn push_edge(&mut self, edge: Edge) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        let a = edge.a();
        tracing::trace!(edge = %id, a = %a, b = %edge.b(), wired = edge.has_wire(), "edge added");
        self.edges.push(edge);
        self.outgoing.entry(a).or_default().push(id);
        id
    }
}

/// Fluent builder for a single edge; obtained from [`Graph::connect`].
#[must_use = "call finish() to append the edge to the graph"]
pub struct EdgeBuilder<'g> {
    graph: &'g mut Graph,
    a: UnitId,
    b: UnitId,
    wire: Option<WireFn>,
    name: Option<String>,
}

impl EdgeBuilder<'_> {
    /// Attach an in-transit transform to this edge.
    pub fn wire(mut self, wire: WireFn) -> Self {
        self.wire = Some(wire);
        self
    }

    /// Attach a plain pack-to-pack function as the wire.
    pub fn wire_fn<F>(self, f: F) -> Self
    where
        F: Fn(&crate::pack::ArgPack) -> crate::pack::ArgPack + Send + Sync + 'static,
    {
        self.wire(crate::edge::wire(f))
    }

    /// Name the edge for later user-side selection.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append the edge to the graph and return its handle.
    pub fn finish(self) -> EdgeId {
        self.graph
            .push_edge(Edge::new(self.a, self.b, self.wire, self.name))
    }
}
