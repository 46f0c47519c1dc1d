//! Terminal-results accumulator.

use rustc_hash::FxHashMap;

use crate::pack::ArgPack;
use crate::unit::UnitId;

/// The terminal results map accumulated during a run.
///
/// When execution reaches a unit with no outgoing edges (and the unit's
/// leaf policy allows it), the resulting pack is written here under the
/// unit's handle. The canonical key is always the terminal unit, regardless
/// of whether the pack arrived through a plain row or a mid-edge partial.
///
/// The stash grows monotonically during a run and is readable at any time;
/// iteration visits keys in first-stash order, packs within a key in
/// arrival order.
#[derive(Clone, Debug, Default)]
pub struct Stash {
    entries: FxHashMap<UnitId, Vec<ArgPack>>,
    order: Vec<UnitId>,
}

impl Stash {
    /// Create an empty stash.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put(&mut self, unit: UnitId, pack: ArgPack) {
        let slot = self.entries.entry(unit).or_default();
        if slot.is_empty() {
            self.order.push(unit);
        }
        slot.push(pack);
    }

    /// The packs stashed under a unit, in arrival order.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> &[ArgPack] {
        self.entries.get(&unit).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any pack was stashed under the given unit.
    #[must_use]
    pub fn contains(&self, unit: UnitId) -> bool {
        self.entries.contains_key(&unit)
    }

    /// Iterate `(unit, packs)` entries in first-stash order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &[ArgPack])> {
        self.order
            .iter()
            .filter_map(|unit| self.entries.get(unit).map(|packs| (*unit, packs.as_slice())))
    }

    /// Iterate all stashed packs in first-stash key order, arrival order
    /// within a key.
    pub fn values(&self) -> impl Iterator<Item = &ArgPack> {
        self.iter().flat_map(|(_, packs)| packs.iter())
    }

    /// Drain the stash, returning entries in first-stash order and leaving
    /// it empty.
    pub fn flush(&mut self) -> Vec<(UnitId, Vec<ArgPack>)> {
        let order = std::mem::take(&mut self.order);
        let mut entries = std::mem::take(&mut self.entries);
        order
            .into_iter()
            .filter_map(|unit| entries.remove(&unit).map(|packs| (unit, packs)))
            .collect()
    }

    /// Number of distinct units with stashed results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Total number of stashed packs across all units.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether nothing has been stashed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
