//! Pluggable next-queue expansion strategies.
//!
//! After every row in a step resolves, the stepper holds one successor
//! batch per input row. The expand strategy flattens those batches, in
//! order, into the next queue. Two implementations are provided; they
//! produce identical ordering and differ only in allocation behavior, so
//! swapping one for the other never changes observable outputs.
//!
//! The strategy is injected through
//! [`StepperConfig::expand`](super::StepperConfig) rather than held in
//! process-wide state.

use std::sync::Arc;

use super::Row;

/// The injected expansion strategy.
pub type ExpandFn = Arc<dyn Fn(Vec<Vec<Row>>) -> Vec<Row> + Send + Sync + 'static>;

/// Accumulate-then-freeze expansion: reserve the full capacity once and
/// extend in place. The default strategy.
#[must_use]
pub fn accumulate(batches: Vec<Vec<Row>>) -> Vec<Row> {
    let total = batches.iter().map(Vec::len).sum();
    let mut out: Vec<Row> = Vec::with_capacity(total);
    for batch in batches {
        out.extend(batch);
    }
    out
}

/// Concatenation-of-sequences expansion: rebuild the queue by whole-queue
/// concatenation per batch.
///
/// Kept as the reference implementation; ordering is identical to
/// [`accumulate`], cost is quadratic in the number of batches.
#[must_use]
pub fn concat(batches: Vec<Vec<Row>>) -> Vec<Row> {
    let mut out: Vec<Row> = Vec::new();
    for batch in batches {
        out = [out, batch].concat();
    }
    out
}
