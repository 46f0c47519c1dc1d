//! ```text
//! Graph ─┬─► Unit arena ──► Unit (callable + sentinel / merge / leaf policy)
//!        │
//!        ├─► Edge arena ──► Edge (a ─ wire? ─► b), two-phase protocol
//!        │
//!        └─► Stepper ─► Row queue ─► fan-out / merge fold / stash
//!                       │
//!                       └─► StepReport per step; Stash holds terminal packs
//! ```
//!
//! Hyperway is a small functional execution engine over a directed graph whose
//! vertices wrap arbitrary callables and whose edges may carry an optional
//! in-transit transform (a "wire"). The [`stepper::Stepper`] walks the graph
//! one half-edge at a time: each step consumes the current row set, fans out
//! at branch points, optionally folds concurrent arrivals at merge-marked
//! units, and stashes terminal results when a unit has no outgoing edges.
//!
//! Execution is single-threaded and cooperative; "concurrent" refers to the
//! logical fan-out across paths, not to OS threads. The engine will happily
//! run a cyclic graph forever, so bounded drivers take a step limit.

pub mod edge;
pub mod graph;
pub mod pack;
pub mod stepper;
pub mod unit;
pub mod utils;
