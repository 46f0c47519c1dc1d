//! Shared fixtures for tests, benches and doc examples.
//!
//! These are deliberately tiny arithmetic callables so scenarios can assert
//! on literal values: `adder(10)` is the unit that adds 10 to its first
//! positional, `doubler_wire()` doubles a pack in transit, `printer()`
//! echoes its full pack, and the failing variants exercise the error
//! paths.

use serde_json::Value;
use std::sync::Arc;

use crate::edge::{wire, WireFn};
use crate::pack::{ArgPack, KwArgs, Packable};
use crate::unit::{CallableError, Unit};
use crate::utils::values::first_i64;

/// A unit adding `n` to its first positional value.
#[must_use]
pub fn adder(n: i64) -> Unit {
    Unit::fallible(move |args: &[Value], _: &KwArgs| {
        let v = first_i64(args)?;
        Ok(Packable::from(v + n))
    })
    .with_name(format!("add_{n}"))
}

/// A unit echoing its first positional value (or null when absent).
#[must_use]
pub fn passthrough() -> Unit {
    Unit::new(|args: &[Value], _: &KwArgs| args.first().cloned().unwrap_or(Value::Null))
        .with_name("passthrough")
}

/// A unit echoing its entire pack unchanged, positionals and keywords.
///
/// Useful as a sink: the stash then holds exactly what arrived.
#[must_use]
pub fn printer() -> Unit {
    Unit::new(|args: &[Value], kwargs: &KwArgs| ArgPack::new(args.to_vec(), kwargs.clone()))
        .with_name("printer")
}

/// A unit that accepts no positional arguments and returns `n`.
///
/// Fails when any positional is present, which is how the sentinel tests
/// observe whether stripping happened.
#[must_use]
pub fn nullary(n: i64) -> Unit {
    Unit::fallible(move |args: &[Value], _: &KwArgs| {
        if args.is_empty() {
            Ok(Packable::from(n))
        } else {
            Err(CallableError::Failed(format!(
                "expected no arguments, got {}",
                args.len()
            )))
        }
    })
    .with_name(format!("nullary_{n}"))
}

/// A unit whose callable always fails with a missing-argument error.
#[must_use]
pub fn failing_unit() -> Unit {
    Unit::fallible(|_: &[Value], _: &KwArgs| {
        Err(CallableError::MissingArgument { what: "test_key" })
    })
    .with_name("failing")
}

/// A contract-safe wire doubling the first positional value.
#[must_use]
pub fn doubler_wire() -> WireFn {
    wire(|pack: &ArgPack| {
        let v = pack.first().and_then(Value::as_i64).unwrap_or(0);
        ArgPack::of(v * 2)
    })
}

/// A wire that breaks the contract by returning a bare value.
#[must_use]
pub fn bare_value_wire() -> WireFn {
    Arc::new(|pack: &ArgPack| {
        Ok(Packable::Value(
            pack.first().cloned().unwrap_or(Value::Null),
        ))
    })
}

/// A wire whose callable fails outright.
#[must_use]
pub fn failing_wire() -> WireFn {
    Arc::new(|_: &ArgPack| Err(CallableError::Failed("wire down".into())))
}
