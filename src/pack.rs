//! The argument pack: the sole value carrier between units, wires and the
//! stash.
//!
//! An [`ArgPack`] is an ordered tuple of positional values plus a mapping of
//! keyword values, immutable from the engine's point of view. Everything a
//! callable returns is folded back into a pack through the idempotent
//! wrapping rule: wrapping a value that is already a pack returns it
//! unchanged; wrapping anything else produces a pack with that value as the
//! sole positional.
//!
//! # Examples
//!
//! ```rust
//! use hyperway::pack::ArgPack;
//!
//! // A plain value becomes a single-positional pack.
//! let pack = ArgPack::wrap(41);
//! assert_eq!(pack.args().len(), 1);
//!
//! // Wrapping a pack is the identity.
//! let again = ArgPack::wrap(pack.clone());
//! assert_eq!(again, pack);
//!
//! // Row-concat folds several packs into one.
//! let folded = ArgPack::concat([ArgPack::of(4), ArgPack::of(5)]);
//! assert_eq!(folded.args().len(), 2);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Keyword-argument mapping carried alongside the positional tuple.
pub type KwArgs = FxHashMap<String, Value>;

/// Immutable carrier of one call's positional and keyword arguments.
///
/// Packs are the only transport between units, wires and the stash. They are
/// value-semantic: cloning is cheap relative to invocation, and the engine
/// never mutates a pack once it is in flight.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgPack {
    args: Vec<Value>,
    kwargs: KwArgs,
}

impl ArgPack {
    /// Create a pack from explicit positional and keyword parts.
    #[must_use]
    pub fn new(args: Vec<Value>, kwargs: KwArgs) -> Self {
        Self { args, kwargs }
    }

    /// Create a pack with a single positional value and no keywords.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hyperway::pack::ArgPack;
    ///
    /// let pack = ArgPack::of(10);
    /// assert_eq!(pack.first(), Some(&serde_json::json!(10)));
    /// ```
    #[must_use]
    pub fn of(value: impl Into<Value>) -> Self {
        Self {
            args: vec![value.into()],
            kwargs: KwArgs::default(),
        }
    }

    /// Create a pack with no positional and no keyword values.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap a callable result into a pack.
    ///
    /// This is the idempotent construction rule: a [`Packable::Pack`] is
    /// returned unchanged, while a [`Packable::Value`] becomes the sole
    /// positional of a fresh pack.
    #[must_use]
    pub fn wrap(result: impl Into<Packable>) -> Self {
        match result.into() {
            Packable::Pack(pack) => pack,
            Packable::Value(value) => Self::of(value),
        }
    }

    /// Fold several packs into one, in iteration order.
    ///
    /// Positional tuples are concatenated; keyword mappings merge with
    /// last-write-wins. This is the row-concat operation the stepper applies
    /// when folding concurrent arrivals at a merge-marked unit.
    #[must_use]
    pub fn concat(packs: impl IntoIterator<Item = ArgPack>) -> Self {
        let mut out = Self::empty();
        for pack in packs {
            out.args.extend(pack.args);
            out.kwargs.extend(pack.kwargs);
        }
        out
    }

    /// The positional values, in order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// The keyword values.
    #[must_use]
    pub fn kwargs(&self) -> &KwArgs {
        &self.kwargs
    }

    /// The first positional value, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Value> {
        self.args.first()
    }

    /// Consume the pack, returning its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Value>, KwArgs) {
        (self.args, self.kwargs)
    }

    /// Return a copy of this pack with one keyword set.
    ///
    /// Convenience for building seed packs in tests and call sites.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ArgPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArgPack(*{:?}", self.args)?;
        if self.kwargs.is_empty() {
            write!(f, ")")
        } else {
            write!(f, ", **{:?})", self.kwargs)
        }
    }
}

/// What a callable handed back: either a bare value or a full pack.
///
/// The distinction is load-bearing for wires: a wire must return a pack, and
/// a [`Packable::Value`] from a wire surfaces as a contract violation rather
/// than being silently re-wrapped.
#[derive(Clone, Debug)]
pub enum Packable {
    /// A bare value, to be wrapped as the sole positional of a new pack.
    Value(Value),
    /// An already-formed pack, passed through unchanged.
    Pack(ArgPack),
}

impl From<ArgPack> for Packable {
    fn from(pack: ArgPack) -> Self {
        Packable::Pack(pack)
    }
}

impl From<Value> for Packable {
    fn from(value: Value) -> Self {
        Packable::Value(value)
    }
}

impl From<i64> for Packable {
    fn from(value: i64) -> Self {
        Packable::Value(Value::from(value))
    }
}

impl From<f64> for Packable {
    fn from(value: f64) -> Self {
        Packable::Value(Value::from(value))
    }
}

impl From<bool> for Packable {
    fn from(value: bool) -> Self {
        Packable::Value(Value::from(value))
    }
}

impl From<&str> for Packable {
    fn from(value: &str) -> Self {
        Packable::Value(Value::from(value))
    }
}

impl From<String> for Packable {
    fn from(value: String) -> Self {
        Packable::Value(Value::from(value))
    }
}

impl From<()> for Packable {
    fn from(_: ()) -> Self {
        Packable::Value(Value::Null)
    }
}
