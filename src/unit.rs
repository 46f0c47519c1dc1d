//! Units: identity-bearing wrappers around user callables.
//!
//! A [`Unit`] owns the callable plus the policies that shape its invocation:
//! an optional sentinel that is stripped when it arrives as the sole
//! positional, a raw flag that bypasses stripping entirely, a merge flag the
//! stepper consults when folding concurrent arrivals, and a leaf policy that
//! decides what happens when execution reaches a unit with no outgoing
//! edges.
//!
//! Units gain their identity when they enter a [`Graph`](crate::graph::Graph):
//! the graph's arena mints a fresh [`UnitId`] per inserted unit, and edges
//! are keyed by those handles. Two units built from the same closure are
//! distinct vertices; reusing a handle reuses the vertex.
//!
//! # Examples
//!
//! ```rust
//! use hyperway::pack::{ArgPack, KwArgs};
//! use hyperway::unit::Unit;
//! use serde_json::Value;
//!
//! let double = Unit::new(|args: &[Value], _: &KwArgs| {
//!     Value::from(args.first().and_then(Value::as_i64).unwrap_or(0) * 2)
//! })
//! .with_name("double");
//!
//! let out = double.invoke(&ArgPack::of(21)).unwrap();
//! assert_eq!(out, ArgPack::of(42));
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::pack::{ArgPack, KwArgs, Packable};

/// Handle of a unit inside its graph's arena.
///
/// Handles are only meaningful for the graph that minted them; feeding a
/// handle from one graph to a stepper over another surfaces as
/// [`StepError::UnknownUnit`](crate::stepper::StepError::UnknownUnit).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub(crate) u32);

impl UnitId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// What the stepper does with a pack that reaches a unit with no outgoing
/// edges.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LeafPolicy {
    /// Write the pack into the stash under this unit's key. The default.
    #[default]
    Stash,
    /// Drop the pack silently; it is never stashed.
    Discard,
}

/// Errors surfaced by user callables.
///
/// A callable signals failure by returning one of these; the engine
/// propagates them unchanged to the caller of `step()`. There is no retry
/// policy and no transient/permanent distinction.
#[derive(Debug, Error, Diagnostic)]
pub enum CallableError {
    /// An expected argument was absent from the pack.
    #[error("missing expected argument: {what}")]
    #[diagnostic(
        code(hyperway::callable::missing_argument),
        help("Check that the upstream unit or wire produced the value this callable needs.")
    )]
    MissingArgument { what: &'static str },

    /// An argument was present but of an unusable type.
    #[error("argument has wrong type: expected {expected}, got {got}")]
    #[diagnostic(code(hyperway::callable::wrong_type))]
    WrongType { expected: &'static str, got: String },

    /// Free-form failure raised by the callable itself.
    #[error("callable failed: {0}")]
    #[diagnostic(code(hyperway::callable::failed))]
    Failed(String),

    /// JSON conversion error inside the callable.
    #[error(transparent)]
    #[diagnostic(code(hyperway::callable::serde_json))]
    Serde(#[from] serde_json::Error),
}

/// Boxed callable stored inside a unit.
///
/// Plain closures are lifted into this shape by [`Unit::new`]; fallible
/// closures use [`Unit::fallible`] directly.
pub type UnitFn =
    Arc<dyn Fn(&[Value], &KwArgs) -> Result<Packable, CallableError> + Send + Sync + 'static>;

/// Wrapper around a user callable, carrying the unit's invocation policies.
#[derive(Clone)]
pub struct Unit {
    func: UnitFn,
    name: Option<String>,
    sentinel: Option<Value>,
    raw: bool,
    merge_node: bool,
    leaf_policy: LeafPolicy,
}

impl Unit {
    /// Wrap an infallible callable.
    ///
    /// The closure receives the pack's positional slice and keyword map and
    /// may return anything convertible to [`Packable`]: a bare
    /// [`Value`] (wrapped as a single positional) or a full [`ArgPack`]
    /// (passed through unchanged).
    pub fn new<F, P>(f: F) -> Self
    where
        F: Fn(&[Value], &KwArgs) -> P + Send + Sync + 'static,
        P: Into<Packable>,
    {
        Self::fallible(move |args, kwargs| Ok(f(args, kwargs).into()))
    }

    /// Wrap a fallible callable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hyperway::pack::{KwArgs, Packable};
    /// use hyperway::unit::{CallableError, Unit};
    /// use serde_json::Value;
    ///
    /// let strict = Unit::fallible(|args: &[Value], _: &KwArgs| {
    ///     let v = args
    ///         .first()
    ///         .and_then(Value::as_i64)
    ///         .ok_or(CallableError::MissingArgument { what: "value" })?;
    ///     Ok(Packable::from(v + 1))
    /// });
    /// assert!(strict.invoke(&hyperway::pack::ArgPack::empty()).is_err());
    /// ```
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&[Value], &KwArgs) -> Result<Packable, CallableError> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(f),
            name: None,
            sentinel: None,
            raw: false,
            merge_node: false,
            leaf_policy: LeafPolicy::default(),
        }
    }

    /// Set a display name, used in logs and for user-side selection.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Configure the sentinel value.
    ///
    /// When the unit is invoked on a pack whose *only* positional compares
    /// equal to the sentinel, that positional is dropped before the callable
    /// runs. Keywords are preserved. This supports callables whose "no
    /// value" signal is an explicit token rather than absence.
    #[must_use]
    pub fn with_sentinel(mut self, sentinel: impl Into<Value>) -> Self {
        self.sentinel = Some(sentinel.into());
        self
    }

    /// Bypass sentinel stripping: positional and keyword values pass through
    /// unchanged even when a sentinel is configured.
    #[must_use]
    pub fn raw(mut self) -> Self {
        self.raw = true;
        self
    }

    /// Mark this unit as a merge node.
    ///
    /// A merge-aware stepper folds concurrent arrivals at a merge node into
    /// one invocation per step; see
    /// [`StepperConfig::merge_aware`](crate::stepper::StepperConfig).
    #[must_use]
    pub fn merge(mut self) -> Self {
        self.merge_node = true;
        self
    }

    /// Override what happens when this unit is reached with no outgoing
    /// edges.
    #[must_use]
    pub fn with_leaf_policy(mut self, policy: LeafPolicy) -> Self {
        self.leaf_policy = policy;
        self
    }

    /// The configured display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Display label: the configured name or a generic fallback.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unit")
    }

    /// The configured sentinel, if any.
    #[must_use]
    pub fn sentinel(&self) -> Option<&Value> {
        self.sentinel.as_ref()
    }

    /// Whether this unit folds concurrent arrivals.
    #[must_use]
    pub fn is_merge_node(&self) -> bool {
        self.merge_node
    }

    /// Whether sentinel stripping is bypassed.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        self.raw
    }

    /// The leaf policy in effect for this unit.
    #[must_use]
    pub fn leaf_policy(&self) -> LeafPolicy {
        self.leaf_policy
    }

    /// Invoke the callable on a pack.
    ///
    /// Applies the sentinel rule, calls the function, and wraps the result
    /// through the idempotent rule so the output is always a pack.
    pub fn invoke(&self, pack: &ArgPack) -> Result<ArgPack, CallableError> {
        let strip = !self.raw
            && self
                .sentinel
                .as_ref()
                .is_some_and(|s| pack.args().len() == 1 && pack.args()[0] == *s);
        let args: &[Value] = if strip { &[] } else { pack.args() };
        let result = (self.func)(args, pack.kwargs())?;
        Ok(ArgPack::wrap(result))
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("sentinel", &self.sentinel)
            .field("raw", &self.raw)
            .field("merge_node", &self.merge_node)
            .field("leaf_policy", &self.leaf_policy)
            .finish_non_exhaustive()
    }
}
