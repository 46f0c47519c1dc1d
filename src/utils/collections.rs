//! Constructors for the keyword maps used throughout the crate.

use serde_json::Value;

use crate::pack::KwArgs;

/// Create an empty keyword map with the crate's standard hasher.
#[must_use]
pub fn new_kwargs() -> KwArgs {
    KwArgs::default()
}

/// Build a keyword map from `(key, value)` pairs.
///
/// # Examples
///
/// ```rust
/// use hyperway::utils::collections::kwargs;
/// use serde_json::json;
///
/// let kw = kwargs([("mode", json!("fast")), ("retries", json!(3))]);
/// assert_eq!(kw.len(), 2);
/// ```
#[must_use]
pub fn kwargs<K, I>(pairs: I) -> KwArgs
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value))
        .collect()
}
