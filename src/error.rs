//! Error types for the `pocket_map` crate.

use crate::adapter::Kind;

/// Errors surfaced by map operations and by value conversion.
///
/// Every error is returned synchronously from the failing call; nothing is
/// logged or swallowed by the engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Lookup, delete or pop on a key that is not present.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// A key or value does not fit the fixed width of its kind.
    ///
    /// The offending entry is rejected before any mutation for it commits.
    #[error("value {value} out of range for {kind}")]
    Range {
        /// Kind the value was being converted into.
        kind: Kind,
        /// Rendered source value.
        value: String,
    },

    /// A raw value of the wrong kind was supplied.
    #[error("expected {expected} value, found {found}")]
    Type {
        /// Kind the map stores in this position.
        expected: Kind,
        /// Kind name of the supplied value.
        found: &'static str,
    },

    /// No adapter exists for the requested kind (or kind pair).
    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    /// Pop-style removal on a map with no alive entries.
    #[error("pop from an empty map")]
    EmptyMap,

    /// A cursor was advanced after the map was structurally mutated.
    #[error("map changed during iteration")]
    Invalidated,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
