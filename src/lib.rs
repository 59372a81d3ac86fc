//! pocket-map: a memory-efficient, insertion-ordered hash map specialized
//! for a closed set of primitive key/value kinds.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: store primitive keys and values inline (no per-entry boxing),
//!   probe with SIMD, and keep insertion order under sparse deletion.
//! - Layers:
//!   - `hasher`: multiply-xor hash over raw key bytes, seeded per process.
//!   - `group`: 16-wide control-byte groups matched with one SSE2 compare
//!     (portable byte loop elsewhere).
//!   - `hash_index`: power-of-two open-addressing array of
//!     `(fingerprint, dense index)` slots with tombstones.
//!   - `entry_store`: dense, insertion-ordered `(hash, key, value)` entries
//!     with holes left by removal.
//!   - `growth`: thresholds for index rebuilds and entry compaction.
//!   - `adapter`: the per-kind contract (`KindAdapter`) and its five
//!     implementations; `Value` is the kind-tagged boundary type.
//!   - `PocketMap<K, V, S>`: the engine, monomorphized per kind pair.
//!   - `AnyMap`: runtime-selected kind pair, one enum variant per pair.
//!
//! Constraints
//! - Single-threaded, externally synchronized; no internal locking.
//! - Every occupied index slot references exactly one alive entry and every
//!   alive entry is referenced by exactly one occupied slot.
//! - Alive entries stay in order of most recent insertion; holes are only
//!   removed by compaction (or trimmed when trailing).
//! - Deletion writes a tombstone, never EMPTY, so probes cannot stop short.
//! - Occupied plus tombstone slots stay at or below 7/8 of capacity.
//!
//! Rebuild policy
//! - Index: when claiming a slot would cross 7/8 load. Doubles when live
//!   entries dominate, otherwise rehashes in place to shed tombstones.
//!   Entries do not move.
//! - Entries: compacted once holes are at least as many as live entries;
//!   the index is rebuilt against the new dense positions in the same pass.
//! - Entries keep their hash, so neither rebuild rehashes keys.
//!
//! Iteration
//! - Borrowing iterators (`iter`, `keys`, `values`) are statically protected
//!   from concurrent mutation by the borrow checker.
//! - `Cursor` is the detached alternative: it records the map's generation
//!   and reports `Error::Invalidated` if advanced after a structural change
//!   (new key, removal, clear, rebuild). Overwriting a value is not
//!   structural.
//!
//! Errors
//! - Returned synchronously, never logged. Range and type errors are raised
//!   during conversion, before the map is touched; bulk merges are atomic
//!   per key.

mod adapter;
mod any_map;
mod entry_store;
mod error;
mod group;
mod growth;
mod hash_index;
mod hasher;
mod pocket_map;
mod pocket_map_proptest;

// Public surface
pub use adapter::{ByteString, Kind, KindAdapter, Value};
pub use any_map::AnyMap;
pub use error::{Error, Result};
pub use hasher::{ByteHasher, PocketHasher};
pub use pocket_map::{Cursor, Iter, PocketMap, StrInt64Map};

/// Raw index internals, exposed for benchmarks only.
#[cfg(feature = "bench_internal")]
pub mod raw {
    pub use crate::group::{fingerprint, GROUP_WIDTH};
    pub use crate::growth::{capacity_for, max_load};
    pub use crate::hash_index::{HashIndex, Probe};
}
