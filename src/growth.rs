//! GrowthPolicy: when the index is rebuilt and how large it becomes, and
//! when the entry store is compacted.
//!
//! The executing side (rehash, compaction) lives on `PocketMap`, which owns
//! both structures; this module only holds the arithmetic so the thresholds
//! are stated in one place.

use crate::group::GROUP_WIDTH;

/// Smallest index capacity: one full group.
pub const MIN_CAPACITY: usize = GROUP_WIDTH;

/// Occupied plus tombstone slots allowed before a rebuild (7/8 of capacity).
#[inline]
pub fn max_load(capacity: usize) -> usize {
    capacity - capacity / 8
}

/// Smallest power-of-two capacity that holds `live` slots within the load
/// factor.
pub fn capacity_for(live: usize) -> usize {
    let mut capacity = MIN_CAPACITY;
    while max_load(capacity) < live {
        capacity = capacity.checked_mul(2).expect("capacity overflow");
    }
    capacity
}

/// Capacity to rebuild to when one more slot is needed and the load budget
/// is spent.
///
/// When live entries fill more than half the budget the index doubles;
/// otherwise the budget was eaten by tombstones and a same-size rehash
/// reclaims them.
pub fn next_index_capacity(capacity: usize, live: usize) -> usize {
    let needed = live + 1;
    if needed * 2 > max_load(capacity) {
        let doubled = capacity.checked_mul(2).expect("capacity overflow");
        doubled.max(capacity_for(needed))
    } else {
        capacity
    }
}

/// Compaction runs once holes are at least as many as live entries.
#[inline]
pub fn should_compact(live: usize, holes: usize) -> bool {
    holes > 0 && holes >= live
}

/// Index capacity after compaction: shrink toward twice the live set, never
/// grow.
pub fn compacted_index_capacity(capacity: usize, live: usize) -> usize {
    capacity.min(capacity_for(live.saturating_mul(2)))
}
