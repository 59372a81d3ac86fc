//! HashIndex: sparse open-addressing array mapping `hash -> dense index`.
//!
//! Slots are stored as a control-byte array split into `GROUP_WIDTH` groups
//! plus a parallel array of `u32` dense indexes. Probing starts at group
//! `(hash >> 7) mod groups` and walks groups in order, wrapping. Within a
//! group, one vector compare against the 7-bit fingerprint yields candidate
//! slots; the caller's equality closure rejects fingerprint collisions.
//!
//! The index never looks at keys itself. It owns no entries and knows dense
//! indexes only as opaque `u32`s.

use crate::group::{fingerprint, is_full, Group, DELETED, EMPTY, GROUP_WIDTH};
use crate::growth::{max_load, MIN_CAPACITY};

/// Outcome of a probe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Probe {
    /// Key present at `slot`, referencing entry `dense`.
    Found { slot: usize, dense: u32 },
    /// Key absent; `slot` is the first tombstone or empty slot seen on the
    /// probe path and is where an insert should go.
    Vacant(usize),
}

#[derive(Clone, Debug)]
pub struct HashIndex {
    ctrl: Vec<[u8; GROUP_WIDTH]>,
    dense: Vec<u32>,
    items: usize,
    tombstones: usize,
}

impl HashIndex {
    /// Empty index; `capacity` must be a power of two of at least one group.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two() && capacity >= MIN_CAPACITY,
            "index capacity must be a power of two >= {MIN_CAPACITY}"
        );
        Self {
            ctrl: vec![[EMPTY; GROUP_WIDTH]; capacity / GROUP_WIDTH],
            dense: vec![0; capacity],
            items: 0,
            tombstones: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.dense.len()
    }

    /// Occupied slots.
    #[cfg(any(test, feature = "bench_internal"))]
    #[inline]
    pub fn items(&self) -> usize {
        self.items
    }

    #[cfg(any(test, feature = "bench_internal"))]
    #[inline]
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// True when claiming one more slot would cross the load threshold.
    #[inline]
    pub fn needs_growth(&self) -> bool {
        self.items + self.tombstones + 1 > max_load(self.capacity())
    }

    #[inline]
    fn group_mask(&self) -> usize {
        self.ctrl.len() - 1
    }

    #[inline]
    fn start_group(&self, hash: u64) -> usize {
        ((hash >> 7) as usize) & self.group_mask()
    }

    #[inline]
    fn ctrl_at(&self, slot: usize) -> u8 {
        self.ctrl[slot / GROUP_WIDTH][slot % GROUP_WIDTH]
    }

    #[inline]
    fn set_ctrl(&mut self, slot: usize, byte: u8) {
        self.ctrl[slot / GROUP_WIDTH][slot % GROUP_WIDTH] = byte;
    }

    /// Probe for `hash`. `eq` is called with the dense index of each
    /// fingerprint match, lowest slot first, and decides key equality.
    pub fn find(&self, hash: u64, mut eq: impl FnMut(u32) -> bool) -> Probe {
        let fp = fingerprint(hash);
        let mask = self.group_mask();
        let mut g = self.start_group(hash);
        let mut insert_slot = None;
        for _ in 0..self.ctrl.len() {
            let group = Group::load(&self.ctrl[g]);
            for offset in group.match_byte(fp) {
                let slot = g * GROUP_WIDTH + offset;
                let dense = self.dense[slot];
                if eq(dense) {
                    return Probe::Found { slot, dense };
                }
            }
            if insert_slot.is_none() {
                insert_slot = group
                    .match_empty_or_deleted()
                    .lowest()
                    .map(|offset| g * GROUP_WIDTH + offset);
            }
            if group.match_empty().any() {
                break;
            }
            g = (g + 1) & mask;
        }
        Probe::Vacant(insert_slot.expect("hash index always keeps a free slot"))
    }

    /// Slot holding exactly `dense`, found by walking the probe path of
    /// `hash`.
    pub fn find_dense(&self, hash: u64, dense: u32) -> Option<usize> {
        match self.find(hash, |d| d == dense) {
            Probe::Found { slot, .. } => Some(slot),
            Probe::Vacant(_) => None,
        }
    }

    /// First free slot on the probe path of `hash`, without key checks.
    /// Used on rebuild where every key is known to be unique.
    pub fn find_insert_slot(&self, hash: u64) -> usize {
        let mask = self.group_mask();
        let mut g = self.start_group(hash);
        for _ in 0..self.ctrl.len() {
            if let Some(offset) = Group::load(&self.ctrl[g]).match_empty_or_deleted().lowest() {
                return g * GROUP_WIDTH + offset;
            }
            g = (g + 1) & mask;
        }
        panic!("hash index always keeps a free slot");
    }

    /// Occupy `slot` (empty or tombstone) with the fingerprint of `hash`.
    pub fn occupy(&mut self, slot: usize, hash: u64, dense: u32) {
        let prev = self.ctrl_at(slot);
        debug_assert!(!is_full(prev), "occupying a live slot");
        if prev == DELETED {
            self.tombstones -= 1;
        }
        self.set_ctrl(slot, fingerprint(hash));
        self.dense[slot] = dense;
        self.items += 1;
    }

    /// Insert a key known to be absent.
    pub fn insert_unique(&mut self, hash: u64, dense: u32) {
        let slot = self.find_insert_slot(hash);
        self.occupy(slot, hash, dense);
    }

    /// Turn an occupied slot into a tombstone. Never back to EMPTY, or later
    /// probes would stop short of keys placed past this slot.
    pub fn erase(&mut self, slot: usize) {
        debug_assert!(is_full(self.ctrl_at(slot)), "erasing a free slot");
        self.set_ctrl(slot, DELETED);
        self.items -= 1;
        self.tombstones += 1;
    }

    /// Occupied slots as `(slot, fingerprint, dense)`.
    #[cfg(test)]
    pub fn occupied(&self) -> impl Iterator<Item = (usize, u8, u32)> + '_ {
        (0..self.capacity()).filter_map(move |slot| {
            let c = self.ctrl_at(slot);
            is_full(c).then(|| (slot, c, self.dense[slot]))
        })
    }
}
