//! EntryStore: dense, insertion-ordered entries with holes left by removal.
//!
//! This is the source of truth for keys, values and iteration order. A
//! removed entry leaves a hole (`None`) in place so dense indexes held by the
//! hash index stay valid; holes are dropped only by `compact`, except that
//! trailing holes are trimmed eagerly since no live index points past them.

/// A stored key/value pair with the digest it was indexed under.
///
/// Keeping the hash lets the index be rebuilt without hashing keys again.
#[derive(Clone, Debug)]
pub struct Entry<K, V> {
    pub hash: u64,
    pub key: K,
    pub value: V,
}

#[derive(Clone, Debug)]
pub struct EntryStore<K, V> {
    slots: Vec<Option<Entry<K, V>>>,
    live: usize,
    holes: usize,
}

impl<K, V> EntryStore<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            live: 0,
            holes: 0,
        }
    }

    /// Alive entries.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn holes(&self) -> usize {
        self.holes
    }

    /// Length including holes.
    #[inline]
    pub fn dense_len(&self) -> usize {
        self.slots.len()
    }

    /// Append an entry and return its dense index.
    pub fn push(&mut self, entry: Entry<K, V>) -> u32 {
        let dense = u32::try_from(self.slots.len()).expect("capacity overflow");
        assert!(dense != u32::MAX, "capacity overflow");
        self.slots.push(Some(entry));
        self.live += 1;
        dense
    }

    #[inline]
    pub fn get(&self, dense: u32) -> Option<&Entry<K, V>> {
        self.slots.get(dense as usize).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, dense: u32) -> Option<&mut Entry<K, V>> {
        self.slots.get_mut(dense as usize).and_then(Option::as_mut)
    }

    /// Remove the entry at `dense`, leaving a hole.
    pub fn take(&mut self, dense: u32) -> Option<Entry<K, V>> {
        let entry = self.slots.get_mut(dense as usize)?.take()?;
        self.live -= 1;
        self.holes += 1;
        self.trim_trailing_holes();
        Some(entry)
    }

    /// Remove the last alive entry, returning it with the dense index it had.
    pub fn pop_last(&mut self) -> Option<(u32, Entry<K, V>)> {
        while let Some(slot) = self.slots.pop() {
            match slot {
                Some(entry) => {
                    let dense = self.slots.len() as u32;
                    self.live -= 1;
                    self.trim_trailing_holes();
                    return Some((dense, entry));
                }
                None => self.holes -= 1,
            }
        }
        None
    }

    fn trim_trailing_holes(&mut self) {
        while let Some(None) = self.slots.last() {
            self.slots.pop();
            self.holes -= 1;
        }
    }

    /// Next alive entry at or after `from`.
    pub fn next_alive(&self, from: usize) -> Option<(u32, &Entry<K, V>)> {
        self.slots
            .get(from..)?
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.as_ref().map(|e| ((from + i) as u32, e)))
    }

    /// Alive entries in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Entry<K, V>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|e| (i as u32, e)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry<K, V>> + '_ {
        self.slots.iter_mut().filter_map(Option::as_mut)
    }

    /// Drop every hole, keeping alive entries in order. Dense indexes change;
    /// the caller must rebuild the hash index afterwards.
    pub fn compact(&mut self) {
        let mut fresh = Vec::with_capacity(self.live);
        fresh.extend(self.slots.drain(..).flatten().map(Some));
        self.slots = fresh;
        self.holes = 0;
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
        self.holes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(keys: &[u32]) -> EntryStore<u32, u32> {
        let mut s = EntryStore::with_capacity(0);
        for &k in keys {
            s.push(Entry {
                hash: k as u64,
                key: k,
                value: k * 10,
            });
        }
        s
    }

    fn alive_keys(s: &EntryStore<u32, u32>) -> Vec<u32> {
        s.iter().map(|(_, e)| e.key).collect()
    }

    #[test]
    fn push_returns_sequential_dense_indexes() {
        let mut s = store_of(&[]);
        for k in 0..5u32 {
            let d = s.push(Entry {
                hash: 0,
                key: k,
                value: 0,
            });
            assert_eq!(d, k);
        }
        assert_eq!(s.live(), 5);
    }

    /// Invariant: a hole in the middle keeps later dense indexes stable and
    /// iteration skips it.
    #[test]
    fn take_leaves_hole_in_middle() {
        let mut s = store_of(&[1, 2, 3]);
        assert_eq!(s.take(1).map(|e| e.key), Some(2));
        assert_eq!((s.live(), s.holes(), s.dense_len()), (2, 1, 3));
        assert_eq!(s.get(2).map(|e| e.key), Some(3));
        assert!(s.get(1).is_none());
        assert_eq!(alive_keys(&s), vec![1, 3]);
        assert!(s.take(1).is_none(), "double take is a no-op");
    }

    #[test]
    fn trailing_holes_are_trimmed() {
        let mut s = store_of(&[1, 2, 3, 4]);
        s.take(2);
        s.take(3);
        assert_eq!((s.dense_len(), s.holes()), (2, 0));
        s.take(0);
        assert_eq!((s.dense_len(), s.holes()), (2, 1));
        s.take(1);
        assert_eq!((s.dense_len(), s.holes(), s.live()), (0, 0, 0));
    }

    /// Invariant: pop_last yields entries last-in-first-out and reports the
    /// dense index each one had.
    #[test]
    fn pop_last_is_lifo_and_skips_holes() {
        let mut s = store_of(&[1, 2, 3, 4]);
        s.take(1);
        let (d, e) = s.pop_last().unwrap();
        assert_eq!((d, e.key), (3, 4));
        let (d, e) = s.pop_last().unwrap();
        assert_eq!((d, e.key), (2, 3));
        let (d, e) = s.pop_last().unwrap();
        assert_eq!((d, e.key), (0, 1));
        assert!(s.pop_last().is_none());
        assert_eq!((s.live(), s.holes(), s.dense_len()), (0, 0, 0));
    }

    #[test]
    fn compact_preserves_order() {
        let mut s = store_of(&[1, 2, 3, 4, 5, 6]);
        s.take(0);
        s.take(2);
        s.take(4);
        s.compact();
        assert_eq!((s.live(), s.holes(), s.dense_len()), (3, 0, 3));
        assert_eq!(alive_keys(&s), vec![2, 4, 6]);
        assert_eq!(s.get(1).map(|e| e.value), Some(40));
    }

    #[test]
    fn next_alive_walks_forward() {
        let mut s = store_of(&[1, 2, 3]);
        s.take(1);
        assert_eq!(s.next_alive(0).map(|(d, e)| (d, e.key)), Some((0, 1)));
        assert_eq!(s.next_alive(1).map(|(d, e)| (d, e.key)), Some((2, 3)));
        assert!(s.next_alive(3).is_none());
        assert!(s.next_alive(99).is_none());
    }
}
