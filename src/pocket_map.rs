//! PocketMap: the engine. Owns one `HashIndex` and one `EntryStore` and
//! keeps them in lockstep; runs index growth and entry compaction when the
//! thresholds in `growth` are crossed.

use crate::adapter::{ByteString, Kind, KindAdapter, Repr};
use crate::entry_store::{Entry, EntryStore};
use crate::error::{Error, Result};
use crate::growth;
use crate::hash_index::{HashIndex, Probe};
use crate::hasher::{ByteHasher, PocketHasher};
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// Insertion-ordered hash map over one key kind and one value kind.
///
/// Lookups take the key's borrowed view (`&[u8]` for [`ByteString`] keys,
/// the number itself for numeric keys).
pub struct PocketMap<K, V, S = PocketHasher> {
    hasher: S,
    index: HashIndex,
    entries: EntryStore<K, V>,
    id: u64,
    generation: u64,
}

/// The reference instantiation: byte-string keys, int64 values.
pub type StrInt64Map = PocketMap<ByteString, i64>;

/// Detached position in a map's iteration order.
///
/// Unlike the borrowing iterators, a cursor does not hold the map borrowed.
/// It is bound to the map that created it and to that map's generation at
/// the time; advancing it on another map (a clone included) or after any
/// structural change fails with [`Error::Invalidated`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    map_id: u64,
    generation: u64,
    position: usize,
}

/// Identity for a new map instance; cursors check it.
fn next_map_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

impl<K, V> PocketMap<K, V>
where
    K: KindAdapter,
    V: KindAdapter,
{
    pub fn new() -> Self {
        Self::with_hasher(PocketHasher::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, PocketHasher::default())
    }
}

impl<K, V> Default for PocketMap<K, V>
where
    K: KindAdapter,
    V: KindAdapter,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over `(key, value)` pairs in insertion order.
pub struct Iter<'a, K, V> {
    entries: &'a EntryStore<K, V>,
    position: usize,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let (dense, e) = self.entries.next_alive(self.position)?;
        self.position = dense as usize + 1;
        self.remaining -= 1;
        Some((&e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V, S> PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    /// Map sized to hold `capacity` entries without rebuilding.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            hasher,
            index: HashIndex::with_capacity(growth::capacity_for(capacity)),
            entries: EntryStore::with_capacity(capacity),
            id: next_map_id(),
            generation: 0,
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn key_kind(&self) -> Kind {
        K::KIND
    }

    pub fn value_kind(&self) -> Kind {
        V::KIND
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.live()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.live() == 0
    }

    /// Slot count of the hash index.
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// Counter bumped on every structural mutation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    fn make_hash(&self, key: &K::View) -> u64 {
        K::hash(key, &self.hasher)
    }

    #[inline]
    fn probe(&self, key: &K::View, hash: u64) -> Probe {
        self.index.find(hash, |dense| {
            self.entries
                .get(dense)
                .map(|e| K::equals(e.key.view(), key))
                .unwrap_or(false)
        })
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn contains_key(&self, key: &K::View) -> bool {
        let hash = self.make_hash(key);
        matches!(self.probe(key, hash), Probe::Found { .. })
    }

    pub fn get(&self, key: &K::View) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K::View) -> Option<(&K, &V)> {
        let hash = self.make_hash(key);
        match self.probe(key, hash) {
            Probe::Found { dense, .. } => self.entries.get(dense).map(|e| (&e.key, &e.value)),
            Probe::Vacant(_) => None,
        }
    }

    pub fn get_mut(&mut self, key: &K::View) -> Option<&mut V> {
        let hash = self.make_hash(key);
        match self.probe(key, hash) {
            Probe::Found { dense, .. } => self.entries.get_mut(dense).map(|e| &mut e.value),
            Probe::Vacant(_) => None,
        }
    }

    /// Copy of the value for `key`, or `default` when absent.
    pub fn get_or(&self, key: &K::View, default: V) -> V {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Insert or overwrite. Returns the previous value if `key` was present.
    ///
    /// Overwriting keeps the key's position in iteration order and is not a
    /// structural mutation.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.make_hash(key.view());
        match self.probe(key.view(), hash) {
            Probe::Found { dense, .. } => self
                .entries
                .get_mut(dense)
                .map(|e| core::mem::replace(&mut e.value, value)),
            Probe::Vacant(slot) => {
                self.insert_new(slot, hash, key, value);
                None
            }
        }
    }

    /// Append a new entry for a key known to be absent; `slot` is the probe's
    /// insertion point, invalidated if the index has to grow first.
    fn insert_new(&mut self, slot: usize, hash: u64, key: K, value: V) -> u32 {
        let dense_full = self.entries.dense_len() >= growth::max_load(self.index.capacity());
        let slot = if self.index.needs_growth() || dense_full {
            self.grow_index();
            self.index.find_insert_slot(hash)
        } else {
            slot
        };
        let dense = self.entries.push(Entry { hash, key, value });
        self.index.occupy(slot, hash, dense);
        self.bump_generation();
        dense
    }

    /// Value for `key`, inserting `default` first when absent.
    pub fn setdefault(&mut self, key: K, default: V) -> &mut V {
        let hash = self.make_hash(key.view());
        let dense = match self.probe(key.view(), hash) {
            Probe::Found { dense, .. } => dense,
            Probe::Vacant(slot) => self.insert_new(slot, hash, key, default),
        };
        &mut self
            .entries
            .get_mut(dense)
            .expect("probed entry is alive")
            .value
    }

    /// Delete `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K::View) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K::View) -> Option<(K, V)> {
        let hash = self.make_hash(key);
        let Probe::Found { slot, dense } = self.probe(key, hash) else {
            return None;
        };
        self.index.erase(slot);
        let entry = self.entries.take(dense).expect("indexed entry is alive");
        self.bump_generation();
        self.maybe_compact();
        Some((entry.key, entry.value))
    }

    /// Remove `key` and return its value, failing with `KeyNotFound`.
    pub fn pop(&mut self, key: &K::View) -> Result<V> {
        self.remove(key)
            .ok_or_else(|| Error::KeyNotFound(Repr::<K>(key).to_string()))
    }

    /// Remove `key` and return its value, or `default` when absent.
    pub fn pop_or(&mut self, key: &K::View, default: V) -> V {
        self.remove(key).unwrap_or(default)
    }

    /// Remove the most recently inserted surviving entry.
    pub fn pop_last(&mut self) -> Result<(K, V)> {
        let (dense, entry) = self.entries.pop_last().ok_or(Error::EmptyMap)?;
        let slot = self
            .index
            .find_dense(entry.hash, dense)
            .expect("alive entry is indexed");
        self.index.erase(slot);
        self.bump_generation();
        self.maybe_compact();
        Ok((entry.key, entry.value))
    }

    /// Drop every entry and return to the initial capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = HashIndex::with_capacity(growth::MIN_CAPACITY);
        self.bump_generation();
    }

    /// Merge `pairs` in order, overwriting existing keys.
    pub fn update<I>(&mut self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in pairs {
            self.insert(k, v);
        }
    }

    /// Merge another map in its iteration order.
    pub fn update_from<S2: ByteHasher>(&mut self, other: &PocketMap<K, V, S2>) {
        for (k, v) in other.iter() {
            self.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            entries: &self.entries,
            position: 0,
            remaining: self.entries.live(),
        }
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.entries.iter_mut().map(|e| &mut e.value)
    }

    /// Cursor at the start of iteration order, bound to the current
    /// generation.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            map_id: self.id,
            generation: self.generation,
            position: 0,
        }
    }

    /// Yield the entry under `cursor` and move past it.
    pub fn advance(&self, cursor: &mut Cursor) -> Result<Option<(&K, &V)>> {
        if cursor.map_id != self.id || cursor.generation != self.generation {
            return Err(Error::Invalidated);
        }
        Ok(self.entries.next_alive(cursor.position).map(|(dense, e)| {
            cursor.position = dense as usize + 1;
            (&e.key, &e.value)
        }))
    }

    /// Rehash every alive entry into a larger (or same-size, tombstone-free)
    /// index. Holes are dropped in the same pass, so the dense array never
    /// outgrows the index's load budget.
    fn grow_index(&mut self) {
        let old_capacity = self.index.capacity();
        let live = self.entries.live();
        let holes = self.entries.holes();
        if holes > 0 {
            self.entries.compact();
        }
        let new_capacity = growth::next_index_capacity(old_capacity, live);
        self.rebuild_index(new_capacity);
        self.bump_generation();
        tracing::debug!(
            old_capacity,
            new_capacity,
            live,
            holes,
            "pocket_map: rebuilt hash index"
        );
    }

    /// Drop holes from the entry store and repoint the index at the new
    /// dense positions.
    fn maybe_compact(&mut self) {
        let live = self.entries.live();
        let holes = self.entries.holes();
        if !growth::should_compact(live, holes) {
            return;
        }
        self.entries.compact();
        let capacity = growth::compacted_index_capacity(self.index.capacity(), live);
        self.rebuild_index(capacity);
        self.bump_generation();
        tracing::debug!(live, holes, capacity, "pocket_map: compacted entries");
    }

    fn rebuild_index(&mut self, capacity: usize) {
        let mut index = HashIndex::with_capacity(capacity);
        for (dense, e) in self.entries.iter() {
            index.insert_unique(e.hash, dense);
        }
        self.index = index;
    }

    /// Check the index/store correspondence. Test-only; walks everything.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use crate::group::fingerprint;
        let mut seen = vec![false; self.entries.dense_len()];
        for (_slot, fp, dense) in self.index.occupied() {
            let e = self
                .entries
                .get(dense)
                .expect("occupied slot references an alive entry");
            assert_eq!(fp, fingerprint(e.hash), "cached fingerprint");
            assert_eq!(e.hash, self.make_hash(e.key.view()), "stored hash");
            assert!(!seen[dense as usize], "entry referenced twice");
            seen[dense as usize] = true;
        }
        assert_eq!(self.index.items(), self.entries.live());
        assert_eq!(
            seen.iter().filter(|s| **s).count(),
            self.entries.live(),
            "every alive entry is indexed"
        );
        assert_eq!(
            self.entries.dense_len(),
            self.entries.live() + self.entries.holes()
        );
        assert!(
            self.entries.dense_len() <= growth::max_load(self.index.capacity()),
            "dense length {} over load budget of capacity {}",
            self.entries.dense_len(),
            self.index.capacity()
        );
        assert!(self.index.items() + self.index.tombstones() <= growth::max_load(self.index.capacity()));
    }
}

impl<K, V, S> Clone for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher + Clone,
{
    /// Deep copy; the two maps share nothing afterwards, cursors included.
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            index: self.index.clone(),
            entries: self.entries.clone(),
            id: next_map_id(),
            generation: self.generation,
        }
    }
}

/// Mapping equality: same key set, equal values; order is ignored.
impl<K, V, S> PartialEq for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.iter().all(|(k, v)| {
                other
                    .get(k.view())
                    .map_or(false, |ov| V::equals(v.view(), ov.view()))
            })
    }
}

impl<K, V, S> fmt::Display for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    /// `<pocket_map[str, int64]: {'a': 1, 'b': 2}>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<pocket_map[{}, {}]: {{", K::KIND, V::KIND)?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", Repr::<K>(k.view()), Repr::<V>(v.view()))?;
        }
        f.write_str("}>")
    }
}

impl<K, V, S> fmt::Debug for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|(k, v)| (Repr::<K>(k.view()), Repr::<V>(v.view()))),
            )
            .finish()
    }
}

impl<K, V, S> Extend<(K, V)> for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.update(iter);
    }
}

impl<K, V, S> FromIterator<(K, V)> for PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_hasher(S::default());
        map.update(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a PocketMap<K, V, S>
where
    K: KindAdapter,
    V: KindAdapter,
    S: ByteHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct ConstHasher;
    impl ByteHasher for ConstHasher {
        fn hash_bytes(&self, _bytes: &[u8]) -> u64 {
            0 // every key in one group, one fingerprint
        }
    }

    fn s(k: &str) -> ByteString {
        ByteString::from(k)
    }

    fn pairs(m: &StrInt64Map) -> Vec<(String, i64)> {
        m.iter()
            .map(|(k, v)| (String::from_utf8(k.as_bytes().to_vec()).unwrap(), *v))
            .collect()
    }

    /// Invariant: insert/get round trip; overwrite returns the old value and
    /// does not change `len`.
    #[test]
    fn insert_get_overwrite() {
        let mut m = StrInt64Map::new();
        assert_eq!(m.insert(s("a"), 1), None);
        assert_eq!(m.insert(s("b"), 2), None);
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(b"a"), Some(&1));
        assert_eq!(m.insert(s("a"), 10), Some(1));
        assert_eq!(m.len(), 2);
        assert_eq!(m.get(b"a"), Some(&10));
        assert_eq!(m.get(b"zz"), None);
        m.assert_invariants();
    }

    /// The worked scenario: delete from the middle, then pop from the end.
    #[test]
    fn delete_then_pop_last_scenario() {
        let mut m = StrInt64Map::new();
        m.insert(s("a"), 1);
        m.insert(s("b"), 2);
        m.insert(s("c"), 3);
        assert_eq!(m.remove(b"b"), Some(2));
        assert_eq!(pairs(&m), vec![("a".into(), 1), ("c".into(), 3)]);
        assert_eq!(m.pop_last().unwrap(), (s("c"), 3));
        assert_eq!(pairs(&m), vec![("a".into(), 1)]);
        assert_eq!(m.pop_last().unwrap(), (s("a"), 1));
        assert_eq!(m.pop_last(), Err(Error::EmptyMap));
        assert!(m.is_empty());
        m.assert_invariants();
    }

    /// Invariant: overwriting keeps position; re-inserting after removal
    /// moves the key to the end.
    #[test]
    fn order_follows_most_recent_insertion() {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        for k in 0..5 {
            m.insert(k, k);
        }
        m.insert(1, 100);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        m.remove(&1);
        m.insert(1, 1);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3, 4, 1]);
        let (k, _) = m.pop_last().unwrap();
        assert_eq!(k, 1);
        m.insert(1, 1);
        assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![0, 2, 3, 4, 1]);
    }

    #[test]
    fn pop_and_pop_or() {
        let mut m = StrInt64Map::new();
        m.insert(s("abc"), 456);
        assert_eq!(m.pop(b"ghi"), Err(Error::KeyNotFound("'ghi'".into())));
        assert_eq!(m.pop(b"abc"), Ok(456));
        assert!(m.is_empty());
        assert!(m.pop(b"abc").is_err());
        assert_eq!(m.pop_or(b"abc", 7), 7);
        m.insert(s("abc"), 456);
        assert_eq!(m.pop_or(b"abc", 1), 456);
    }

    #[test]
    fn setdefault_and_get_or() {
        let mut m = StrInt64Map::new();
        assert_eq!(*m.setdefault(s("key0"), 0), 0);
        assert_eq!(*m.setdefault(s("key0"), 100), 0);
        assert_eq!(*m.setdefault(s("key1"), 1), 1);
        *m.setdefault(s("key1"), 5) += 1;
        assert_eq!(m.get(b"key1"), Some(&2));
        assert_eq!(m.get_or(b"key1", 9), 2);
        assert_eq!(m.get_or(b"nope", 9), 9);
        assert_eq!(m.len(), 2);
    }

    /// Invariant: all lookups still resolve when every key shares the same
    /// hash, across growth and tombstones.
    #[test]
    fn full_collisions_resolved_by_equality() {
        let mut m: PocketMap<i64, i64, ConstHasher> = PocketMap::with_hasher(ConstHasher);
        for k in 0..100 {
            m.insert(k, k * 2);
        }
        for k in (0..100).step_by(3) {
            assert_eq!(m.remove(&k), Some(k * 2));
        }
        for k in 0..100 {
            let expect = (k % 3 != 0).then_some(k * 2);
            assert_eq!(m.get(&k).copied(), expect);
        }
        m.assert_invariants();
    }

    /// Invariant: growth preserves every entry and order, and bumps the
    /// generation.
    #[test]
    fn growth_keeps_entries_and_order() {
        let mut m: PocketMap<i32, i32> = PocketMap::new();
        assert_eq!(m.capacity(), 16);
        for k in 0..1000 {
            m.insert(k, -k);
        }
        assert!(m.capacity() >= 1024);
        assert!(m.capacity().is_power_of_two());
        assert!(m.keys().copied().eq(0..1000));
        for k in 0..1000 {
            assert_eq!(m.get(&k), Some(&-k));
        }
        m.assert_invariants();
    }

    /// Invariant: insert/delete churn at a fixed size reclaims tombstones
    /// instead of growing without bound.
    #[test]
    fn churn_does_not_grow_index() {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        for k in 0..8 {
            m.insert(k, k);
        }
        for k in 8..10_000 {
            m.insert(k, k);
            m.remove(&(k - 8));
        }
        assert_eq!(m.len(), 8);
        assert!(m.capacity() <= 32, "capacity {}", m.capacity());
        m.assert_invariants();
    }

    /// Invariant: compaction drops holes once they outnumber live entries,
    /// keeping order.
    #[test]
    fn compaction_on_hole_ratio() {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        for k in 0..100 {
            m.insert(k, k);
        }
        for k in 0..50 {
            m.remove(&k);
            m.assert_invariants();
        }
        assert_eq!(m.entries.holes(), 0, "compacted at 50 holes vs 50 live");
        assert_eq!(m.entries.dense_len(), 50);
        assert!(m.keys().copied().eq(50..100));
    }

    /// Invariant: the dense entry array never outgrows the index load
    /// budget, even when trailing pops and middle removals interleave with
    /// inserts so that holes stay below the compaction ratio.
    #[test]
    fn dense_len_stays_within_load_budget() {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next_key = 0i64;
        for _ in 0..6000 {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            match (state >> 33) % 20 {
                0..=10 => {
                    m.insert(next_key, next_key);
                    next_key += 1;
                }
                11..=15 => {
                    let _ = m.pop_last();
                }
                _ => {
                    let k = m.keys().nth(m.len() / 3).copied();
                    if let Some(k) = k {
                        assert_eq!(m.remove(&k), Some(k));
                    }
                }
            }
            m.assert_invariants();
        }
    }

    /// Invariant: a rebuild of the index also drops dense holes.
    #[test]
    fn growth_compacts_holes() {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        for k in 0..14 {
            m.insert(k, k);
        }
        m.remove(&3);
        m.remove(&7);
        assert_eq!(m.entries.holes(), 2);
        let capacity = m.capacity();
        let mut k = 100;
        while m.capacity() == capacity {
            m.insert(k, k);
            k += 1;
        }
        assert_eq!(m.entries.holes(), 0);
        assert_eq!(m.entries.dense_len(), m.len());
        assert!(m.keys().take(3).copied().eq([0, 1, 2]));
        assert!(m.get(&3).is_none());
        m.assert_invariants();
    }

    #[test]
    fn resize_stability_ten_thousand() {
        let mut m = StrInt64Map::new();
        for i in 0..10_000 {
            m.insert(s(&i.to_string()), i);
        }
        for i in 0..10_000 {
            assert_eq!(m.remove(i.to_string().as_bytes()), Some(i));
        }
        assert!(m.is_empty());
        m.assert_invariants();
        m.insert(s("again"), 1);
        assert_eq!(m.get(b"again"), Some(&1));
    }

    #[test]
    fn cursor_detects_structural_change() {
        let mut m: PocketMap<i64, f64> = PocketMap::new();
        m.insert(1, 1.5);
        m.insert(2, 2.5);
        let mut c = m.cursor();
        assert_eq!(m.advance(&mut c), Ok(Some((&1, &1.5))));

        // Overwrite is not structural.
        m.insert(2, 3.5);
        assert_eq!(m.advance(&mut c), Ok(Some((&2, &3.5))));
        assert_eq!(m.advance(&mut c), Ok(None));

        let mut c = m.cursor();
        m.insert(3, 0.0);
        assert_eq!(m.advance(&mut c), Err(Error::Invalidated));

        // A fresh cursor restarts from the beginning.
        let mut c = m.cursor();
        let mut seen = Vec::new();
        while let Some((k, _)) = m.advance(&mut c).unwrap() {
            seen.push(*k);
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    /// Two read-only cursors can be outstanding at once.
    #[test]
    fn independent_read_cursors() {
        let m: PocketMap<i32, i32> = (0..4).map(|k| (k, k)).collect();
        let mut a = m.cursor();
        let mut b = m.cursor();
        assert_eq!(m.advance(&mut a).unwrap(), Some((&0, &0)));
        assert_eq!(m.advance(&mut a).unwrap(), Some((&1, &1)));
        assert_eq!(m.advance(&mut b).unwrap(), Some((&0, &0)));
    }

    #[test]
    fn clone_is_independent() {
        let mut a = StrInt64Map::new();
        a.insert(s("1"), 1);
        a.insert(s("2"), 2);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.insert(s("3"), 3);
        a.remove(b"1");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 3);
        assert_eq!(b.get(b"1"), Some(&1));
        assert_ne!(a, b);
    }

    /// Invariant: a cursor only advances on the map that created it.
    #[test]
    fn cursor_bound_to_its_map() {
        let a: PocketMap<i64, i64> = (0..3).map(|k| (k, k)).collect();
        let b = a.clone();
        let mut from_a = a.cursor();
        assert_eq!(b.advance(&mut from_a), Err(Error::Invalidated));

        let other: PocketMap<i64, i64> = PocketMap::new();
        let mut fresh = other.cursor();
        let empty: PocketMap<i64, i64> = PocketMap::new();
        assert_eq!(empty.advance(&mut fresh), Err(Error::Invalidated));

        let mut from_b = b.cursor();
        assert_eq!(b.advance(&mut from_b), Ok(Some((&0, &0))));
        let mut from_a = a.cursor();
        assert_eq!(a.advance(&mut from_a), Ok(Some((&0, &0))));
    }

    #[test]
    fn equality_ignores_order() {
        let a: PocketMap<i64, i64> = [(1, 1), (2, 2)].into_iter().collect();
        let b: PocketMap<i64, i64> = [(2, 2), (1, 1)].into_iter().collect();
        let c: PocketMap<i64, i64> = [(1, 1), (2, 3)].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn update_merges_in_order() {
        let mut dst = StrInt64Map::new();
        dst.insert(s("1"), 100);
        dst.insert(s("9"), 9);
        let mut src = StrInt64Map::new();
        src.insert(s("1"), 1);
        src.insert(s("2"), 2);
        dst.update_from(&src);
        assert_eq!(
            pairs(&dst),
            vec![("1".into(), 1), ("9".into(), 9), ("2".into(), 2)]
        );
    }

    #[test]
    fn clear_resets() {
        let mut m: PocketMap<i64, i64> = (0..100).map(|k| (k, k)).collect();
        let g = m.generation();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.capacity(), 16);
        assert!(m.generation() > g);
        m.insert(5, 5);
        assert_eq!(m.get(&5), Some(&5));
    }

    #[test]
    fn display_and_debug() {
        let mut m = StrInt64Map::new();
        assert_eq!(m.to_string(), "<pocket_map[str, int64]: {}>");
        m.insert(s("1"), 2);
        assert_eq!(m.to_string(), "<pocket_map[str, int64]: {'1': 2}>");
        m.insert(s("b"), -3);
        assert_eq!(
            m.to_string(),
            "<pocket_map[str, int64]: {'1': 2, 'b': -3}>"
        );
        assert_eq!(format!("{m:?}"), "{'1': 2, 'b': -3}");

        let f: PocketMap<f64, f32> = [(0.5, 1.0)].into_iter().collect();
        assert_eq!(f.to_string(), "<pocket_map[float64, float32]: {0.5: 1.0}>");
    }

    #[test]
    fn float_keys_zero_and_nan() {
        let mut m: PocketMap<f64, i32> = PocketMap::new();
        m.insert(0.0, 1);
        assert_eq!(m.insert(-0.0, 2), Some(1));
        assert_eq!(m.len(), 1);
        m.insert(f64::NAN, 3);
        assert_eq!(m.get(&f64::NAN), Some(&3));
        m.assert_invariants();
    }

    #[test]
    fn embedded_zero_keys_are_distinct() {
        let mut m = StrInt64Map::new();
        m.insert(ByteString::from(&b"a"[..]), 1);
        m.insert(ByteString::from(&b"a\0"[..]), 2);
        m.insert(ByteString::from(&b"\0a"[..]), 3);
        assert_eq!(m.len(), 3);
        assert_eq!(m.get(b"a\0"), Some(&2));
        assert_eq!(m.get(b"\0a"), Some(&3));
    }

    #[test]
    fn values_mut_updates_in_place() {
        let mut m: PocketMap<i32, i64> = (0..10).map(|k| (k, 0)).collect();
        for v in m.values_mut() {
            *v += 7;
        }
        assert!(m.values().all(|v| *v == 7));
        assert_eq!(m.iter().len(), 10);
    }

    #[test]
    fn with_capacity_presizes_index() {
        let m: PocketMap<i64, i64> = PocketMap::with_capacity(1000);
        assert_eq!(m.capacity(), 2048);
        assert!(m.is_empty());
    }
}
