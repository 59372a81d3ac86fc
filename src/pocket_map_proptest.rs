#![cfg(test)]

// Property tests for PocketMap kept inside the crate so they can check the
// index/store correspondence after every step.

use crate::adapter::ByteString;
use crate::error::Error;
use crate::growth::capacity_for;
use crate::hasher::{ByteHasher, PocketHasher};
use crate::pocket_map::PocketMap;
use proptest::prelude::*;

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i64),
    SetDefault(usize, i64),
    Remove(usize),
    Pop(usize),
    PopLast,
    Get(usize),
    Clear,
    Iterate,
    Cursor,
}

/// Ordered reference model: a plain vector of pairs in iteration order.
#[derive(Default)]
struct Model(Vec<(Vec<u8>, i64)>);

impl Model {
    fn position(&self, k: &[u8]) -> Option<usize> {
        self.0.iter().position(|(mk, _)| mk == k)
    }

    fn get(&self, k: &[u8]) -> Option<i64> {
        self.position(k).map(|i| self.0[i].1)
    }

    fn insert(&mut self, k: &[u8], v: i64) -> Option<i64> {
        match self.position(k) {
            Some(i) => Some(core::mem::replace(&mut self.0[i].1, v)),
            None => {
                self.0.push((k.to_vec(), v));
                None
            }
        }
    }

    fn remove(&mut self, k: &[u8]) -> Option<i64> {
        self.position(k).map(|i| self.0.remove(i).1)
    }
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            1 => (idx.clone(), any::<i64>()).prop_map(|(i, v)| OpI::SetDefault(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Pop),
            1 => Just(OpI::PopLast),
            1 => idx.clone().prop_map(OpI::Get),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::Cursor),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

fn run_state_machine<S: ByteHasher>(
    mut sut: PocketMap<ByteString, i64, S>,
    pool: &[String],
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model = Model::default();
    for op in ops {
        let generation = sut.generation();
        match op {
            OpI::Insert(i, v) => {
                let k = pool[i].as_bytes();
                let was_present = model.get(k).is_some();
                prop_assert_eq!(sut.insert(ByteString::from(k), v), model.insert(k, v));
                if was_present {
                    prop_assert_eq!(sut.generation(), generation, "overwrite is not structural");
                }
            }
            OpI::SetDefault(i, v) => {
                let k = pool[i].as_bytes();
                let expect = match model.get(k) {
                    Some(old) => old,
                    None => {
                        model.insert(k, v);
                        v
                    }
                };
                prop_assert_eq!(*sut.setdefault(ByteString::from(k), v), expect);
            }
            OpI::Remove(i) => {
                let k = pool[i].as_bytes();
                prop_assert_eq!(sut.remove(k), model.remove(k));
            }
            OpI::Pop(i) => {
                let k = pool[i].as_bytes();
                match model.remove(k) {
                    Some(v) => {
                        prop_assert_eq!(sut.pop(k), Ok(v));
                    }
                    None => {
                        prop_assert!(matches!(sut.pop(k), Err(Error::KeyNotFound(_))));
                    }
                }
            }
            OpI::PopLast => match model.0.pop() {
                Some((k, v)) => {
                    prop_assert_eq!(sut.pop_last(), Ok((ByteString::from(k), v)));
                }
                None => {
                    prop_assert_eq!(sut.pop_last(), Err(Error::EmptyMap));
                }
            },
            OpI::Get(i) => {
                let k = pool[i].as_bytes();
                prop_assert_eq!(sut.get(k).copied(), model.get(k));
                prop_assert_eq!(sut.contains_key(k), model.get(k).is_some());
            }
            OpI::Clear => {
                sut.clear();
                model.0.clear();
            }
            OpI::Iterate => {
                let got: Vec<(Vec<u8>, i64)> = sut
                    .iter()
                    .map(|(k, v)| (k.as_bytes().to_vec(), *v))
                    .collect();
                prop_assert_eq!(&got, &model.0);
            }
            OpI::Cursor => {
                let mut c = sut.cursor();
                let mut got = Vec::new();
                while let Some((k, v)) = sut.advance(&mut c)? {
                    got.push((k.as_bytes().to_vec(), *v));
                }
                prop_assert_eq!(&got, &model.0);
            }
        }

        prop_assert_eq!(sut.len(), model.0.len());
        prop_assert_eq!(sut.is_empty(), model.0.is_empty());
        sut.assert_invariants();
    }
    let order: Vec<&[u8]> = sut.keys().map(|k| k.as_bytes()).collect();
    let expect: Vec<&[u8]> = model.0.iter().map(|(k, _)| k.as_slice()).collect();
    prop_assert_eq!(order, expect);
    Ok(())
}

// `From<Error> for TestCaseError` is provided by proptest's blanket impl.

// Property: state-machine equivalence against an ordered vector of pairs.
// Invariants exercised across random operation sequences:
// - `insert` returns the previous value and overwrites in place.
// - `remove`/`pop`/`pop_last` return exactly what the model removes.
// - iteration and cursor walks yield live entries in insertion order.
// - every occupied slot references one alive entry and vice versa.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(PocketMap::with_hasher(PocketHasher::default()), &pool, ops)?;
    }
}

#[derive(Clone, Default)]
struct ConstHasher;
impl ByteHasher for ConstHasher {
    fn hash_bytes(&self, _bytes: &[u8]) -> u64 {
        0
    }
}

// Property: same state machine under a constant hash, so every key shares one
// start group and one fingerprint and only equality tells them apart.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(PocketMap::with_hasher(ConstHasher), &pool, ops)?;
    }
}

// Property: an int64-keyed map fed a long insert/delete stream keeps its
// index bounded by the number of live keys, not by the number of inserts.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_churn_keeps_index_bounded(window in 1usize..64, rounds in 100usize..2000) {
        let mut m: PocketMap<i64, i64> = PocketMap::new();
        for k in 0..rounds as i64 {
            m.insert(k, k);
            if k as usize >= window {
                prop_assert_eq!(m.remove(&(k - window as i64)), Some(k - window as i64));
            }
        }
        prop_assert_eq!(m.len(), window.min(rounds));
        prop_assert!(m.capacity() <= capacity_for(2 * window + 4), "capacity {}", m.capacity());
        m.assert_invariants();
    }
}
