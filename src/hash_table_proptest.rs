#![cfg(test)]

// Property tests for HashTable kept inside the crate so they can check the
// slot invariants through `check_invariants`.

use crate::error::Error;
use crate::hash_table::HashTable;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations: indices shrink to earlier keys, the pool shrinks,
// and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    Erase(usize),
    Get(usize),
    Contains(String),
    ContainsValue(i32),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=24).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            6 => (idx.clone(), -8i32..8).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::Erase),
            2 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (-8i32..8).prop_map(OpI::ContainsValue),
            1 => (idx.clone(), -8i32..8).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drives one op sequence against `sut`, mirroring it in a std HashMap.
// Invariants exercised after every op:
// - `len`/`is_empty` parity with the model.
// - `get`/`contains_key` parity; `get` on an absent key is `KeyNotFound`.
// - `insert` reports an overwrite exactly when the model had the key.
// - Every entry sits in bucket `hash mod table_size`; the size is prime.
// - `table_size` never decreases, including across `clear`.
fn run_state_machine<S: BuildHasher>(
    mut sut: HashTable<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut last_size = sut.table_size();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let existed = model.insert(k.clone(), v).is_some();
                prop_assert_eq!(sut.insert(k, v), existed);
            }
            OpI::Erase(i) => {
                let k = key_from(&pool, i);
                let expected = model.remove(&k).is_some();
                prop_assert_eq!(sut.erase(&k), expected);
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                match model.get(&k) {
                    Some(v) => prop_assert_eq!(sut.get(&k), Ok(v)),
                    None => prop_assert_eq!(sut.get(&k), Err(Error::KeyNotFound)),
                }
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::ContainsValue(v) => {
                let has_model = model.values().any(|&mv| mv == v);
                prop_assert_eq!(sut.contains_value(&v), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                match (sut.at(&k), model.get_mut(&k)) {
                    (Ok(v), Some(mv)) => {
                        *v = v.saturating_add(d);
                        *mv = mv.saturating_add(d);
                    }
                    (Err(Error::KeyNotFound), None) => {}
                    (got, want) => {
                        prop_assert!(false, "at mismatch: {:?} vs model {:?}", got, want);
                    }
                }
            }
            OpI::Clear => {
                sut.clear();
                model.clear();
            }
            OpI::Iterate => {
                let s_pairs: BTreeSet<(Key, i32)> =
                    sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                let m_pairs: BTreeSet<(Key, i32)> =
                    model.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(s_pairs, m_pairs);
                let s_keys: BTreeSet<Key> = sut.keys().into_iter().collect();
                let m_keys: BTreeSet<Key> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
        prop_assert!(sut.table_size() >= last_size, "table shrank");
        last_size = sut.table_size();
        if let Err(msg) = sut.check_invariants() {
            prop_assert!(false, "{}", msg);
        }
    }

    // Round-trip: every surviving key yields its latest value.
    for (k, v) in &model {
        prop_assert_eq!(sut.get(k), Ok(v));
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(HashTable::new(), pool, ops)?;
    }
}

// Constant hasher: every key collides in bucket 0, so growth is driven purely
// by chain length and every lookup walks the whole chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(HashTable::with_hasher(ConstBuildHasher), pool, ops)?;
    }
}

// Property: inserting distinct keys never loses one, whatever the growth
// sequence; len equals the number of distinct keys.
proptest! {
    #[test]
    fn prop_distinct_inserts_survive_growth(keys in proptest::collection::vec(any::<u16>(), 0..400)) {
        let mut sut: HashTable<u16, u32> = HashTable::new();
        for (i, k) in keys.iter().enumerate() {
            sut.insert(*k, i as u32);
        }
        let distinct: BTreeSet<u16> = keys.iter().copied().collect();
        prop_assert_eq!(sut.len(), distinct.len());
        for k in &distinct {
            let last = keys.iter().rposition(|x| x == k).map(|i| i as u32);
            prop_assert_eq!(sut.get(k).ok().copied(), last);
        }
        if let Err(msg) = sut.check_invariants() {
            prop_assert!(false, "{}", msg);
        }
    }
}
