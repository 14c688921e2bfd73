//! HashTable: chaining map over `Bucket`s with prime-sized growth.
//!
//! Growth trigger: before each insert, if the longest bucket plus one would
//! reach the bucket count, the table grows to `next_prime(table_size)` and
//! every entry is rehashed into a fresh bucket vector, which then replaces
//! the old one.

use crate::bucket::Bucket;
use crate::error::{Error, Result};
use crate::prime::{next_prime, prime_at_least};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashSet;
use log::{debug, trace};
use std::collections::hash_map::RandomState;

/// Bucket count of a freshly constructed table.
pub const INITIAL_TABLE_SIZE: usize = 3;

/// Largest capacity hint honored by `with_capacity`; larger hints are
/// clamped. Tables still grow past it through inserts.
pub const MAX_CAPACITY_HINT: usize = 1 << 16;

#[derive(Clone, Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

#[inline]
fn slot_of<Q, S>(hasher: &S, q: &Q, table_size: usize) -> usize
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    (hasher.hash_one(q) % table_size as u64) as usize
}

fn empty_buckets<K, V>(n: usize) -> Vec<Bucket<Entry<K, V>>> {
    (0..n).map(|_| Bucket::new()).collect()
}

/// One generation of the bucket vector. `buckets.len() == table_size`.
#[derive(Clone)]
struct Slots<K, V> {
    buckets: Vec<Bucket<Entry<K, V>>>,
    table_size: usize,
    // High-water mark since the last rehash or clear.
    max_bucket_len: usize,
}

impl<K, V> Slots<K, V>
where
    K: Eq + Hash,
{
    fn with_size(table_size: usize) -> Self {
        Self {
            buckets: empty_buckets(table_size),
            table_size,
            max_bucket_len: 0,
        }
    }

    fn needs_growth(&self, idx: usize) -> bool {
        idx >= self.buckets.len() || self.max_bucket_len + 1 >= self.buckets.len()
    }

    fn grow<S: BuildHasher>(&mut self, hasher: &S) {
        let old_size = self.table_size;
        let new_size = next_prime(old_size);

        // All user hashing happens before the first entry moves.
        let targets: Vec<usize> = self
            .buckets
            .iter()
            .flat_map(Bucket::iter)
            .map(|e| slot_of(hasher, &e.key, new_size))
            .collect();

        let mut fresh = empty_buckets(new_size);
        let old = core::mem::take(&mut self.buckets);
        for (entry, idx) in old.into_iter().flatten().zip(targets.iter().copied()) {
            fresh[idx].push_back(entry);
        }

        self.max_bucket_len = fresh.iter().map(Bucket::len).max().unwrap_or(0);
        self.buckets = fresh;
        self.table_size = new_size;
        debug!(
            "hash table grew from {} to {} buckets, rehashed {} entries (longest bucket {})",
            old_size,
            new_size,
            targets.len(),
            self.max_bucket_len
        );
    }

    fn insert<S: BuildHasher>(&mut self, hasher: &S, key: K, value: V) -> bool {
        let mut idx = slot_of(hasher, &key, self.table_size);
        if self.needs_growth(idx) {
            self.grow(hasher);
            idx = slot_of(hasher, &key, self.table_size);
        }

        let bucket = &mut self.buckets[idx];
        if let Some(entry) = bucket.find_mut(|e| e.key == key) {
            entry.value = value;
            return true;
        }
        bucket.push_back(Entry { key, value });
        self.max_bucket_len = self.max_bucket_len.max(bucket.len());
        false
    }
}

pub struct HashTable<K, V, S = RandomState> {
    hasher: S,
    slots: Slots<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> HashTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// Start with the smallest prime bucket count of at least `capacity`,
    /// with `capacity` clamped to `INITIAL_TABLE_SIZE..=MAX_CAPACITY_HINT`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> Default for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            slots: Slots::with_size(INITIAL_TABLE_SIZE),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        if capacity > MAX_CAPACITY_HINT {
            debug!(
                "capacity hint {} clamped to {}",
                capacity, MAX_CAPACITY_HINT
            );
        }
        let size = prime_at_least(capacity.clamp(INITIAL_TABLE_SIZE, MAX_CAPACITY_HINT));
        Self {
            hasher,
            slots: Slots::with_size(size),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Current modulus; always prime, never shrinks.
    pub fn table_size(&self) -> usize {
        self.slots.table_size
    }

    /// Growth trigger: longest bucket seen since the last rehash or clear.
    pub fn max_bucket_len(&self) -> usize {
        self.slots.max_bucket_len
    }

    /// Length of every bucket in slot order.
    pub fn bucket_lengths(&self) -> Vec<usize> {
        self.slots.buckets.iter().map(Bucket::len).collect()
    }

    /// Sum of bucket lengths; O(table_size).
    pub fn len(&self) -> usize {
        self.slots.buckets.iter().map(Bucket::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.buckets.iter().all(Bucket::is_empty)
    }

    /// Insert or overwrite. Returns `true` when `key` was already present
    /// and its value was replaced.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let _g = self.reentrancy.enter("insert");
        self.slots.insert(&self.hasher, key, value)
    }

    pub fn get<Q>(&self, q: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("get");
        let idx = slot_of(&self.hasher, q, self.slots.table_size);
        self.slots.buckets[idx]
            .find(|e| e.key.borrow() == q)
            .map(|e| &e.value)
            .ok_or(Error::KeyNotFound)
    }

    /// Mutable access to the value stored under `q`.
    pub fn at<Q>(&mut self, q: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("at");
        let idx = slot_of(&self.hasher, q, self.slots.table_size);
        self.slots.buckets[idx]
            .find_mut(|e| e.key.borrow() == q)
            .map(|e| &mut e.value)
            .ok_or(Error::KeyNotFound)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("contains_key");
        let idx = slot_of(&self.hasher, q, self.slots.table_size);
        self.slots.buckets[idx]
            .find(|e| e.key.borrow() == q)
            .is_some()
    }

    /// O(n) scan of every bucket.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _g = self.reentrancy.enter("contains_value");
        self.iter().any(|(_, v)| v == value)
    }

    /// Remove `q` and return the stored pair.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter("remove");
        let idx = slot_of(&self.hasher, q, self.slots.table_size);
        self.slots.buckets[idx]
            .remove_first(|e| e.key.borrow() == q)
            .map(|e| (e.key, e.value))
    }

    /// Returns `false` when `q` was absent.
    pub fn erase<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove(q).is_some()
    }

    /// Drop every entry; the bucket count is kept.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter("clear");
        for bucket in &mut self.slots.buckets {
            bucket.clear();
        }
        self.slots.max_bucket_len = 0;
        trace!("hash table cleared, keeping {} buckets", self.slots.table_size);
    }

    pub fn keys(&self) -> HashSet<K>
    where
        K: Clone,
    {
        let _g = self.reentrancy.enter("keys");
        self.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        let _g = self.reentrancy.enter("values");
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn value_set(&self) -> HashSet<V>
    where
        V: Clone + Eq + Hash,
    {
        let _g = self.reentrancy.enter("value_set");
        self.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Bucket order, then insertion order within a bucket. The order changes
    /// whenever the table grows. Unguarded: lookups on the same table
    /// between items are allowed.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.slots
            .buckets
            .iter()
            .flat_map(Bucket::iter)
            .map(|e| (&e.key, &e.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> + '_ {
        self.slots
            .buckets
            .iter_mut()
            .flat_map(Bucket::iter_mut)
            .map(|e| (&e.key, &mut e.value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> + '_ {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Checks the slot invariants; test builds only.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> core::result::Result<(), String> {
        let s = &self.slots;
        if s.buckets.len() != s.table_size {
            return Err(format!(
                "{} buckets for table size {}",
                s.buckets.len(),
                s.table_size
            ));
        }
        if !crate::prime::is_prime(s.table_size) {
            return Err(format!("table size {} is not prime", s.table_size));
        }
        for (idx, bucket) in s.buckets.iter().enumerate() {
            if bucket.len() > s.max_bucket_len {
                return Err(format!(
                    "bucket {} has {} entries, above max_bucket_len {}",
                    idx,
                    bucket.len(),
                    s.max_bucket_len
                ));
            }
            for e in bucket {
                let home = slot_of(&self.hasher, &e.key, s.table_size);
                if home != idx {
                    return Err(format!("entry in bucket {} belongs in {}", idx, home));
                }
            }
        }
        Ok(())
    }
}

impl<K, V, S> Clone for HashTable<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        let _g = self.reentrancy.enter("clone");
        Self {
            hasher: self.hasher.clone(),
            slots: self.slots.clone(),
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K, V, S> fmt::Debug for HashTable<K, V, S>
where
    K: Eq + Hash + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _g = self.reentrancy.enter("fmt");
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> Extend<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::default();
        table.extend(iter);
        table
    }
}

/// Owning iterator over `(K, V)` pairs in bucket order.
pub struct IntoIter<K, V> {
    it: core::iter::Flatten<std::vec::IntoIter<Bucket<Entry<K, V>>>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|e| (e.key, e.value))
    }
}

impl<K, V, S> IntoIterator for HashTable<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            it: self.slots.buckets.into_iter().flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::hash::Hasher;

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
        } // every key lands in bucket 0
    }

    /// Invariant: a fresh table has three empty buckets and no keys.
    #[test]
    fn new_table_is_empty() {
        let m: HashTable<String, i32> = HashTable::new();
        assert_eq!(m.table_size(), INITIAL_TABLE_SIZE);
        assert_eq!(m.len(), 0);
        assert!(m.is_empty());
        assert_eq!(m.get("anything"), Err(Error::KeyNotFound));
        assert!(!m.contains_key("anything"));
        m.check_invariants().unwrap();
    }

    /// Invariant: insert reports whether it overwrote; len counts distinct keys.
    #[test]
    fn insert_overwrites_and_reports() {
        let mut m: HashTable<String, i32> = HashTable::new();
        assert!(!m.insert("k".to_string(), 1));
        assert!(m.insert("k".to_string(), 2));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("k"), Ok(&2));
    }

    /// All keys collide: the table grows from 3 to 5 on the third insert and
    /// keeps every entry; erasing one leaves the rest.
    #[test]
    fn colliding_keys_grow_to_next_prime() {
        let mut m: HashTable<&'static str, i32, ConstBuildHasher> =
            HashTable::with_hasher(ConstBuildHasher);
        for (i, k) in ["a", "b", "c", "d"].into_iter().enumerate() {
            assert!(!m.insert(k, i as i32 + 1));
            m.check_invariants().unwrap();
        }
        assert_eq!(m.table_size(), 5);
        assert_eq!(m.max_bucket_len(), 4);
        assert_eq!(m.bucket_lengths(), vec![4, 0, 0, 0, 0]);
        for (i, k) in ["a", "b", "c", "d"].into_iter().enumerate() {
            assert_eq!(m.get(&k), Ok(&(i as i32 + 1)));
        }

        assert!(m.erase(&"b"));
        assert!(!m.contains_key(&"b"));
        assert_eq!(m.len(), 3);
        assert!(!m.erase(&"b"));
    }

    /// Invariant: growth is lossless across many resizes.
    #[test]
    fn growth_preserves_membership() {
        let mut m: HashTable<u64, u64> = HashTable::new();
        for i in 0..200 {
            m.insert(i, i * 10);
        }
        assert!(m.table_size() >= 7, "expected at least two growths");
        assert_eq!(m.len(), 200);
        for i in 0..200 {
            assert_eq!(m.get(&i), Ok(&(i * 10)));
        }
        m.check_invariants().unwrap();
    }

    #[test]
    fn table_size_never_shrinks() {
        let mut m: HashTable<u32, ()> = HashTable::new();
        let mut last = m.table_size();
        for i in 0..100 {
            m.insert(i, ());
            assert!(m.table_size() >= last);
            last = m.table_size();
        }
        for i in 0..100 {
            m.erase(&i);
        }
        m.clear();
        assert_eq!(m.table_size(), last);
        assert!(m.is_empty());
    }

    #[test]
    fn erase_then_reinsert() {
        let mut m: HashTable<String, i32> = HashTable::new();
        m.insert("k".to_string(), 1);
        assert!(m.erase("k"));
        assert!(!m.contains_key("k"));
        assert_eq!(m.get("k"), Err(Error::KeyNotFound));
        assert!(!m.insert("k".to_string(), 2));
        assert_eq!(m.get("k"), Ok(&2));
    }

    #[test]
    fn remove_returns_pair() {
        let mut m: HashTable<String, i32> = HashTable::new();
        m.insert("x".to_string(), 5);
        assert_eq!(m.remove("x"), Some(("x".to_string(), 5)));
        assert_eq!(m.remove("x"), None);
    }

    #[test]
    fn at_mutates_in_place() {
        let mut m: HashTable<String, i32> = HashTable::new();
        m.insert("k".to_string(), 10);
        *m.at("k").unwrap() += 5;
        assert_eq!(m.get("k"), Ok(&15));
        assert_eq!(m.at("missing"), Err(Error::KeyNotFound));
    }

    #[test]
    fn value_queries_and_enumeration() {
        let mut m: HashTable<&'static str, i32> = HashTable::new();
        m.insert("a", 1);
        m.insert("b", 2);
        m.insert("c", 2);
        assert!(m.contains_value(&2));
        assert!(!m.contains_value(&3));

        let keys: BTreeSet<_> = m.keys().into_iter().collect();
        assert_eq!(keys, ["a", "b", "c"].into_iter().collect());

        let mut values = m.values();
        values.sort();
        assert_eq!(values, vec![1, 2, 2]);
        assert_eq!(m.value_set().len(), 2);
    }

    #[test]
    fn clear_keeps_bucket_count() {
        let mut m: HashTable<u32, u32> = HashTable::new();
        for i in 0..50 {
            m.insert(i, i);
        }
        let size = m.table_size();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
        assert_eq!(m.table_size(), size);
        assert_eq!(m.max_bucket_len(), 0);
        m.insert(1, 1);
        assert_eq!(m.get(&1), Ok(&1));
    }

    #[test]
    fn iter_mut_updates_values() {
        let mut m: HashTable<String, i32> = (0..10).map(|i| (format!("k{}", i), i)).collect();
        for (_k, v) in m.iter_mut() {
            *v += 100;
        }
        for v in m.values_mut() {
            *v *= 2;
        }
        for i in 0..10 {
            assert_eq!(m.get(format!("k{}", i).as_str()), Ok(&((i + 100) * 2)));
        }
        let owned: BTreeSet<(String, i32)> = m.into_iter().collect();
        assert_eq!(owned.len(), 10);
    }

    #[test]
    fn with_capacity_rounds_to_prime() {
        let m: HashTable<u8, u8> = HashTable::with_capacity(10);
        assert_eq!(m.table_size(), 11);
        let m: HashTable<u8, u8> = HashTable::with_capacity(0);
        assert_eq!(m.table_size(), INITIAL_TABLE_SIZE);
    }

    /// Invariant: oversized hints are clamped before any prime search or
    /// allocation; the table still grows past the clamp through inserts.
    #[test]
    fn with_capacity_clamps_huge_hints() {
        let clamped = prime_at_least(MAX_CAPACITY_HINT);
        let m: HashTable<u8, u8> = HashTable::with_capacity(usize::MAX);
        assert_eq!(m.table_size(), clamped);
        let m: HashTable<u8, u8> = HashTable::with_capacity(MAX_CAPACITY_HINT + 1);
        assert_eq!(m.table_size(), clamped);

        let mut m: HashTable<u32, (), ConstBuildHasher> =
            HashTable::with_capacity_and_hasher(usize::MAX, ConstBuildHasher);
        assert_eq!(m.table_size(), clamped);
        m.insert(1, ());
        assert_eq!(m.get(&1), Ok(&()));
        m.check_invariants().unwrap();
    }

    #[test]
    fn clone_is_independent() {
        let mut a: HashTable<u8, u8> = HashTable::new();
        a.insert(1, 1);
        let mut b = a.clone();
        b.insert(1, 2);
        b.insert(2, 2);
        assert_eq!(a.get(&1), Ok(&1));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn debug_renders_as_map() {
        let mut m: HashTable<&'static str, i32> = HashTable::new();
        m.insert("only", 1);
        assert_eq!(format!("{:?}", m), r#"{"only": 1}"#);
    }

    /// Invariant (debug-only): re-entering the table from `K: Eq` during a
    /// probe panics; release builds skip this test.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_get() {
        struct ReentryKey {
            id: &'static str,
            map: *const HashTable<ReentryKey, i32, ConstBuildHasher>,
            trigger: bool,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if self.id == other.id {
                    return true;
                }
                if other.trigger {
                    unsafe {
                        let m = &*other.map;
                        let _ = m.contains_key(self.id);
                    }
                }
                false
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
        impl Borrow<str> for ReentryKey {
            fn borrow(&self) -> &str {
                self.id
            }
        }

        let mut m: HashTable<ReentryKey, i32, ConstBuildHasher> =
            HashTable::with_hasher(ConstBuildHasher);
        let stored = ReentryKey {
            id: "a",
            map: &m as *const _,
            trigger: false,
        };
        m.insert(stored, 1);

        let query = ReentryKey {
            id: "b",
            map: &m as *const _,
            trigger: true,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = m.get(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    /// Invariant (debug-only): value-scanning entry points are guarded like
    /// the probing ones, and the panic names both operations.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_value_code_in_scans() {
        // Value whose `PartialEq` calls back into the table holding it.
        struct ReentryValue {
            map: *const HashTable<u8, ReentryValue>,
        }
        impl PartialEq for ReentryValue {
            fn eq(&self, other: &Self) -> bool {
                if !other.map.is_null() {
                    unsafe {
                        let _ = (*other.map).contains_key(&0u8);
                    }
                }
                false
            }
        }
        impl Clone for ReentryValue {
            fn clone(&self) -> Self {
                if !self.map.is_null() {
                    unsafe {
                        let _ = (*self.map).contains_key(&0u8);
                    }
                }
                ReentryValue { map: self.map }
            }
        }
        impl fmt::Debug for ReentryValue {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if !self.map.is_null() {
                    unsafe {
                        let _ = (*self.map).contains_key(&0u8);
                    }
                }
                f.write_str("ReentryValue")
            }
        }

        fn panic_message(res: std::thread::Result<()>) -> String {
            let err = res.expect_err("expected reentrancy to panic in debug builds");
            err.downcast_ref::<String>().cloned().unwrap_or_default()
        }

        let mut m: HashTable<u8, ReentryValue> = HashTable::new();
        m.insert(1, ReentryValue { map: core::ptr::null() });
        let query = ReentryValue { map: &m as *const _ };
        let msg = panic_message(std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || {
                let _ = m.contains_value(&query);
            },
        )));
        assert!(msg.contains("contains_value"), "{msg}");
        assert!(msg.contains("contains_key"), "{msg}");

        // Stored values that reenter on Clone or Debug.
        let mut m: HashTable<u8, ReentryValue> = HashTable::new();
        m.insert(1, ReentryValue { map: core::ptr::null() });
        let ptr = &m as *const HashTable<u8, ReentryValue>;
        m.at(&1).unwrap().map = ptr;

        for op in ["values", "clone", "fmt"] {
            let msg = panic_message(std::panic::catch_unwind(std::panic::AssertUnwindSafe(
                || match op {
                    "values" => {
                        let _ = m.values();
                    }
                    "clone" => {
                        let _ = m.clone();
                    }
                    _ => {
                        let _ = format!("{:?}", m);
                    }
                },
            )));
            assert!(msg.contains(op), "{op}: {msg}");
        }
    }

    /// Lazy iteration is unguarded: lookups between items are allowed.
    #[test]
    fn lookups_during_iteration_are_allowed() {
        let m: HashTable<u32, u32> = (0..20).map(|i| (i, i * 2)).collect();
        let mut seen = 0;
        for (k, v) in m.iter() {
            assert_eq!(m.get(k), Ok(v));
            assert!(m.contains_key(k));
            seen += 1;
        }
        assert_eq!(seen, 20);
    }
}
