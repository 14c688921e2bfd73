//! chain-hashmap: a single-threaded chaining HashMap built from first
//! principles over arena-backed singly-linked buckets.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a key/value map whose two halves, the slot table and the bucket
//!   list, agree exactly so that no entry is ever lost across a resize.
//! - Layers:
//!   - `prime`: pure helpers picking prime table sizes.
//!   - `Bucket<T>`: singly-linked list with push/pop at both ends,
//!     positional insert/erase through forward `Cursor`s, in-place reverse
//!     and sort. Nodes live in a `slotmap` arena; links are generational
//!     keys.
//!   - `HashTable<K, V, S>`: a vector of `Bucket`s indexed by
//!     `hash(key) mod table_size`; owns growth, rehash and the map API.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` through the reentrancy tracker.
//! - Unique keys: `insert` overwrites and reports whether it did.
//! - `table_size` starts at 3, is always prime and never shrinks.
//! - Keys implement `Hash + Eq`; hashing goes through a `BuildHasher`
//!   (default `RandomState`) fixed for the table's lifetime.
//!
//! Growth policy
//! - `max_bucket_len` tracks the longest bucket since the last rehash.
//!   When `max_bucket_len + 1` reaches the bucket count, the next insert
//!   first grows the table to `next_prime(table_size)`.
//! - Rehash hashes every key up front, moves each entry into a brand-new
//!   bucket vector under the new modulus, then swaps that vector in.
//!   Entries are redistributed one by one; colliding entries from one old
//!   bucket may land in different new buckets.
//!
//! Cursor invalidation
//! - Every `Bucket` carries a process-unique identity and a generation
//!   counter bumped by each structural mutation. A `Cursor` records both;
//!   using it against another bucket or a later generation returns
//!   `Error::ForeignCursor` or `Error::StaleCursor`.
//!
//! Reentrancy policy
//! - Every `HashTable` method that runs user code (`Hash`, `Eq`, `Clone`,
//!   `Debug`, `Drop`) while walking the buckets takes a debug-only guard:
//!   `insert`, `get`, `at`, `contains_key`, `contains_value`, `remove`,
//!   `erase`, `clear`, `keys`, `values`, `value_set`, `Clone` and `Debug`.
//!   Calling back into the same table from that code panics in debug
//!   builds; the check compiles away in release builds.
//! - Lazy iterators (`iter`, `iter_mut`, `values_mut`, `into_iter`) are
//!   unguarded; user code runs in the caller between items.
//!
//! Errors
//! - Absence with a natural sentinel (`erase`, `contains_key`) returns
//!   `bool`. Accessors with no sentinel (`get`, `at`, `pop_*`) return
//!   `Result<_, Error>`.

pub mod bucket;
pub mod error;
mod hash_table;
mod hash_table_proptest;
pub mod prime;
mod reentrancy;

// Public surface
pub use bucket::{Bucket, Cursor};
pub use error::{Error, Result};
pub use hash_table::{HashTable, IntoIter, INITIAL_TABLE_SIZE, MAX_CAPACITY_HINT};
