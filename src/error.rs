//! Error kinds shared by `Bucket` and `HashTable`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Lookup of an absent key through an accessor with no `Option` form.
    #[error("key not found")]
    KeyNotFound,
    /// Popping or erasing from a bucket that holds no elements.
    #[error("operation on an empty container")]
    EmptyContainer,
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// `last` precedes `first` in an erase range.
    #[error("invalid range: end position {last} precedes start position {first}")]
    InvalidRange { first: usize, last: usize },
    /// The bucket was structurally mutated after the cursor was taken.
    #[error("stale cursor: taken at generation {cursor}, bucket is at generation {current}")]
    StaleCursor { cursor: u64, current: u64 },
    #[error("cursor belongs to a different bucket")]
    ForeignCursor,
}

pub type Result<T> = core::result::Result<T, Error>;
