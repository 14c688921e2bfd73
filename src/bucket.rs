//! Bucket: singly-linked list whose nodes live in a generational arena.
//!
//! Links are arena keys (`slotmap`), never pointers. Each node owns one
//! element and the key of its successor; the bucket owns the arena, the
//! head and tail keys, and a structural generation counter.
//!
//! Cursors are forward-only positions. A cursor remembers the bucket it came
//! from and the generation it was taken at, so any use after a structural
//! mutation (push, pop, insert, erase, reverse, sort, clear) fails with
//! `Error::StaleCursor` instead of observing a reused slot.

use crate::error::{Error, Result};
use core::cmp::Ordering;
use core::fmt;
use core::sync::atomic::{self, AtomicU64};
use slotmap::{new_key_type, SecondaryMap, SlotMap};

new_key_type! {
    struct NodeKey;
}

static NEXT_BUCKET_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct BucketId(u64);

impl BucketId {
    fn fresh() -> Self {
        BucketId(NEXT_BUCKET_ID.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    value: T,
    next: Option<NodeKey>,
}

/// Forward position inside one generation of one `Bucket`.
///
/// Equality compares bucket identity, generation and position.
#[derive(Copy, Clone, Debug)]
pub struct Cursor {
    owner: BucketId,
    generation: u64,
    position: usize,
    prev: Option<NodeKey>,
    node: Option<NodeKey>,
}

impl Cursor {
    /// Zero-based distance from the head.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.generation == other.generation
            && self.position == other.position
    }
}

impl Eq for Cursor {}

pub struct Bucket<T> {
    nodes: SlotMap<NodeKey, Node<T>>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
    len: usize,
    generation: u64,
    id: BucketId,
}

impl<T> Bucket<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
            len: 0,
            generation: 0,
            id: BucketId::fresh(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Structural generation; bumps on every link change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn validate(&self, cursor: &Cursor) -> Result<()> {
        if cursor.owner != self.id {
            return Err(Error::ForeignCursor);
        }
        if cursor.generation != self.generation {
            return Err(Error::StaleCursor {
                cursor: cursor.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::IndexOutOfRange {
            index,
            len: self.len,
        }
    }

    fn node_at(&self, index: usize) -> Option<NodeKey> {
        let mut cur = self.head;
        for _ in 0..index {
            cur = self.nodes[cur?].next;
        }
        cur
    }

    fn predecessor(&self, target: NodeKey) -> Option<NodeKey> {
        let mut prev = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            if k == target {
                return prev;
            }
            prev = Some(k);
            cur = self.nodes[k].next;
        }
        None
    }

    /// Splice `key` out of the chain; `prev` must be its predecessor.
    fn unlink(&mut self, prev: Option<NodeKey>, key: NodeKey) -> T {
        let node = self
            .nodes
            .remove(key)
            .expect("linked node must be live in the arena");
        match prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.head = node.next,
        }
        if self.tail == Some(key) {
            self.tail = prev;
        }
        self.len -= 1;
        self.bump();
        node.value
    }

    pub fn push_front(&mut self, value: T) {
        let key = self.nodes.insert(Node {
            value,
            next: self.head,
        });
        self.head = Some(key);
        if self.tail.is_none() {
            self.tail = Some(key);
        }
        self.len += 1;
        self.bump();
    }

    pub fn push_back(&mut self, value: T) {
        let key = self.nodes.insert(Node { value, next: None });
        match self.tail {
            Some(t) => self.nodes[t].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.len += 1;
        self.bump();
    }

    pub fn pop_front(&mut self) -> Result<T> {
        let head = self.head.ok_or(Error::EmptyContainer)?;
        Ok(self.unlink(None, head))
    }

    /// O(len): the tail's predecessor is found by walking from the head.
    pub fn pop_back(&mut self) -> Result<T> {
        let tail = self.tail.ok_or(Error::EmptyContainer)?;
        let prev = self.predecessor(tail);
        Ok(self.unlink(prev, tail))
    }

    pub fn front(&self) -> Option<&T> {
        self.head.map(|k| &self.nodes[k].value)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        let k = self.head?;
        Some(&mut self.nodes[k].value)
    }

    /// O(index) positional access.
    pub fn at(&self, index: usize) -> Result<&T> {
        let k = self
            .node_at(index)
            .ok_or_else(|| self.out_of_range(index))?;
        Ok(&self.nodes[k].value)
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut T> {
        let k = self
            .node_at(index)
            .ok_or_else(|| self.out_of_range(index))?;
        Ok(&mut self.nodes[k].value)
    }

    pub fn begin(&self) -> Cursor {
        Cursor {
            owner: self.id,
            generation: self.generation,
            position: 0,
            prev: None,
            node: self.head,
        }
    }

    pub fn end(&self) -> Cursor {
        Cursor {
            owner: self.id,
            generation: self.generation,
            position: self.len,
            prev: self.tail,
            node: None,
        }
    }

    fn step(&self, cursor: Cursor, at: NodeKey) -> Cursor {
        Cursor {
            position: cursor.position + 1,
            prev: Some(at),
            node: self.nodes[at].next,
            ..cursor
        }
    }

    /// Cursor at `index`; `index == len()` yields the end cursor.
    pub fn cursor_at(&self, index: usize) -> Result<Cursor> {
        if index > self.len {
            return Err(self.out_of_range(index));
        }
        let mut cursor = self.begin();
        while cursor.position < index {
            match cursor.node {
                Some(at) => cursor = self.step(cursor, at),
                None => break,
            }
        }
        Ok(cursor)
    }

    /// Move one link forward. Advancing the end cursor is out of range.
    pub fn advance(&self, cursor: Cursor) -> Result<Cursor> {
        self.validate(&cursor)?;
        let at = cursor
            .node
            .ok_or_else(|| self.out_of_range(cursor.position))?;
        Ok(self.step(cursor, at))
    }

    pub fn get(&self, cursor: Cursor) -> Result<&T> {
        self.validate(&cursor)?;
        let k = cursor
            .node
            .ok_or_else(|| self.out_of_range(cursor.position))?;
        Ok(&self.nodes[k].value)
    }

    pub fn get_mut(&mut self, cursor: Cursor) -> Result<&mut T> {
        self.validate(&cursor)?;
        let k = cursor
            .node
            .ok_or_else(|| self.out_of_range(cursor.position))?;
        Ok(&mut self.nodes[k].value)
    }

    /// Cursor at the first element matching `pred`.
    pub fn position<F>(&self, mut pred: F) -> Option<Cursor>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cursor = self.begin();
        while let Some(at) = cursor.node {
            if pred(&self.nodes[at].value) {
                return Some(cursor);
            }
            cursor = self.step(cursor, at);
        }
        None
    }

    pub fn find<F>(&self, pred: F) -> Option<&T>
    where
        F: FnMut(&&T) -> bool,
    {
        self.iter().find(pred)
    }

    pub fn find_mut<F>(&mut self, pred: F) -> Option<&mut T>
    where
        F: FnMut(&T) -> bool,
    {
        let at = self.position(pred)?.node?;
        Some(&mut self.nodes[at].value)
    }

    /// Unlink and return the first element matching `pred`.
    pub fn remove_first<F>(&mut self, pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let cursor = self.position(pred)?;
        let at = cursor.node?;
        Some(self.unlink(cursor.prev, at))
    }

    /// Insert before `cursor`; at the end cursor this appends. Returns a
    /// cursor at the new element, valid for the new generation.
    pub fn insert(&mut self, cursor: Cursor, value: T) -> Result<Cursor> {
        self.validate(&cursor)?;
        let key = self.nodes.insert(Node {
            value,
            next: cursor.node,
        });
        match cursor.prev {
            Some(p) => self.nodes[p].next = Some(key),
            None => self.head = Some(key),
        }
        if cursor.node.is_none() {
            self.tail = Some(key);
        }
        self.len += 1;
        self.bump();
        Ok(Cursor {
            generation: self.generation,
            node: Some(key),
            ..cursor
        })
    }

    /// Insert every element of `values` before `cursor`, keeping their order.
    /// Returns a cursor at the first inserted element, or `cursor` itself
    /// when `values` is empty.
    pub fn insert_many<I>(&mut self, cursor: Cursor, values: I) -> Result<Cursor>
    where
        I: IntoIterator<Item = T>,
    {
        self.validate(&cursor)?;
        let mut first = None;
        let mut prev = cursor.prev;
        let mut added = 0;
        for value in values {
            let key = self.nodes.insert(Node {
                value,
                next: cursor.node,
            });
            match prev {
                Some(p) => self.nodes[p].next = Some(key),
                None => self.head = Some(key),
            }
            first.get_or_insert(key);
            prev = Some(key);
            added += 1;
        }
        if added == 0 {
            return Ok(cursor);
        }
        if cursor.node.is_none() {
            self.tail = prev;
        }
        self.len += added;
        self.bump();
        Ok(Cursor {
            generation: self.generation,
            node: first,
            ..cursor
        })
    }

    /// Splice out the element at `cursor` and return it.
    pub fn erase(&mut self, cursor: Cursor) -> Result<T> {
        self.validate(&cursor)?;
        if self.is_empty() {
            return Err(Error::EmptyContainer);
        }
        let at = cursor
            .node
            .ok_or_else(|| self.out_of_range(cursor.position))?;
        Ok(self.unlink(cursor.prev, at))
    }

    /// Remove the half-open range `[first, last)`; returns how many
    /// elements were dropped. An empty range leaves the bucket untouched.
    pub fn erase_range(&mut self, first: Cursor, last: Cursor) -> Result<usize> {
        self.validate(&first)?;
        self.validate(&last)?;
        if last.position < first.position {
            return Err(Error::InvalidRange {
                first: first.position,
                last: last.position,
            });
        }
        let count = last.position - first.position;
        if count == 0 {
            return Ok(0);
        }
        let mut removed = 0;
        let mut cur = first.node;
        while let Some(k) = cur.filter(|_| removed < count) {
            cur = self.nodes.remove(k).and_then(|n| n.next);
            removed += 1;
        }
        match first.prev {
            Some(p) => self.nodes[p].next = last.node,
            None => self.head = last.node,
        }
        if last.node.is_none() {
            self.tail = first.prev;
        }
        self.len -= removed;
        self.bump();
        Ok(removed)
    }

    /// In-place link reversal.
    pub fn reverse(&mut self) {
        if self.is_empty() {
            return;
        }
        let mut prev = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            cur = self.nodes[k].next;
            self.nodes[k].next = prev;
            prev = Some(k);
        }
        self.tail = self.head;
        self.head = prev;
        self.bump();
    }

    pub fn sort(&mut self)
    where
        T: Ord,
    {
        self.sort_by(T::cmp);
    }

    /// Insertion sort over the links. Elements are never moved in memory;
    /// equal elements keep their relative order.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if self.len < 2 {
            return;
        }
        let mut sorted: Option<NodeKey> = None;
        let mut rest = self.head;
        while let Some(k) = rest {
            rest = self.nodes[k].next;
            let mut prev = None;
            let mut cur = sorted;
            while let Some(c) = cur {
                if compare(&self.nodes[c].value, &self.nodes[k].value) == Ordering::Greater {
                    break;
                }
                prev = Some(c);
                cur = self.nodes[c].next;
            }
            self.nodes[k].next = cur;
            match prev {
                Some(p) => self.nodes[p].next = Some(k),
                None => sorted = Some(k),
            }
        }
        self.head = sorted;
        let mut tail = sorted;
        while let Some(next) = tail.and_then(|t| self.nodes[t].next) {
            tail = Some(next);
        }
        self.tail = tail;
        self.bump();
    }

    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        self.nodes.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
        self.bump();
    }

    /// Drop every element from position `new_len` onward.
    pub fn truncate(&mut self, new_len: usize) {
        if new_len >= self.len {
            return;
        }
        if new_len == 0 {
            self.clear();
            return;
        }
        let Some(last_kept) = self.node_at(new_len - 1) else {
            return;
        };
        let mut cur = self.nodes[last_kept].next.take();
        while let Some(k) = cur {
            cur = self.nodes.remove(k).and_then(|n| n.next);
        }
        self.tail = Some(last_kept);
        self.len = new_len;
        self.bump();
    }

    /// Truncate to `new_len`, or append values produced by `f` until the
    /// bucket holds `new_len` elements.
    pub fn resize_with<F>(&mut self, new_len: usize, mut f: F)
    where
        F: FnMut() -> T,
    {
        if new_len <= self.len {
            self.truncate(new_len);
        } else {
            for _ in self.len..new_len {
                self.push_back(f());
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            next: self.head,
            remaining: self.len,
        }
    }

    /// Head to tail. Arena order differs from link order, so each node's
    /// position is recorded first and its reference placed in that slot.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let mut positions: SecondaryMap<NodeKey, usize> = SecondaryMap::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(k) = cur {
            positions.insert(k, positions.len());
            cur = self.nodes[k].next;
        }
        let mut slots: Vec<Option<&mut T>> = (0..self.len).map(|_| None).collect();
        for (k, node) in self.nodes.iter_mut() {
            if let Some(&pos) = positions.get(k) {
                slots[pos] = Some(&mut node.value);
            }
        }
        IterMut {
            it: slots.into_iter().flatten(),
            remaining: self.len,
        }
    }
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for Bucket<T> {
    /// The clone is a distinct bucket: cursors from `self` are foreign to it.
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            head: self.head,
            tail: self.tail,
            len: self.len,
            generation: self.generation,
            id: BucketId::fresh(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Bucket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Bucket<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Bucket<T> {}

impl<T> FromIterator<T> for Bucket<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut bucket = Bucket::new();
        bucket.extend(iter);
        bucket
    }
}

impl<T> Extend<T> for Bucket<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

/// Iterator over shared references, head to tail.
pub struct Iter<'a, T> {
    nodes: &'a SlotMap<NodeKey, Node<T>>,
    next: Option<NodeKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        let node = &nodes[self.next?];
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Iterator over mutable references, head to tail.
pub struct IterMut<'a, T> {
    it: core::iter::Flatten<std::vec::IntoIter<Option<&'a mut T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.it.next()?;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

/// Owning iterator; pops from the front.
pub struct IntoIter<T> {
    bucket: Bucket<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;
    fn next(&mut self) -> Option<T> {
        self.bucket.pop_front().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.bucket.len, Some(self.bucket.len))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for Bucket<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;
    fn into_iter(self) -> IntoIter<T> {
        IntoIter { bucket: self }
    }
}

impl<'a, T> IntoIterator for &'a Bucket<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
