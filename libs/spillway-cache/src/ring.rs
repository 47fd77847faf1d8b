//! Fixed-capacity recency queue.

use std::iter::FusedIterator;

use crate::error::{Error, Result};

/// A fixed-capacity circular buffer.
///
/// Plays three roles for the local cache tier: a recency queue (enqueueing
/// into a full buffer overwrites the oldest element and hands it back), an
/// indexed sequence (`get`, `insert`, `remove_at`), and a resizable queue
/// whose resize keeps the oldest `min(count, capacity)` elements.
///
/// A zero-capacity buffer is permitted; every operation that needs a slot
/// fails with [`Error::ZeroCapacity`] instead of dividing by zero.
#[derive(Debug)]
pub struct CircularBuffer<T> {
    slots: Box<[Option<T>]>,
    tail: usize,
    count: usize,
}

impl<T> CircularBuffer<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: empty_slots(capacity),
            tail: 0,
            count: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count == self.capacity()
    }

    /// Appends an element at the most-recent end. When the buffer is full the
    /// oldest element is overwritten and returned; otherwise `None`.
    pub fn enqueue(&mut self, item: T) -> Result<Option<T>> {
        if self.capacity() == 0 {
            return Err(Error::ZeroCapacity);
        }
        let slot = (self.tail + self.count) % self.capacity();
        if self.is_full() {
            let displaced = self.slots[slot].replace(item);
            self.tail = (self.tail + 1) % self.capacity();
            Ok(displaced)
        } else {
            self.slots[slot] = Some(item);
            self.count += 1;
            Ok(None)
        }
    }

    /// Removes and returns the oldest element.
    pub fn dequeue(&mut self) -> Result<T> {
        if self.is_empty() {
            return Err(Error::Empty);
        }
        let item = self.slots[self.tail]
            .take()
            .expect("slot inside the live region must be occupied");
        self.tail = (self.tail + 1) % self.capacity();
        self.count -= 1;
        Ok(item)
    }

    /// Element at logical index `index`, where 0 is the oldest.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.count {
            return None;
        }
        self.slots[self.physical(index)].as_ref()
    }

    /// Inserts at logical index `index`, shifting newer elements up; the
    /// displaced last element is re-enqueued through [`enqueue`](Self::enqueue).
    ///
    /// On a full buffer that re-enqueue overwrites the *front* element and
    /// returns it; this is the historical contract of this container, kept on
    /// purpose. Callers that cannot tolerate losing the oldest element must
    /// not insert into a full buffer.
    pub fn insert(&mut self, index: usize, item: T) -> Result<Option<T>> {
        if index > self.count {
            return Err(Error::OutOfRange {
                index,
                len: self.count,
            });
        }
        if index == self.count {
            return self.enqueue(item);
        }

        let last_slot = self.physical(self.count - 1);
        let last = self.slots[last_slot]
            .take()
            .expect("slot inside the live region must be occupied");
        for logical in (index..self.count - 1).rev() {
            let from = self.physical(logical);
            let to = self.physical(logical + 1);
            self.slots[to] = self.slots[from].take();
        }
        self.slots[self.physical(index)] = Some(item);
        self.enqueue(last)
    }

    /// Removes and returns the element at logical index `index`, shifting
    /// older elements towards it.
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        if index >= self.count {
            return Err(Error::OutOfRange {
                index,
                len: self.count,
            });
        }
        let removed = self.slots[self.physical(index)]
            .take()
            .expect("slot inside the live region must be occupied");
        for logical in (0..index).rev() {
            let from = self.physical(logical);
            let to = self.physical(logical + 1);
            self.slots[to] = self.slots[from].take();
        }
        self.tail = (self.tail + 1) % self.capacity();
        self.count -= 1;
        Ok(removed)
    }

    /// Replaces the backing storage with one of the given capacity, keeping
    /// the oldest `min(len, capacity)` elements in order.
    pub fn set_capacity(&mut self, capacity: usize) {
        let mut slots = empty_slots(capacity);
        let keep = self.count.min(capacity);
        for slot in slots.iter_mut().take(keep) {
            *slot = Some(
                self.dequeue()
                    .expect("kept element must still be queued during resize"),
            );
        }
        self.slots = slots;
        self.tail = 0;
        self.count = keep;
    }

    /// Drops every element. Slots are overwritten, not merely unindexed, so
    /// large payloads are reclaimed immediately.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.tail = 0;
        self.count = 0;
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            index: 0,
        }
    }

    fn physical(&self, index: usize) -> usize {
        (self.tail + index) % self.capacity()
    }
}

fn empty_slots<T>(capacity: usize) -> Box<[Option<T>]> {
    (0..capacity).map(|_| None).collect()
}

/// Iterator over a [`CircularBuffer`], oldest first.
#[derive(Debug)]
pub struct Iter<'a, T> {
    ring: &'a CircularBuffer<T>,
    index: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.ring.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ring.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a CircularBuffer<T> {
    type IntoIter = Iter<'a, T>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
