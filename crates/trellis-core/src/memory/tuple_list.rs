//! Slab-backed doubly linked list with O(1) append and O(1) removal by reference.
//!
//! Used directly as the unindexed memory of a join node and as the bucket type of the
//! hashed memory. Entry references carry a generation so a reference to a removed
//! entry can never remove the item that later reuses its slot.

use std::fmt;

/// Stable reference to one entry of a [`TupleList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    slot: u32,
    generation: u32,
}

#[derive(Debug)]
struct Entry<T> {
    item: T,
    prev: Option<u32>,
    next: Option<u32>,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    entry: Option<Entry<T>>,
}

pub struct TupleList<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T> Default for TupleList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TupleList<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), head: None, tail: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an item at the tail
    pub fn add(&mut self, item: T) -> EntryRef {
        let entry = Entry { item, prev: self.tail, next: None };
        let slot = match self.free.pop() {
            Some(slot) => {
                let reused = &mut self.slots[slot as usize];
                reused.generation = reused.generation.wrapping_add(1);
                reused.entry = Some(entry);
                slot
            }
            None => {
                self.slots.push(Slot { generation: 0, entry: Some(entry) });
                (self.slots.len() - 1) as u32
            }
        };

        match self.tail {
            Some(tail) => {
                if let Some(tail_entry) = self.slots[tail as usize].entry.as_mut() {
                    tail_entry.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;

        EntryRef { slot, generation: self.slots[slot as usize].generation }
    }

    /// Unlink and return the referenced item; `None` if the reference is stale
    pub fn remove(&mut self, entry: EntryRef) -> Option<T> {
        let slot = self.slots.get_mut(entry.slot as usize)?;
        if slot.generation != entry.generation {
            return None;
        }
        let removed = slot.entry.take()?;

        match removed.prev {
            Some(prev) => {
                if let Some(prev_entry) = self.slots[prev as usize].entry.as_mut() {
                    prev_entry.next = removed.next;
                }
            }
            None => self.head = removed.next,
        }
        match removed.next {
            Some(next) => {
                if let Some(next_entry) = self.slots[next as usize].entry.as_mut() {
                    next_entry.prev = removed.prev;
                }
            }
            None => self.tail = removed.prev,
        }

        self.free.push(entry.slot);
        self.len -= 1;
        Some(removed.item)
    }

    pub fn get(&self, entry: EntryRef) -> Option<&T> {
        let slot = self.slots.get(entry.slot as usize)?;
        if slot.generation != entry.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| &e.item)
    }

    /// Iterate from head to tail
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { list: self, cursor: self.head, remaining: self.len }
    }
}

impl<T: fmt::Debug> fmt::Debug for TupleList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    list: &'a TupleList<T>,
    cursor: Option<u32>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let entry = self.list.slots[slot as usize].entry.as_ref()?;
        self.cursor = entry.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&entry.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a TupleList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
