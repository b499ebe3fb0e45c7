//! Tuple and fact memories of join nodes
//!
//! ```text
//!                 BetaMemory
//!         ┌───────────┴────────────┐
//!   left: TupleMemory<TupleId>   right: TupleMemory<FactHandle>
//!         │                        │
//!   Hashed ── key -> TupleList     Hashed ── key -> TupleList     (both indexed)
//!   Linear ── TupleList            Linear ── TupleList            (neither indexed)
//! ```
//!
//! Every stored item gets a [`MemoryLocation`] recording the key it was filed under.
//! Removal always goes through that location, so a fact whose field values changed
//! since insertion is still found in the right bucket.

mod hashed;
mod index;
mod tuple_list;

pub use hashed::HashedTupleMemory;
pub use index::{CompositeIndex, FieldIndex, IndexKey};
pub use tuple_list::{EntryRef, TupleList};

use crate::tuple::TupleId;
use trellis_types::FactHandle;

/// Where an item was stored: the bucket key (hashed memories only) and the list entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLocation {
    key: Option<IndexKey>,
    entry: EntryRef,
}

impl MemoryLocation {
    pub fn key(&self) -> Option<&IndexKey> {
        self.key.as_ref()
    }
}

/// Storage strategy of one side of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum MemoryKind {
    Linear,
    Hashed,
}

/// One side of a join node's memory
#[derive(Debug)]
pub enum TupleMemory<T> {
    Linear(TupleList<T>),
    Hashed(HashedTupleMemory<T>),
}

impl<T: Copy> TupleMemory<T> {
    pub fn linear() -> Self {
        TupleMemory::Linear(TupleList::new())
    }

    pub fn hashed() -> Self {
        TupleMemory::Hashed(HashedTupleMemory::new())
    }

    pub fn kind(&self) -> MemoryKind {
        match self {
            TupleMemory::Linear(_) => MemoryKind::Linear,
            TupleMemory::Hashed(_) => MemoryKind::Hashed,
        }
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self, TupleMemory::Hashed(_))
    }

    pub fn len(&self) -> usize {
        match self {
            TupleMemory::Linear(list) => list.len(),
            TupleMemory::Hashed(memory) => memory.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct keys; a linear memory counts as one bucket when non-empty
    pub fn bucket_count(&self) -> usize {
        match self {
            TupleMemory::Linear(list) => usize::from(!list.is_empty()),
            TupleMemory::Hashed(memory) => memory.bucket_count(),
        }
    }

    /// Store an item. Hashed memories require a key and store nothing without one,
    /// returning `None`; linear memories ignore the key.
    pub fn add(&mut self, key: Option<IndexKey>, item: T) -> Option<MemoryLocation> {
        match (self, key) {
            (TupleMemory::Hashed(memory), Some(key)) => {
                let entry = memory.add(key.clone(), item);
                Some(MemoryLocation { key: Some(key), entry })
            }
            (TupleMemory::Hashed(_), None) => None,
            (TupleMemory::Linear(list), _) => {
                Some(MemoryLocation { key: None, entry: list.add(item) })
            }
        }
    }

    /// Remove by recorded location. Unknown or stale locations are a no-op returning `None`.
    pub fn remove(&mut self, location: &MemoryLocation) -> Option<T> {
        match (self, &location.key) {
            (TupleMemory::Hashed(memory), Some(key)) => memory.remove(key, location.entry),
            (TupleMemory::Linear(list), None) => list.remove(location.entry),
            _ => None,
        }
    }

    /// Candidates for a probe: the key's bucket when hashed, every item when linear.
    /// Collected so the caller can mutate other memories while walking them.
    pub fn iterate_matches(&self, key: Option<&IndexKey>) -> Vec<T> {
        match (self, key) {
            (TupleMemory::Hashed(memory), Some(key)) => memory.iterate_matches(key).copied().collect(),
            (TupleMemory::Hashed(_), None) => Vec::new(),
            (TupleMemory::Linear(list), _) => list.iter().copied().collect(),
        }
    }

    /// Every stored item
    pub fn items(&self) -> Vec<T> {
        match self {
            TupleMemory::Linear(list) => list.iter().copied().collect(),
            TupleMemory::Hashed(memory) => memory.iter().copied().collect(),
        }
    }
}

/// The left tuple memory and right fact memory of one join node
#[derive(Debug)]
pub struct BetaMemory {
    left: TupleMemory<TupleId>,
    right: TupleMemory<FactHandle>,
}

impl BetaMemory {
    /// Both sides hashed or both linear; there is no constructor for a mixed pair.
    pub fn new(kind: MemoryKind) -> Self {
        match kind {
            MemoryKind::Linear => Self { left: TupleMemory::linear(), right: TupleMemory::linear() },
            MemoryKind::Hashed => Self { left: TupleMemory::hashed(), right: TupleMemory::hashed() },
        }
    }

    pub fn kind(&self) -> MemoryKind {
        self.left.kind()
    }

    pub fn left(&self) -> &TupleMemory<TupleId> {
        &self.left
    }

    pub fn right(&self) -> &TupleMemory<FactHandle> {
        &self.right
    }

    pub fn left_mut(&mut self) -> &mut TupleMemory<TupleId> {
        &mut self.left
    }

    pub fn right_mut(&mut self) -> &mut TupleMemory<FactHandle> {
        &mut self.right
    }
}
