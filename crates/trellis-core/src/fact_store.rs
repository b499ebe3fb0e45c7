//! Working-memory fact storage
//!
//! Facts are owned here and addressed by [`FactHandle`]; network memories hold
//! handles only. Handles are issued in strictly increasing order and never reused.

use crate::error::ConsistencyError;
use ahash::AHashMap;
use trellis_types::{Fact, FactHandle};

#[derive(Debug, Default)]
pub struct FactStore {
    facts: AHashMap<FactHandle, Fact>,
    last_issued: u64,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Handle the next plain insert will use
    pub fn next_handle(&self) -> FactHandle {
        FactHandle(self.last_issued + 1)
    }

    /// Store a fact under a caller-chosen handle, which must be greater than every
    /// handle issued so far.
    pub fn insert(&mut self, handle: FactHandle, fact: Fact) -> Result<(), ConsistencyError> {
        if self.facts.contains_key(&handle) {
            return Err(ConsistencyError::DuplicateHandle(handle));
        }
        if handle.id() <= self.last_issued {
            return Err(ConsistencyError::StaleHandle {
                handle,
                last: FactHandle(self.last_issued),
            });
        }
        self.last_issued = handle.id();
        self.facts.insert(handle, fact);
        Ok(())
    }

    pub fn get(&self, handle: FactHandle) -> Option<&Fact> {
        self.facts.get(&handle)
    }

    pub fn contains(&self, handle: FactHandle) -> bool {
        self.facts.contains_key(&handle)
    }

    /// Swap in a new version of a fact, returning the old one
    pub fn replace(&mut self, handle: FactHandle, fact: Fact) -> Result<Fact, ConsistencyError> {
        match self.facts.get_mut(&handle) {
            Some(slot) => Ok(std::mem::replace(slot, fact)),
            None => Err(ConsistencyError::UnknownHandle(handle)),
        }
    }

    pub fn remove(&mut self, handle: FactHandle) -> Result<Fact, ConsistencyError> {
        self.facts.remove(&handle).ok_or(ConsistencyError::UnknownHandle(handle))
    }

    /// Live handles in insertion order
    pub fn handles(&self) -> Vec<FactHandle> {
        let mut handles: Vec<FactHandle> = self.facts.keys().copied().collect();
        handles.sort_unstable();
        handles
    }
}
