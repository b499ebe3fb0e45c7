//! Tuple arena
//!
//! A tuple is a partial match over the first N patterns of a rule. It is stored as
//! its rightmost fact handle plus a link to the parent tuple holding the first N-1
//! handles, so extending a match never copies the prefix.
//!
//! ```text
//!   [o1] ─┬─ [o1,c1] ─── [o1,c1,p1]        parent/child links (left lineage)
//!         └─ [o1,c2]
//!
//!   right entry c1 @ join#2 ──> [o1,c1] ──> [o2,c1]   right sibling links
//! ```
//!
//! Every tuple sits in two intrusive doubly linked sibling lists: the children of its
//! parent, and the children of the right-memory entry that produced it. Either list
//! can be walked to delete a whole subtree without searching any memory, and a tuple
//! unlinks from both in O(1).

use crate::memory::MemoryLocation;
use crate::rete_network::NodeId;
use serde::Serialize;
use std::fmt;
use trellis_types::FactHandle;

/// Generational index into a [`TupleArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TupleId {
    index: u32,
    generation: u32,
}

impl fmt::Display for TupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}v{}", self.index, self.generation)
    }
}

/// One partial match
#[derive(Debug, Clone)]
pub struct Tuple {
    handle: FactHandle,
    parent: Option<TupleId>,
    size: usize,
    /// Node whose memory holds this tuple (next join, or terminal)
    sink: NodeId,
    /// Position inside the sink's memory, once stored
    location: Option<MemoryLocation>,
    /// Join node whose right-memory entry for `handle` created this tuple
    origin: Option<NodeId>,
    first_child: Option<TupleId>,
    prev_sibling: Option<TupleId>,
    next_sibling: Option<TupleId>,
    prev_right: Option<TupleId>,
    next_right: Option<TupleId>,
}

impl Tuple {
    /// Rightmost fact handle
    pub fn handle(&self) -> FactHandle {
        self.handle
    }

    /// Number of facts in this partial match
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    pub fn location(&self) -> Option<&MemoryLocation> {
        self.location.as_ref()
    }
}

#[derive(Debug)]
struct ArenaSlot {
    generation: u32,
    tuple: Option<Tuple>,
}

/// Owner of every live tuple of one working memory
#[derive(Debug, Default)]
pub struct TupleArena {
    slots: Vec<ArenaSlot>,
    free: Vec<u32>,
    live: usize,
}

impl TupleArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live tuples
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, id: TupleId) -> Option<&Tuple> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.tuple.as_ref()
    }

    fn get_mut(&mut self, id: TupleId) -> Option<&mut Tuple> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.tuple.as_mut()
    }

    pub fn contains(&self, id: TupleId) -> bool {
        self.get(id).is_some()
    }

    /// Create a tuple extending `parent` with `handle` and link it under the parent
    pub fn alloc(
        &mut self,
        handle: FactHandle,
        parent: Option<TupleId>,
        sink: NodeId,
        origin: Option<NodeId>,
    ) -> TupleId {
        let size = parent.and_then(|p| self.get(p)).map_or(1, |p| p.size + 1);
        let next_sibling = parent.and_then(|p| self.get(p)).and_then(|p| p.first_child);
        let tuple = Tuple {
            handle,
            parent,
            size,
            sink,
            location: None,
            origin,
            first_child: None,
            prev_sibling: None,
            next_sibling,
            prev_right: None,
            next_right: None,
        };

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.tuple = Some(tuple);
                TupleId { index, generation: slot.generation }
            }
            None => {
                self.slots.push(ArenaSlot { generation: 0, tuple: Some(tuple) });
                TupleId { index: (self.slots.len() - 1) as u32, generation: 0 }
            }
        };
        self.live += 1;

        if let Some(next) = next_sibling {
            if let Some(sibling) = self.get_mut(next) {
                sibling.prev_sibling = Some(id);
            }
        }
        if let Some(parent) = parent.and_then(|p| self.get_mut(p)) {
            parent.first_child = Some(id);
        }
        id
    }

    pub fn set_location(&mut self, id: TupleId, location: MemoryLocation) {
        if let Some(tuple) = self.get_mut(id) {
            tuple.location = Some(location);
        }
    }

    /// Push `child` on the front of a right-entry child list
    pub fn link_right(&mut self, head: &mut Option<TupleId>, child: TupleId) {
        let old_head = *head;
        if let Some(tuple) = self.get_mut(child) {
            tuple.prev_right = None;
            tuple.next_right = old_head;
        }
        if let Some(old) = old_head.and_then(|h| self.get_mut(h)) {
            old.prev_right = Some(child);
        }
        *head = Some(child);
    }

    /// Remove `child` from a right-entry child list
    pub fn unlink_right(&mut self, head: &mut Option<TupleId>, child: TupleId) {
        let Some((prev, next)) = self.get_mut(child).map(|t| {
            let links = (t.prev_right, t.next_right);
            t.prev_right = None;
            t.next_right = None;
            links
        }) else {
            return;
        };
        match prev {
            Some(prev) => {
                if let Some(tuple) = self.get_mut(prev) {
                    tuple.next_right = next;
                }
            }
            None => {
                if *head == Some(child) {
                    *head = next;
                }
            }
        }
        if let Some(tuple) = next.and_then(|n| self.get_mut(n)) {
            tuple.prev_right = prev;
        }
    }

    /// Direct children of a tuple, newest first
    pub fn children(&self, id: TupleId) -> Vec<TupleId> {
        let mut children = Vec::new();
        let mut cursor = self.get(id).and_then(|t| t.first_child);
        while let Some(child) = cursor {
            children.push(child);
            cursor = self.get(child).and_then(|t| t.next_sibling);
        }
        children
    }

    /// Members of a right-entry child list, starting at `head`
    pub fn right_children(&self, head: Option<TupleId>) -> Vec<TupleId> {
        let mut children = Vec::new();
        let mut cursor = head;
        while let Some(child) = cursor {
            children.push(child);
            cursor = self.get(child).and_then(|t| t.next_right);
        }
        children
    }

    /// Fact handles of a tuple in pattern order
    pub fn handles(&self, id: TupleId) -> Vec<FactHandle> {
        let mut handles = Vec::with_capacity(self.get(id).map_or(0, |t| t.size));
        let mut cursor = Some(id);
        while let Some(current) = cursor.and_then(|c| self.get(c)) {
            handles.push(current.handle);
            cursor = current.parent;
        }
        handles.reverse();
        handles
    }

    /// Unlink a tuple from its parent's child list and free its slot. The caller must
    /// already have unlinked it from its right-entry list and removed it from memory.
    pub fn release(&mut self, id: TupleId) -> Option<Tuple> {
        let (parent, prev, next) = {
            let tuple = self.get(id)?;
            (tuple.parent, tuple.prev_sibling, tuple.next_sibling)
        };
        match prev {
            Some(prev) => {
                if let Some(tuple) = self.get_mut(prev) {
                    tuple.next_sibling = next;
                }
            }
            None => {
                if let Some(tuple) = parent.and_then(|p| self.get_mut(p)) {
                    if tuple.first_child == Some(id) {
                        tuple.first_child = next;
                    }
                }
            }
        }
        if let Some(tuple) = next.and_then(|n| self.get_mut(n)) {
            tuple.prev_sibling = prev;
        }

        let slot = &mut self.slots[id.index as usize];
        let tuple = slot.tuple.take();
        self.free.push(id.index);
        self.live -= 1;
        tuple
    }
}
