//! Beta network propagation
//!
//! This module owns the per-session memories of the network and the depth-first
//! propagation protocol that keeps them consistent:
//!
//! ```text
//!   right insert (fact f at join J)          left insert (tuple t at join J)
//!   ───────────────────────────────          ───────────────────────────────
//!   key = J.right_key(f)                     key = J.left_key(t)
//!   probe left memory bucket(key)            probe right memory bucket(key)
//!   filter candidates                        filter candidates
//!   ── commit ──                             ── commit ──
//!   store f in right memory under key        store t in left memory under key
//!   for each match t: child(t, f)            for each match f: child(t, f)
//!       -> left insert at J.sink                 -> left insert at J.sink
//! ```
//!
//! Before a fact enters an entry node, every field the entry's joins will read from it
//! is checked, so a malformed fact is turned away before the entry commits anything
//! and memories never hold a fact a later probe cannot read. Within a join, probing
//! happens before anything is stored; if a cascade still fails, children created
//! before the failure keep their effects and the child being inserted is unlinked.
//!
//! Deletion never evaluates a constraint: memories are updated through the location
//! recorded at insertion, and descendant tuples are found through the arena's
//! parent/child and right-entry links.

use crate::accessor::FactRef;
use crate::activation::{Activation, ActivationEvent};
use crate::error::{ConsistencyError, PropagationError, TrellisError, TrellisResult};
use crate::fact_store::FactStore;
use crate::memory::{BetaMemory, MemoryLocation, TupleMemory};
use crate::rete_network::{JoinNode, Node, NodeId, ReteNetwork, TerminalNode};
use crate::tuple::{TupleArena, TupleId};
use ahash::AHashMap;
use serde::Serialize;
use std::ops::AddAssign;
use tracing::{trace, warn};
use trellis_types::{Fact, FactHandle};

/// Memory mutation counters of one node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeCounters {
    pub left_adds: u64,
    pub left_removes: u64,
    pub right_adds: u64,
    pub right_removes: u64,
}

impl NodeCounters {
    /// Total number of memory mutations
    pub fn mutations(&self) -> u64 {
        self.left_adds + self.left_removes + self.right_adds + self.right_removes
    }
}

impl AddAssign for NodeCounters {
    fn add_assign(&mut self, other: Self) {
        self.left_adds += other.left_adds;
        self.left_removes += other.left_removes;
        self.right_adds += other.right_adds;
        self.right_removes += other.right_removes;
    }
}

/// Right-memory entry of a fact at a join node
#[derive(Debug)]
pub(crate) struct RightEntry {
    location: MemoryLocation,
    /// Head of the list of tuples created from this entry
    first_child: Option<TupleId>,
}

#[derive(Debug)]
pub(crate) struct AdapterMemory {
    roots: AHashMap<FactHandle, TupleId>,
    counters: NodeCounters,
}

#[derive(Debug)]
pub(crate) struct JoinMemory {
    beta: BetaMemory,
    right_entries: AHashMap<FactHandle, RightEntry>,
    counters: NodeCounters,
}

#[derive(Debug)]
pub(crate) struct TerminalMemory {
    tuples: TupleMemory<TupleId>,
    counters: NodeCounters,
}

/// Session memory of one node, parallel to [`Node`]
#[derive(Debug)]
pub(crate) enum NodeMemory {
    Stateless,
    Adapter(AdapterMemory),
    Join(JoinMemory),
    Terminal(TerminalMemory),
}

impl NodeMemory {
    fn for_node(node: &Node) -> Self {
        match node {
            Node::ObjectType(_) | Node::Alpha(_) => NodeMemory::Stateless,
            Node::LeftInputAdapter(_) => NodeMemory::Adapter(AdapterMemory {
                roots: AHashMap::new(),
                counters: NodeCounters::default(),
            }),
            Node::Join(join) => NodeMemory::Join(JoinMemory {
                beta: join.constraints().create_memory(),
                right_entries: AHashMap::new(),
                counters: NodeCounters::default(),
            }),
            Node::Terminal(_) => NodeMemory::Terminal(TerminalMemory {
                tuples: TupleMemory::linear(),
                counters: NodeCounters::default(),
            }),
        }
    }

    pub(crate) fn counters(&self) -> NodeCounters {
        match self {
            NodeMemory::Stateless => NodeCounters::default(),
            NodeMemory::Adapter(memory) => memory.counters,
            NodeMemory::Join(memory) => memory.counters,
            NodeMemory::Terminal(memory) => memory.counters,
        }
    }

    /// Tuples held on the left side (terminal matches for terminal nodes)
    pub(crate) fn left_count(&self) -> usize {
        match self {
            NodeMemory::Stateless => 0,
            NodeMemory::Adapter(memory) => memory.roots.len(),
            NodeMemory::Join(memory) => memory.beta.left().len(),
            NodeMemory::Terminal(memory) => memory.tuples.len(),
        }
    }

    /// Facts held in the right memory of a join
    pub(crate) fn right_count(&self) -> usize {
        match self {
            NodeMemory::Join(memory) => memory.beta.right().len(),
            _ => 0,
        }
    }

    pub(crate) fn beta_memory(&self) -> Option<&BetaMemory> {
        match self {
            NodeMemory::Join(memory) => Some(&memory.beta),
            _ => None,
        }
    }

    /// Tuples currently stored at a terminal node
    pub(crate) fn terminal_tuples(&self) -> Vec<TupleId> {
        match self {
            NodeMemory::Terminal(memory) => memory.tuples.items(),
            _ => Vec::new(),
        }
    }

    fn holds(&self, handle: FactHandle) -> bool {
        match self {
            NodeMemory::Adapter(memory) => memory.roots.contains_key(&handle),
            NodeMemory::Join(memory) => memory.right_entries.contains_key(&handle),
            _ => false,
        }
    }
}

/// All mutable network state of one working memory
#[derive(Debug)]
pub(crate) struct NetworkState {
    pub(crate) arena: TupleArena,
    pub(crate) memories: Vec<NodeMemory>,
}

impl NetworkState {
    pub(crate) fn new(network: &ReteNetwork) -> Self {
        Self {
            arena: TupleArena::new(),
            memories: network.nodes().map(|(_, node)| NodeMemory::for_node(node)).collect(),
        }
    }

    pub(crate) fn memory(&self, node: NodeId) -> Option<&NodeMemory> {
        self.memories.get(node.index())
    }

    /// Whether the entry node currently holds the fact
    pub(crate) fn holds(&self, entry: NodeId, handle: FactHandle) -> bool {
        self.memory(entry).is_some_and(|memory| memory.holds(handle))
    }
}

/// Tuple bookkeeping of one working memory, surfaced through its statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TupleCounters {
    pub tuples_created: u64,
    pub tuples_deleted: u64,
    pub activations: u64,
    pub deactivations: u64,
}

/// Drives one top-level event through the network
pub(crate) struct Propagator<'a> {
    network: &'a ReteNetwork,
    facts: &'a FactStore,
    state: &'a mut NetworkState,
    events: &'a mut Vec<ActivationEvent>,
    counters: &'a mut TupleCounters,
    /// Fact of the event being propagated, reported with any failure
    trigger: FactHandle,
}

impl<'a> Propagator<'a> {
    pub(crate) fn new(
        network: &'a ReteNetwork,
        facts: &'a FactStore,
        state: &'a mut NetworkState,
        events: &'a mut Vec<ActivationEvent>,
        counters: &'a mut TupleCounters,
        trigger: FactHandle,
    ) -> Self {
        Self { network, facts, state, events, counters, trigger }
    }

    fn fact(&self, handle: FactHandle) -> TrellisResult<&'a Fact> {
        self.facts.get(handle).ok_or_else(|| ConsistencyError::UnknownHandle(handle).into())
    }

    fn tuple_facts(&self, tuple: TupleId) -> TrellisResult<Vec<FactRef<'a>>> {
        self.state
            .arena
            .handles(tuple)
            .into_iter()
            .map(|handle| Ok(FactRef { handle, fact: self.fact(handle)? }))
            .collect()
    }

    fn failure(&self, node: NodeId, source: PropagationError) -> TrellisError {
        TrellisError::Propagation { handle: self.trigger, node, source }
    }

    fn join_memory(&mut self, node: NodeId) -> TrellisResult<&mut JoinMemory> {
        match self.state.memories.get_mut(node.index()) {
            Some(NodeMemory::Join(memory)) => Ok(memory),
            _ => Err(ConsistencyError::MissingMemoryEntry { node, handle: self.trigger }.into()),
        }
    }

    // ------------------------------------------------------------------------
    // Assertion
    // ------------------------------------------------------------------------

    /// Bring a fact that passed the alpha network into an entry node
    pub(crate) fn assert_fact(&mut self, entry: NodeId, handle: FactHandle) -> TrellisResult<()> {
        let fact = self.fact(handle)?;
        self.network.check_entry(entry, fact).map_err(|(node, err)| self.failure(node, err))?;
        match self.network.node(entry) {
            Some(Node::LeftInputAdapter(adapter)) => {
                self.assert_root(entry, adapter.sink(), handle)
            }
            Some(Node::Join(join)) => self.right_insert(entry, join, handle),
            _ => Ok(()),
        }
    }

    fn assert_root(
        &mut self,
        entry: NodeId,
        sink: NodeId,
        handle: FactHandle,
    ) -> TrellisResult<()> {
        let NetworkState { arena, memories } = &mut *self.state;
        let Some(NodeMemory::Adapter(adapter)) = memories.get_mut(entry.index()) else {
            return Err(ConsistencyError::MissingMemoryEntry { node: entry, handle }.into());
        };
        if adapter.roots.contains_key(&handle) {
            return Err(ConsistencyError::DuplicateHandle(handle).into());
        }
        let root = arena.alloc(handle, None, sink, None);
        adapter.roots.insert(handle, root);
        adapter.counters.left_adds += 1;
        self.counters.tuples_created += 1;

        if let Err(err) = self.left_insert(sink, root) {
            self.delete_tuple(root);
            if let Some(NodeMemory::Adapter(adapter)) = self.state.memories.get_mut(entry.index()) {
                adapter.roots.remove(&handle);
                adapter.counters.left_removes += 1;
            }
            return Err(err);
        }
        Ok(())
    }

    fn right_insert(
        &mut self,
        node: NodeId,
        join: &'a JoinNode,
        handle: FactHandle,
    ) -> TrellisResult<()> {
        let fact = self.fact(handle)?;
        let constraints = join.constraints();

        // Probe
        let key = constraints.right_key(fact).map_err(|err| self.failure(node, err))?;
        let memory = self.join_memory(node)?;
        if memory.right_entries.contains_key(&handle) {
            return Err(ConsistencyError::DuplicateHandle(handle).into());
        }
        let candidates = memory.beta.left().iterate_matches(key.as_ref());
        let mut matches = Vec::new();
        for tuple in candidates {
            let left = self.tuple_facts(tuple)?;
            if constraints.is_allowed(&left, fact).map_err(|err| self.failure(node, err))? {
                matches.push(tuple);
            }
        }
        trace!(node = %node, fact = %handle, matches = matches.len(), "right insert");

        // Commit
        let memory = self.join_memory(node)?;
        let location = memory
            .beta
            .right_mut()
            .add(key, handle)
            .ok_or(ConsistencyError::MissingIndexKey { node, handle })?;
        memory.right_entries.insert(handle, RightEntry { location, first_child: None });
        memory.counters.right_adds += 1;
        for tuple in matches {
            self.extend(tuple, handle, node, join.sink())?;
        }
        Ok(())
    }

    fn left_insert(&mut self, node: NodeId, tuple: TupleId) -> TrellisResult<()> {
        match self.network.node(node) {
            Some(Node::Join(join)) => self.join_left_insert(node, join, tuple),
            Some(Node::Terminal(terminal)) => self.terminal_insert(node, terminal, tuple),
            _ => Ok(()),
        }
    }

    fn join_left_insert(
        &mut self,
        node: NodeId,
        join: &'a JoinNode,
        tuple: TupleId,
    ) -> TrellisResult<()> {
        let constraints = join.constraints();
        let trigger = self.trigger;
        let left = self.tuple_facts(tuple)?;

        // Probe
        let key = constraints.left_key(&left).map_err(|err| self.failure(node, err))?;
        let candidates = self.join_memory(node)?.beta.right().iterate_matches(key.as_ref());
        let mut matches = Vec::new();
        for handle in candidates {
            let fact = self.fact(handle)?;
            if constraints.is_allowed(&left, fact).map_err(|err| self.failure(node, err))? {
                matches.push(handle);
            }
        }
        trace!(node = %node, tuple = %tuple, matches = matches.len(), "left insert");

        // Commit
        let memory = self.join_memory(node)?;
        let location = memory
            .beta
            .left_mut()
            .add(key, tuple)
            .ok_or(ConsistencyError::MissingIndexKey { node, handle: trigger })?;
        memory.counters.left_adds += 1;
        self.state.arena.set_location(tuple, location);
        for handle in matches {
            self.extend(tuple, handle, node, join.sink())?;
        }
        Ok(())
    }

    fn terminal_insert(
        &mut self,
        node: NodeId,
        terminal: &TerminalNode,
        tuple: TupleId,
    ) -> TrellisResult<()> {
        let handle = self.trigger;
        let NetworkState { arena, memories } = &mut *self.state;
        let Some(NodeMemory::Terminal(memory)) = memories.get_mut(node.index()) else {
            return Err(ConsistencyError::MissingMemoryEntry { node, handle }.into());
        };
        let location = memory
            .tuples
            .add(None, tuple)
            .ok_or(ConsistencyError::MissingIndexKey { node, handle })?;
        memory.counters.left_adds += 1;
        arena.set_location(tuple, location);
        self.counters.activations += 1;
        self.events.push(ActivationEvent::Activated(Activation {
            rule: terminal.rule(),
            rule_name: terminal.rule_name().to_string(),
            tuple,
            facts: arena.handles(tuple),
        }));
        Ok(())
    }

    /// Create the child of `parent` joined with the right fact `handle` at `join`
    fn extend(
        &mut self,
        parent: TupleId,
        handle: FactHandle,
        join: NodeId,
        sink: NodeId,
    ) -> TrellisResult<()> {
        let NetworkState { arena, memories } = &mut *self.state;
        let child = arena.alloc(handle, Some(parent), sink, Some(join));
        if let Some(NodeMemory::Join(memory)) = memories.get_mut(join.index()) {
            if let Some(entry) = memory.right_entries.get_mut(&handle) {
                arena.link_right(&mut entry.first_child, child);
            }
        }
        self.counters.tuples_created += 1;

        if let Err(err) = self.left_insert(sink, child) {
            self.delete_tuple(child);
            return Err(err);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Retraction
    // ------------------------------------------------------------------------

    /// Remove a fact from an entry node together with every tuple derived from it there
    pub(crate) fn retract_fact(&mut self, entry: NodeId, handle: FactHandle) -> TrellisResult<()> {
        match self.state.memories.get_mut(entry.index()) {
            Some(NodeMemory::Adapter(adapter)) => {
                let Some(root) = adapter.roots.remove(&handle) else {
                    return Err(ConsistencyError::MissingMemoryEntry { node: entry, handle }.into());
                };
                adapter.counters.left_removes += 1;
                self.delete_tuple(root);
                Ok(())
            }
            Some(NodeMemory::Join(memory)) => {
                let Some(right_entry) = memory.right_entries.remove(&handle) else {
                    return Err(ConsistencyError::MissingMemoryEntry { node: entry, handle }.into());
                };
                if memory.beta.right_mut().remove(&right_entry.location).is_none() {
                    warn!(node = %entry, fact = %handle, "Right memory entry was already gone");
                }
                memory.counters.right_removes += 1;
                for child in self.state.arena.right_children(right_entry.first_child) {
                    self.delete_tuple(child);
                }
                Ok(())
            }
            _ => Err(ConsistencyError::MissingMemoryEntry { node: entry, handle }.into()),
        }
    }

    /// Delete a tuple and all of its descendants, withdrawing activations
    fn delete_tuple(&mut self, tuple: TupleId) {
        for child in self.state.arena.children(tuple) {
            self.delete_tuple(child);
        }

        let NetworkState { arena, memories } = &mut *self.state;
        let Some(record) = arena.get(tuple) else {
            return;
        };
        let (handle, sink, origin, location) =
            (record.handle(), record.sink(), record.origin(), record.location().cloned());

        match (memories.get_mut(sink.index()), location) {
            (Some(NodeMemory::Join(memory)), Some(location)) => {
                if memory.beta.left_mut().remove(&location).is_some() {
                    memory.counters.left_removes += 1;
                }
            }
            (Some(NodeMemory::Terminal(memory)), Some(location)) => {
                if memory.tuples.remove(&location).is_some() {
                    memory.counters.left_removes += 1;
                    self.counters.deactivations += 1;
                    if let Some(Node::Terminal(terminal)) = self.network.node(sink) {
                        self.events.push(ActivationEvent::Deactivated(Activation {
                            rule: terminal.rule(),
                            rule_name: terminal.rule_name().to_string(),
                            tuple,
                            facts: arena.handles(tuple),
                        }));
                    }
                }
            }
            _ => {}
        }

        if let Some(origin) = origin {
            if let Some(NodeMemory::Join(memory)) = memories.get_mut(origin.index()) {
                if let Some(entry) = memory.right_entries.get_mut(&handle) {
                    arena.unlink_right(&mut entry.first_child, tuple);
                }
            }
        }

        arena.release(tuple);
        self.counters.tuples_deleted += 1;
    }
}
