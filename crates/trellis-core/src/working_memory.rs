//! Working memory: the propagation controller of one session
//!
//! A [`WorkingMemory`] owns the facts, the tuple arena and every node memory of one
//! session over a shared, immutable [`ReteNetwork`]. Each public mutating call is one
//! top-level event: it runs to completion, then the buffered activation changes are
//! handed to the [`ActivationSink`].

use crate::activation::{ActivationEvent, ActivationLog, ActivationSink};
use crate::beta_network::{NetworkState, NodeCounters, Propagator, TupleCounters};
use crate::diagnostics::{NetworkStats, NodeStats};
use crate::error::{ConsistencyError, TrellisError, TrellisResult};
use crate::fact_store::FactStore;
use crate::rete_network::{NodeId, ReteNetwork};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use trellis_types::{Fact, FactHandle};

/// Session-level propagation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PropagationStats {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    /// Entry nodes left untouched by an update because no field they read changed
    pub skipped_updates: u64,
    pub propagation_errors: u64,
    #[serde(flatten)]
    pub tuples: TupleCounters,
}

impl fmt::Display for PropagationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Inserts: {}", self.inserts)?;
        writeln!(f, "Updates: {} ({} entry nodes skipped)", self.updates, self.skipped_updates)?;
        writeln!(f, "Deletes: {}", self.deletes)?;
        writeln!(
            f,
            "Tuples: {} created, {} deleted",
            self.tuples.tuples_created, self.tuples.tuples_deleted
        )?;
        writeln!(
            f,
            "Activations: {} activated, {} deactivated",
            self.tuples.activations, self.tuples.deactivations
        )?;
        write!(f, "Propagation errors: {}", self.propagation_errors)
    }
}

/// One session of facts matched against a [`ReteNetwork`]
pub struct WorkingMemory<S: ActivationSink = ActivationLog> {
    network: Arc<ReteNetwork>,
    facts: FactStore,
    state: NetworkState,
    /// Activation changes of the event in progress
    events: Vec<ActivationEvent>,
    sink: S,
    stats: PropagationStats,
}

impl WorkingMemory<ActivationLog> {
    /// Create a session that records activations in an [`ActivationLog`]
    pub fn new(network: Arc<ReteNetwork>) -> Self {
        Self::with_sink(network, ActivationLog::new())
    }
}

impl<S: ActivationSink> WorkingMemory<S> {
    pub fn with_sink(network: Arc<ReteNetwork>, sink: S) -> Self {
        let state = NetworkState::new(&network);
        debug!(nodes = network.node_count(), "Working memory created");
        Self {
            network,
            facts: FactStore::new(),
            state,
            events: Vec::new(),
            sink,
            stats: PropagationStats::default(),
        }
    }

    pub fn network(&self) -> &Arc<ReteNetwork> {
        &self.network
    }

    pub fn get(&self, handle: FactHandle) -> Option<&Fact> {
        self.facts.get(handle)
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Live handles in insertion order
    pub fn handles(&self) -> Vec<FactHandle> {
        self.facts.handles()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn stats(&self) -> &PropagationStats {
        &self.stats
    }

    /// Live tuples across every node
    pub fn tuple_count(&self) -> usize {
        self.state.arena.len()
    }

    /// Tuples in the left memory of a node (root tuples for an adapter, full
    /// matches for a terminal)
    pub fn left_count(&self, node: NodeId) -> usize {
        self.state.memory(node).map_or(0, |memory| memory.left_count())
    }

    /// Facts in the right memory of a join node
    pub fn right_count(&self, node: NodeId) -> usize {
        self.state.memory(node).map_or(0, |memory| memory.right_count())
    }

    pub fn node_counters(&self, node: NodeId) -> NodeCounters {
        self.state.memory(node).map(|memory| memory.counters()).unwrap_or_default()
    }

    /// Current full matches of a rule, each as fact handles in pattern order
    pub fn matches(&self, rule_name: &str) -> Vec<Vec<FactHandle>> {
        let Some(rule) = self.network.rule_by_name(rule_name) else {
            return Vec::new();
        };
        let mut matches: Vec<Vec<FactHandle>> = self
            .state
            .memory(rule.terminal)
            .map(|memory| memory.terminal_tuples())
            .unwrap_or_default()
            .into_iter()
            .map(|tuple| self.state.arena.handles(tuple))
            .collect();
        matches.sort();
        matches
    }

    /// Per-node memory statistics plus session counters
    pub fn node_stats(&self) -> NetworkStats {
        let nodes = self
            .network
            .node_summaries()
            .into_iter()
            .map(|summary| {
                let memory = self.state.memory(summary.node);
                NodeStats::new(summary, memory)
            })
            .collect();
        NetworkStats {
            nodes,
            facts: self.facts.len(),
            tuples: self.state.arena.len(),
            propagation: self.stats,
            sharing: self.network.sharing_stats(),
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Insert a fact under the next free handle
    pub fn insert(&mut self, fact: Fact) -> TrellisResult<FactHandle> {
        let handle = self.facts.next_handle();
        self.insert_with_handle(handle, fact)?;
        Ok(handle)
    }

    /// Insert a fact under a caller-chosen handle, which must be greater than every
    /// handle used before in this session.
    ///
    /// On a propagation error the fact stays in working memory with the matches of
    /// the entry nodes it entered before the failing one; it can still be updated or
    /// deleted.
    #[instrument(skip(self, fact), fields(fact_type = %fact.fact_type))]
    pub fn insert_with_handle(&mut self, handle: FactHandle, fact: Fact) -> TrellisResult<()> {
        self.facts.insert(handle, fact)?;
        self.stats.inserts += 1;

        let result = self.entries_for_stored(handle).and_then(|entries| {
            debug!(fact = %handle, entries = entries.len(), "Fact inserted");
            self.propagate(handle, &[], &entries)
        });
        self.finish(result)
    }

    /// Replace a fact. Only entry nodes the fact enters, leaves, or whose joins read a
    /// changed field are re-propagated; all retractions happen before any insertion.
    ///
    /// If a join would fail to read the new version, the update is refused and the old
    /// version stays in place with its matches.
    #[instrument(skip(self, fact), fields(fact_type = %fact.fact_type))]
    pub fn update(&mut self, handle: FactHandle, fact: Fact) -> TrellisResult<()> {
        if !self.facts.contains(handle) {
            return Err(ConsistencyError::UnknownHandle(handle).into());
        }
        // Alpha evaluation of the new version happens before anything changes.
        let now = match self.network.matching_entries(&fact) {
            Ok(now) => now,
            Err((node, source)) => {
                return self.finish(Err(TrellisError::Propagation { handle, node, source }));
            }
        };

        let old = self.facts.get(handle).ok_or(ConsistencyError::UnknownHandle(handle))?;
        let network = &*self.network;
        let type_changed = old.fact_type != fact.fact_type;
        let changed = old.changed_fields(&fact);
        let relevant_only = network.config().skip_unaffected_updates && !type_changed;

        let mut candidates: Vec<NodeId> = network.entries_for(&old.fact_type).to_vec();
        if type_changed {
            candidates.extend_from_slice(network.entries_for(&fact.fact_type));
        }

        let mut retract = Vec::new();
        let mut assert = Vec::new();
        let mut skipped = 0;
        for entry in candidates {
            let was = self.state.holds(entry, handle);
            let is = now.contains(&entry);
            match (was, is) {
                (true, false) => retract.push(entry),
                (false, true) => assert.push(entry),
                (true, true) if relevant_only && !network.is_affected(entry, &changed) => {
                    skipped += 1;
                }
                (true, true) => {
                    retract.push(entry);
                    assert.push(entry);
                }
                (false, false) => {}
            }
        }
        debug!(
            fact = %handle,
            changed = ?changed,
            retract = retract.len(),
            assert = assert.len(),
            skipped,
            "Fact updated"
        );

        // Every entry the new version enters is checked before anything changes.
        let checked = assert.iter().try_for_each(|entry| network.check_entry(*entry, &fact));
        if let Err((node, source)) = checked {
            return self.finish(Err(TrellisError::Propagation { handle, node, source }));
        }

        self.facts.replace(handle, fact)?;
        self.stats.updates += 1;
        self.stats.skipped_updates += skipped;
        let result = self.propagate(handle, &retract, &assert);
        self.finish(result)
    }

    /// Remove a fact and every tuple derived from it, returning the fact
    #[instrument(skip(self))]
    pub fn delete(&mut self, handle: FactHandle) -> TrellisResult<Fact> {
        let fact = self.facts.get(handle).ok_or(ConsistencyError::UnknownHandle(handle))?;
        let entries: Vec<NodeId> = self
            .network
            .entries_for(&fact.fact_type)
            .iter()
            .copied()
            .filter(|entry| self.state.holds(*entry, handle))
            .collect();

        let result = self.propagate(handle, &entries, &[]);
        self.finish(result)?;
        let fact = self.facts.remove(handle)?;
        self.stats.deletes += 1;
        debug!(fact = %handle, entries = entries.len(), "Fact deleted");
        Ok(fact)
    }

    fn entries_for_stored(&self, handle: FactHandle) -> TrellisResult<Vec<NodeId>> {
        let fact = self.facts.get(handle).ok_or(ConsistencyError::UnknownHandle(handle))?;
        self.network
            .matching_entries(fact)
            .map_err(|(node, source)| TrellisError::Propagation { handle, node, source })
    }

    fn propagate(
        &mut self,
        handle: FactHandle,
        retract: &[NodeId],
        assert: &[NodeId],
    ) -> TrellisResult<()> {
        let mut propagator = Propagator::new(
            &self.network,
            &self.facts,
            &mut self.state,
            &mut self.events,
            &mut self.stats.tuples,
            handle,
        );
        for entry in retract {
            propagator.retract_fact(*entry, handle)?;
        }
        for entry in assert {
            propagator.assert_fact(*entry, handle)?;
        }
        Ok(())
    }

    /// Deliver buffered activation changes and account for the event's outcome
    fn finish<T>(&mut self, result: TrellisResult<T>) -> TrellisResult<T> {
        for event in self.events.drain(..) {
            match &event {
                ActivationEvent::Activated(activation) => self.sink.activate(activation),
                ActivationEvent::Deactivated(activation) => self.sink.deactivate(activation),
            }
        }
        if let Err(err) = &result {
            self.stats.propagation_errors += 1;
            warn!(
                category = err.category(),
                severity = %err.severity(),
                error = %err,
                "Event aborted"
            );
        }
        result
    }
}

impl<S: ActivationSink> fmt::Debug for WorkingMemory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkingMemory")
            .field("facts", &self.facts.len())
            .field("tuples", &self.state.arena.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
