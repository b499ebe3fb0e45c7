//! Alpha node sharing
//!
//! Identical literal tests under the same parent are compiled into one alpha node and
//! reused by every pattern that needs them, so a fact is tested once per distinct
//! constraint rather than once per rule.

use crate::accessor::FieldAccessor;
use crate::constraint::ConstraintOperator;
use crate::rete_network::NodeId;
use std::collections::HashMap;
use trellis_types::ValueKey;

/// A canonical representation of a literal alpha test for sharing purposes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlphaNodeSignature {
    accessor: FieldAccessor,
    operator: ConstraintOperator,
    value: ValueKey,
}

impl AlphaNodeSignature {
    pub fn new(accessor: FieldAccessor, operator: ConstraintOperator, value: ValueKey) -> Self {
        Self { accessor, operator, value }
    }
}

/// Tracks compiled alpha nodes by `(parent, signature)` during a network build
#[derive(Debug, Default)]
pub struct NodeSharingRegistry {
    alpha_node_map: HashMap<(NodeId, AlphaNodeSignature), NodeId>,
    pub alpha_shares_found: usize,
    pub alpha_nodes_created: usize,
}

impl NodeSharingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing node for this test under `parent`, counting the share
    pub fn find_alpha(&mut self, parent: NodeId, signature: &AlphaNodeSignature) -> Option<NodeId> {
        let found = self.alpha_node_map.get(&(parent, signature.clone())).copied();
        if found.is_some() {
            self.alpha_shares_found += 1;
        }
        found
    }

    pub fn register_alpha(&mut self, parent: NodeId, signature: AlphaNodeSignature, node: NodeId) {
        self.alpha_node_map.insert((parent, signature), node);
        self.alpha_nodes_created += 1;
    }

    /// Record a node that cannot be shared
    pub fn record_unshared(&mut self) {
        self.alpha_nodes_created += 1;
    }

    pub fn stats(&self) -> SharingStats {
        SharingStats {
            alpha_nodes_created: self.alpha_nodes_created,
            alpha_shares_found: self.alpha_shares_found,
        }
    }
}

/// Summary of sharing achieved by a network build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SharingStats {
    pub alpha_nodes_created: usize,
    pub alpha_shares_found: usize,
}

impl SharingStats {
    /// Fraction of alpha lookups satisfied by an existing node
    pub fn sharing_ratio(&self) -> f64 {
        let total = self.alpha_nodes_created + self.alpha_shares_found;
        if total == 0 { 0.0 } else { self.alpha_shares_found as f64 / total as f64 }
    }
}
