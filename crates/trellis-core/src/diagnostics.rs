//! Network and session statistics for inspection tools and tests

use crate::beta_network::{NodeCounters, NodeMemory};
use crate::memory::MemoryKind;
use crate::node_sharing::SharingStats;
use crate::rete_network::{NodeId, NodeKind, NodeSummary};
use crate::working_memory::PropagationStats;
use serde::Serialize;
use std::fmt;

/// Live state of one node in one session
#[derive(Debug, Clone, Serialize)]
pub struct NodeStats {
    pub node: NodeId,
    pub kind: NodeKind,
    pub rule: Option<String>,
    pub description: String,
    /// Memory layout of a join node
    pub memory_kind: Option<MemoryKind>,
    pub indexed: bool,
    pub index_count: usize,
    pub left_count: usize,
    pub right_count: usize,
    pub left_buckets: usize,
    pub right_buckets: usize,
    pub counters: NodeCounters,
}

impl NodeStats {
    pub(crate) fn new(summary: NodeSummary, memory: Option<&NodeMemory>) -> Self {
        let beta = memory.and_then(NodeMemory::beta_memory);
        Self {
            node: summary.node,
            kind: summary.kind,
            rule: summary.rule,
            description: summary.description,
            memory_kind: beta.map(|beta| beta.kind()),
            indexed: summary.indexed,
            index_count: summary.index_count,
            left_count: memory.map_or(0, NodeMemory::left_count),
            right_count: memory.map_or(0, NodeMemory::right_count),
            left_buckets: beta.map_or(0, |beta| beta.left().bucket_count()),
            right_buckets: beta.map_or(0, |beta| beta.right().bucket_count()),
            counters: memory.map(NodeMemory::counters).unwrap_or_default(),
        }
    }

    /// Whether the node keeps any per-session memory
    pub fn is_stateful(&self) -> bool {
        matches!(self.kind, NodeKind::LeftInputAdapter | NodeKind::Join | NodeKind::Terminal)
    }
}

/// Snapshot of a whole session
#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub nodes: Vec<NodeStats>,
    pub facts: usize,
    pub tuples: usize,
    pub propagation: PropagationStats,
    pub sharing: SharingStats,
}

impl NetworkStats {
    pub fn node(&self, id: NodeId) -> Option<&NodeStats> {
        self.nodes.iter().find(|stats| stats.node == id)
    }

    pub fn joins(&self) -> impl Iterator<Item = &NodeStats> {
        self.nodes.iter().filter(|stats| stats.kind == NodeKind::Join)
    }

    /// Sum of the counters of every node
    pub fn total_counters(&self) -> NodeCounters {
        let mut total = NodeCounters::default();
        for stats in &self.nodes {
            total += stats.counters;
        }
        total
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Network Statistics ===")?;
        writeln!(f, "Facts: {}", self.facts)?;
        writeln!(f, "Tuples: {}", self.tuples)?;
        writeln!(
            f,
            "Alpha nodes: {} created, {} shared ({:.1}%)",
            self.sharing.alpha_nodes_created,
            self.sharing.alpha_shares_found,
            self.sharing.sharing_ratio() * 100.0
        )?;
        writeln!(f)?;

        writeln!(f, "{}", self.propagation)?;
        writeln!(f)?;

        writeln!(f, "Nodes:")?;
        for stats in self.nodes.iter().filter(|stats| stats.is_stateful()) {
            write!(f, "  {} {} {}", stats.node, stats.kind, stats.description)?;
            if let Some(rule) = &stats.rule {
                write!(f, " [{rule}]")?;
            }
            writeln!(f)?;
            match stats.kind {
                NodeKind::Join => {
                    let layout = if stats.indexed {
                        format!("hashed on {} key(s)", stats.index_count)
                    } else {
                        "linear".to_string()
                    };
                    writeln!(
                        f,
                        "    {layout}: left {} in {} bucket(s), right {} in {} bucket(s)",
                        stats.left_count, stats.left_buckets, stats.right_count, stats.right_buckets
                    )?;
                }
                _ => writeln!(f, "    tuples: {}", stats.left_count)?,
            }
            writeln!(
                f,
                "    left +{}/-{}, right +{}/-{}",
                stats.counters.left_adds,
                stats.counters.left_removes,
                stats.counters.right_adds,
                stats.counters.right_removes
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::constraint::ConstraintOperator::Equal;
    use crate::rete_network::ReteNetwork;
    use crate::rule::{PatternDefinition, RuleDefinition};
    use crate::working_memory::WorkingMemory;
    use std::sync::Arc;
    use trellis_types::{Fact, FactSchema, SchemaRegistry, ValueKind};

    #[test]
    fn test_node_stats_reflect_memories() {
        let schemas = SchemaRegistry::new()
            .with(FactSchema::new("Person").field("name", ValueKind::String))
            .with(FactSchema::new("Pet").field("owner", ValueKind::String));
        let rule = RuleDefinition::new("owns")
            .pattern(PatternDefinition::new("Person").bind("p"))
            .pattern(PatternDefinition::new("Pet").join("owner", Equal, "p", "name"));
        let network =
            Arc::new(ReteNetwork::build(vec![rule], schemas, NetworkConfig::default()).unwrap());
        let join = network.rule_by_name("owns").unwrap().entries[1];

        let mut wm = WorkingMemory::new(network);
        wm.insert(Fact::new("Person").with("name", "ann")).unwrap();
        wm.insert(Fact::new("Person").with("name", "bob")).unwrap();
        wm.insert(Fact::new("Pet").with("owner", "ann")).unwrap();

        let stats = wm.node_stats();
        let join_stats = stats.node(join).unwrap();
        assert_eq!(join_stats.memory_kind, Some(MemoryKind::Hashed));
        assert_eq!((join_stats.left_count, join_stats.right_count), (2, 1));
        assert_eq!((join_stats.left_buckets, join_stats.right_buckets), (2, 1));
        assert_eq!(stats.joins().count(), 1);
        assert_eq!(stats.facts, 3);
        assert_eq!(stats.total_counters().right_adds, 1);

        let text = stats.to_string();
        assert!(text.starts_with("=== Network Statistics ==="));
        assert!(text.contains("hashed on 1 key(s)"));
    }
}
