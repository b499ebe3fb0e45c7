//! Compiled RETE network
//!
//! The network is built once from a rule set and is immutable afterwards. All
//! per-session mutable state (fact store, tuple arena, node memories) lives in
//! [`WorkingMemory`], so one `Arc<ReteNetwork>` can back any number of sessions on
//! any number of threads.
//!
//! ```text
//!  fact ─> ObjectType(Order) ─> Alpha(amount > 100) ─> LeftInputAdapter ─┐
//!                                                                        v
//!  fact ─> ObjectType(Customer) ───────────────────────────────> Join(id == o.customerId)
//!                                                                        v
//!                                                                 Terminal(rule)
//! ```
//!
//! [`WorkingMemory`]: crate::working_memory::WorkingMemory

use crate::accessor::{Declaration, FieldAccessor};
use crate::beta_constraints::BetaConstraints;
use crate::config::NetworkConfig;
use crate::constraint::{AlphaConstraint, BetaConstraint, ConstraintOperator};
use crate::error::{BuildError, PropagationError};
use crate::node_sharing::{NodeSharingRegistry, SharingStats};
use crate::rule::{ConstraintDefinition, PatternDefinition, RuleDefinition};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, instrument};
use trellis_types::{Fact, FactSchema, SchemaRegistry, ValueKind};

/// Index of a node inside a [`ReteNetwork`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Index of a rule inside a [`ReteNetwork`], in definition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Root of the alpha network for one fact type
#[derive(Debug)]
pub struct ObjectTypeNode {
    fact_type: String,
    successors: Vec<NodeId>,
    /// Entry nodes reachable through the alpha tree, in depth-first order
    entries: Vec<NodeId>,
}

/// Single-fact test; forwards facts that pass to its successors
#[derive(Debug)]
pub struct AlphaNode {
    constraint: AlphaConstraint,
    successors: Vec<NodeId>,
}

impl AlphaNode {
    pub fn constraint(&self) -> &AlphaConstraint {
        &self.constraint
    }
}

/// A field of an entry's fact that some join of the rule reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRead {
    /// Join performing the read
    pub node: NodeId,
    pub accessor: FieldAccessor,
}

/// Entry of the first pattern of a rule: wraps a fact into a one-element tuple
#[derive(Debug)]
pub struct LeftInputAdapterNode {
    rule: RuleId,
    sink: NodeId,
    relevant_fields: BTreeSet<String>,
    reads: Vec<FieldRead>,
}

impl LeftInputAdapterNode {
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    /// Join or terminal node receiving the root tuples
    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Fields of the pattern's fact read by later joins of the rule
    pub fn relevant_fields(&self) -> &BTreeSet<String> {
        &self.relevant_fields
    }

    pub fn reads(&self) -> &[FieldRead] {
        &self.reads
    }
}

/// Join of the tuples for patterns `0..pattern` with the facts of `pattern`
#[derive(Debug)]
pub struct JoinNode {
    rule: RuleId,
    pattern: usize,
    fact_type: String,
    constraints: BetaConstraints,
    sink: NodeId,
    relevant_fields: BTreeSet<String>,
    reads: Vec<FieldRead>,
}

impl JoinNode {
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    /// Position of the right-input pattern in the rule
    pub fn pattern(&self) -> usize {
        self.pattern
    }

    pub fn constraints(&self) -> &BetaConstraints {
        &self.constraints
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    /// Fields of the right-input fact read by this join or by later joins of the rule
    pub fn relevant_fields(&self) -> &BTreeSet<String> {
        &self.relevant_fields
    }

    /// Reads of the right-input fact, in propagation order
    pub fn reads(&self) -> &[FieldRead] {
        &self.reads
    }
}

/// End of a rule: every tuple reaching it is a full match
#[derive(Debug)]
pub struct TerminalNode {
    rule: RuleId,
    rule_name: String,
    arity: usize,
}

impl TerminalNode {
    pub fn rule(&self) -> RuleId {
        self.rule
    }

    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    /// Number of patterns, and so of facts per full match
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Every node kind of the network
#[derive(Debug)]
pub enum Node {
    ObjectType(ObjectTypeNode),
    Alpha(AlphaNode),
    LeftInputAdapter(LeftInputAdapterNode),
    Join(JoinNode),
    Terminal(TerminalNode),
}

/// Discriminant of [`Node`], used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    ObjectType,
    Alpha,
    LeftInputAdapter,
    Join,
    Terminal,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::ObjectType => "object-type",
            NodeKind::Alpha => "alpha",
            NodeKind::LeftInputAdapter => "left-input-adapter",
            NodeKind::Join => "join",
            NodeKind::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::ObjectType(_) => NodeKind::ObjectType,
            Node::Alpha(_) => NodeKind::Alpha,
            Node::LeftInputAdapter(_) => NodeKind::LeftInputAdapter,
            Node::Join(_) => NodeKind::Join,
            Node::Terminal(_) => NodeKind::Terminal,
        }
    }

    /// Rule owning the node; alpha-side nodes may be shared and have none
    pub fn rule(&self) -> Option<RuleId> {
        match self {
            Node::ObjectType(_) | Node::Alpha(_) => None,
            Node::LeftInputAdapter(node) => Some(node.rule),
            Node::Join(node) => Some(node.rule),
            Node::Terminal(node) => Some(node.rule),
        }
    }

    fn successors_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Node::ObjectType(node) => Some(&mut node.successors),
            Node::Alpha(node) => Some(&mut node.successors),
            _ => None,
        }
    }
}

/// Node ids making up one compiled rule
#[derive(Debug, Clone, Serialize)]
pub struct CompiledRule {
    pub id: RuleId,
    pub name: String,
    /// Entry node per pattern: the adapter for pattern 0, then one join per pattern
    pub entries: Vec<NodeId>,
    pub terminal: NodeId,
}

/// Static description of one node, for inspection tools
#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub node: NodeId,
    pub kind: NodeKind,
    pub rule: Option<String>,
    pub description: String,
    pub indexed: bool,
    pub index_count: usize,
}

/// Immutable, shareable RETE network
#[derive(Debug)]
pub struct ReteNetwork {
    /// **Node Storage**: every node, addressed by [`NodeId`] index.
    ///
    /// Nodes refer to each other by id only, so the topology is a plain vector and
    /// session memories can be kept in a parallel vector of the same length.
    nodes: Vec<Node>,

    /// **Type Dispatch**: object-type node per fact type mentioned by any rule.
    object_types: HashMap<String, NodeId>,

    /// **Rule Registry**: compiled rules in definition order.
    rules: Vec<CompiledRule>,

    /// **Build Configuration**: settings the network was compiled with.
    config: NetworkConfig,

    /// **Schemas**: fact types the accessors were resolved against.
    schemas: SchemaRegistry,

    /// **Sharing Statistics**: alpha nodes created versus reused during the build.
    sharing: SharingStats,
}

impl ReteNetwork {
    /// Compile a rule set against the given schemas
    #[instrument(skip(rules, schemas), fields(rules = rules.len()))]
    pub fn build(
        rules: Vec<RuleDefinition>,
        schemas: SchemaRegistry,
        config: NetworkConfig,
    ) -> Result<Self, BuildError> {
        config.validate()?;
        let mut builder = NetworkBuilder::new(&schemas, &config);
        let mut names = HashSet::new();
        for rule in &rules {
            if !names.insert(rule.name.as_str()) {
                return Err(BuildError::DuplicateRule { rule: rule.name.clone() });
            }
            builder.add_rule(rule)?;
        }
        let NetworkBuilder { mut nodes, object_types, rules: compiled, sharing, .. } = builder;

        for otn in object_types.values() {
            let entries = collect_entries(&nodes, *otn);
            if let Node::ObjectType(node) = &mut nodes[otn.index()] {
                node.entries = entries;
            }
        }

        let network = Self {
            nodes,
            object_types,
            rules: compiled,
            config,
            schemas,
            sharing: sharing.stats(),
        };
        info!(
            rules = network.rules.len(),
            nodes = network.nodes.len(),
            joins = network.join_count(),
            indexed_joins = network.indexed_join_count(),
            alpha_shares = network.sharing.alpha_shares_found,
            "RETE network compiled"
        );
        Ok(network)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i as u32), node))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn join_node(&self, id: NodeId) -> Option<&JoinNode> {
        match self.node(id)? {
            Node::Join(join) => Some(join),
            _ => None,
        }
    }

    /// Beta constraints of a join node
    pub fn beta_constraints(&self, id: NodeId) -> Option<&BetaConstraints> {
        self.join_node(id).map(JoinNode::constraints)
    }

    pub fn object_type_node(&self, fact_type: &str) -> Option<NodeId> {
        self.object_types.get(fact_type).copied()
    }

    /// Entry nodes a fact of this type can reach, in depth-first alpha order
    pub fn entries_for(&self, fact_type: &str) -> &[NodeId] {
        match self.object_type_node(fact_type).and_then(|id| self.node(id)) {
            Some(Node::ObjectType(otn)) => &otn.entries,
            _ => &[],
        }
    }

    pub fn rule(&self, id: RuleId) -> Option<&CompiledRule> {
        self.rules.get(id.index())
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn sharing_stats(&self) -> SharingStats {
        self.sharing
    }

    pub fn join_count(&self) -> usize {
        self.nodes.iter().filter(|node| matches!(node, Node::Join(_))).count()
    }

    pub fn indexed_join_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::Join(join) if join.constraints.is_indexed()))
            .count()
    }

    /// Run the alpha network on a fact and return the entry nodes it reaches.
    ///
    /// Each alpha node is evaluated at most once. On an accessor failure the id of the
    /// failing alpha node is returned with the error.
    pub fn matching_entries(&self, fact: &Fact) -> Result<Vec<NodeId>, (NodeId, PropagationError)> {
        let mut entries = Vec::new();
        let Some(otn) = self.object_type_node(&fact.fact_type) else {
            return Ok(entries);
        };
        let mut stack = vec![otn];
        while let Some(id) = stack.pop() {
            let successors = match &self.nodes[id.index()] {
                Node::ObjectType(node) => &node.successors,
                Node::Alpha(node) => {
                    if !node.constraint.is_allowed(fact).map_err(|err| (id, err))? {
                        continue;
                    }
                    &node.successors
                }
                Node::LeftInputAdapter(_) | Node::Join(_) => {
                    entries.push(id);
                    continue;
                }
                Node::Terminal(_) => continue,
            };
            stack.extend(successors.iter().rev().copied());
        }
        Ok(entries)
    }

    /// Read every field of `fact` that the joins fed by this entry node will read.
    ///
    /// A fact that passes cannot fail propagation through this entry on its own
    /// values. On failure the id of the reading join is returned with the error.
    pub fn check_entry(
        &self,
        entry: NodeId,
        fact: &Fact,
    ) -> Result<(), (NodeId, PropagationError)> {
        let reads = match self.node(entry) {
            Some(Node::LeftInputAdapter(node)) => &node.reads,
            Some(Node::Join(node)) => &node.reads,
            _ => return Ok(()),
        };
        for read in reads {
            read.accessor.read(fact).map_err(|err| (read.node, err))?;
        }
        Ok(())
    }

    /// Whether any field in `changed` is read at or below this entry node
    pub fn is_affected(&self, entry: NodeId, changed: &[&str]) -> bool {
        let relevant = match self.node(entry) {
            Some(Node::LeftInputAdapter(node)) => &node.relevant_fields,
            Some(Node::Join(node)) => &node.relevant_fields,
            _ => return true,
        };
        changed.iter().any(|field| relevant.contains(*field))
    }

    /// Static layout of every node
    pub fn node_summaries(&self) -> Vec<NodeSummary> {
        self.nodes()
            .map(|(id, node)| {
                let rule = node.rule().and_then(|r| self.rule(r)).map(|r| r.name.clone());
                let (description, indexed, index_count) = match node {
                    Node::ObjectType(otn) => (otn.fact_type.clone(), false, 0),
                    Node::Alpha(alpha) => (alpha.constraint.to_string(), false, 0),
                    Node::LeftInputAdapter(lia) => (format!("-> {}", lia.sink), false, 0),
                    Node::Join(join) => (
                        format!("{} {} -> {}", join.fact_type, join.constraints, join.sink),
                        join.constraints.is_indexed(),
                        join.constraints.index_count(),
                    ),
                    Node::Terminal(terminal) => {
                        (format!("{} patterns", terminal.arity), false, 0)
                    }
                };
                NodeSummary { node: id, kind: node.kind(), rule, description, indexed, index_count }
            })
            .collect()
    }
}

fn collect_entries(nodes: &[Node], root: NodeId) -> Vec<NodeId> {
    let mut entries = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        match &nodes[id.index()] {
            Node::ObjectType(node) => stack.extend(node.successors.iter().rev().copied()),
            Node::Alpha(node) => stack.extend(node.successors.iter().rev().copied()),
            Node::LeftInputAdapter(_) | Node::Join(_) => entries.push(id),
            Node::Terminal(_) => {}
        }
    }
    entries
}

// ============================================================================
// NETWORK COMPILATION
// ============================================================================

struct CompiledPattern {
    fact_type: String,
    alpha: Vec<AlphaConstraint>,
    beta: Vec<BetaConstraint>,
}

struct NetworkBuilder<'a> {
    schemas: &'a SchemaRegistry,
    config: &'a NetworkConfig,
    nodes: Vec<Node>,
    object_types: HashMap<String, NodeId>,
    rules: Vec<CompiledRule>,
    sharing: NodeSharingRegistry,
}

impl<'a> NetworkBuilder<'a> {
    fn new(schemas: &'a SchemaRegistry, config: &'a NetworkConfig) -> Self {
        Self {
            schemas,
            config,
            nodes: Vec::new(),
            object_types: HashMap::new(),
            rules: Vec::new(),
            sharing: NodeSharingRegistry::new(),
        }
    }

    fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len() as u32)
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = self.next_id();
        self.nodes.push(node);
        id
    }

    fn add_successor(&mut self, parent: NodeId, child: NodeId) {
        if let Some(successors) = self.nodes[parent.index()].successors_mut() {
            successors.push(child);
        }
    }

    fn add_rule(&mut self, rule: &RuleDefinition) -> Result<(), BuildError> {
        if rule.patterns.is_empty() {
            return Err(BuildError::EmptyRule { rule: rule.name.clone() });
        }
        let rule_id = RuleId(self.rules.len() as u32);
        let patterns = self.compile_patterns(rule)?;
        let arity = patterns.len();

        // Entry ids are reserved up front so each node can name its sink.
        let first = self.next_id().0;
        let entries: Vec<NodeId> = (0..arity as u32).map(|i| NodeId(first + i)).collect();
        let terminal = NodeId(first + arity as u32);
        let sink_of = |pattern: usize| entries.get(pattern + 1).copied().unwrap_or(terminal);

        // Each join reads its own pattern's fact and the facts its declarations name.
        let mut relevant: Vec<BTreeSet<String>> = vec![BTreeSet::new(); arity];
        let mut reads: Vec<Vec<FieldRead>> = vec![Vec::new(); arity];
        for (position, pattern) in patterns.iter().enumerate() {
            for constraint in &pattern.beta {
                let declaration = constraint.required_declaration();
                for (read_from, accessor) in [
                    (position, constraint.field_extractor()),
                    (declaration.pattern(), declaration.accessor()),
                ] {
                    relevant[read_from].insert(accessor.field().to_string());
                    let read = FieldRead { node: entries[position], accessor: accessor.clone() };
                    if !reads[read_from].contains(&read) {
                        reads[read_from].push(read);
                    }
                }
            }
        }

        let mut alpha_chains = Vec::with_capacity(arity);
        for (position, ((pattern, relevant_fields), reads)) in
            patterns.into_iter().zip(relevant).zip(reads).enumerate()
        {
            let node = if position == 0 {
                Node::LeftInputAdapter(LeftInputAdapterNode {
                    rule: rule_id,
                    sink: sink_of(0),
                    relevant_fields,
                    reads,
                })
            } else {
                Node::Join(JoinNode {
                    rule: rule_id,
                    pattern: position,
                    fact_type: pattern.fact_type.clone(),
                    constraints: BetaConstraints::new(
                        pattern.beta,
                        self.config.composite_key_depth,
                    ),
                    sink: sink_of(position),
                    relevant_fields,
                    reads,
                })
            };
            let id = self.push(node);
            debug_assert_eq!(id, entries[position]);
            alpha_chains.push((pattern.fact_type, pattern.alpha));
        }
        let pushed_terminal = self.push(Node::Terminal(TerminalNode {
            rule: rule_id,
            rule_name: rule.name.clone(),
            arity,
        }));
        debug_assert_eq!(pushed_terminal, terminal);

        for (entry, (fact_type, alpha)) in entries.iter().zip(alpha_chains) {
            let tail = self.build_alpha_chain(&fact_type, alpha);
            self.add_successor(tail, *entry);
        }

        debug!(rule = %rule.name, id = %rule_id, patterns = arity, "Rule compiled");
        self.rules.push(CompiledRule { id: rule_id, name: rule.name.clone(), entries, terminal });
        Ok(())
    }

    fn build_alpha_chain(&mut self, fact_type: &str, constraints: Vec<AlphaConstraint>) -> NodeId {
        let mut parent = match self.object_types.get(fact_type) {
            Some(id) => *id,
            None => {
                let id = self.push(Node::ObjectType(ObjectTypeNode {
                    fact_type: fact_type.to_string(),
                    successors: Vec::new(),
                    entries: Vec::new(),
                }));
                self.object_types.insert(fact_type.to_string(), id);
                id
            }
        };

        for constraint in constraints {
            let signature =
                if self.config.share_alpha_nodes { constraint.signature() } else { None };
            if let Some(signature) = &signature {
                if let Some(existing) = self.sharing.find_alpha(parent, signature) {
                    parent = existing;
                    continue;
                }
            }
            let id = self.push(Node::Alpha(AlphaNode { constraint, successors: Vec::new() }));
            self.add_successor(parent, id);
            match signature {
                Some(signature) => self.sharing.register_alpha(parent, signature, id),
                None => self.sharing.record_unshared(),
            }
            parent = id;
        }
        parent
    }

    fn compile_patterns(&self, rule: &RuleDefinition) -> Result<Vec<CompiledPattern>, BuildError> {
        let mut bindings: HashMap<&str, (usize, &FactSchema)> = HashMap::new();
        let mut compiled = Vec::with_capacity(rule.patterns.len());

        for (position, pattern) in rule.patterns.iter().enumerate() {
            let schema = self.schemas.get(&pattern.fact_type).ok_or_else(|| {
                BuildError::UnknownFactType {
                    rule: rule.name.clone(),
                    fact_type: pattern.fact_type.clone(),
                }
            })?;
            compiled.push(compile_pattern(rule, position, pattern, schema, &bindings)?);

            if let Some(binding) = &pattern.binding {
                if bindings.insert(binding.as_str(), (position, schema)).is_some() {
                    return Err(BuildError::DuplicateDeclaration {
                        rule: rule.name.clone(),
                        declaration: binding.clone(),
                    });
                }
            }
        }
        Ok(compiled)
    }
}

fn compile_pattern(
    rule: &RuleDefinition,
    position: usize,
    pattern: &PatternDefinition,
    schema: &FactSchema,
    bindings: &HashMap<&str, (usize, &FactSchema)>,
) -> Result<CompiledPattern, BuildError> {
    let mut alpha = Vec::new();
    let mut beta = Vec::new();

    let resolve_declaration = |name: &str, field: &str| -> Result<Declaration, BuildError> {
        let (bound_at, bound_schema) =
            bindings.get(name).copied().ok_or_else(|| BuildError::UnboundDeclaration {
                rule: rule.name.clone(),
                pattern: position,
                declaration: name.to_string(),
            })?;
        Ok(Declaration::new(name, bound_at, FieldAccessor::resolve(bound_schema, field)?))
    };

    for constraint in &pattern.constraints {
        let accessor = FieldAccessor::resolve(schema, constraint.field())?;
        match constraint {
            ConstraintDefinition::Literal { operator, value, .. } => {
                check_operator(&accessor, *operator)?;
                let value = value.coerce_to(accessor.kind()).ok_or_else(|| {
                    BuildError::LiteralTypeMismatch {
                        field: accessor.to_string(),
                        literal: value.to_string(),
                        kind: accessor.kind(),
                    }
                })?;
                alpha.push(AlphaConstraint::Literal { accessor, operator: *operator, value });
            }
            ConstraintDefinition::AlphaPredicate { predicate, .. } => {
                alpha.push(AlphaConstraint::Predicate { accessor, predicate: predicate.clone() });
            }
            ConstraintDefinition::Join { operator, declaration, declaration_field, .. } => {
                let declaration = resolve_declaration(declaration, declaration_field)?;
                check_operator(&accessor, *operator)?;
                check_operands(&accessor, declaration.accessor())?;
                beta.push(BetaConstraint::Compare { accessor, operator: *operator, declaration });
            }
            ConstraintDefinition::JoinPredicate {
                declaration, declaration_field, predicate, ..
            } => {
                let declaration = resolve_declaration(declaration, declaration_field)?;
                beta.push(BetaConstraint::Predicate {
                    accessor,
                    declaration,
                    predicate: predicate.clone(),
                });
            }
        }
    }

    Ok(CompiledPattern { fact_type: pattern.fact_type.clone(), alpha, beta })
}

fn check_operator(accessor: &FieldAccessor, operator: ConstraintOperator) -> Result<(), BuildError> {
    if operator.is_ordering() && !accessor.kind().is_ordered() {
        return Err(BuildError::UnsupportedOperator {
            field: accessor.to_string(),
            operator: operator.to_string(),
            kind: accessor.kind(),
        });
    }
    Ok(())
}

fn check_operands(left: &FieldAccessor, right: &FieldAccessor) -> Result<(), BuildError> {
    let (left_kind, right_kind): (ValueKind, ValueKind) = (left.kind(), right.kind());
    if !left_kind.is_comparable_with(right_kind) {
        return Err(BuildError::OperandTypeMismatch {
            left: left.to_string(),
            left_kind,
            right: right.to_string(),
            right_kind,
        });
    }
    Ok(())
}
