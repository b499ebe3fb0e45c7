//! Shared fixtures: an order/customer/shipment rule set and session snapshots
#![allow(dead_code)]

use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use trellis_core::ConstraintOperator::{Equal, Greater, GreaterOrEqual, LessOrEqual};
use trellis_core::{
    ActivationSink, NetworkConfig, NodeId, PatternDefinition, ReteNetwork, RuleDefinition,
    TrellisError, WorkingMemory,
};
use trellis_types::{Fact, FactHandle, FactSchema, FactValue, SchemaRegistry, ValueKind};

pub const RULES: [&str; 4] =
    ["big-order-customer", "regional-shipment", "tier-limit", "priority-shipment"];

pub fn schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with(
            FactSchema::new("Order")
                .field("id", ValueKind::Integer)
                .field("customerId", ValueKind::Integer)
                .field("amount", ValueKind::Float)
                .field("region", ValueKind::String)
                .field("note", ValueKind::String),
        )
        .with(
            FactSchema::new("Customer")
                .field("id", ValueKind::Integer)
                .field("region", ValueKind::String)
                .field("tier", ValueKind::Integer),
        )
        .with(
            FactSchema::new("Shipment")
                .field("orderId", ValueKind::Integer)
                .field("region", ValueKind::String)
                .field("weight", ValueKind::Float),
        )
}

pub fn rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new("big-order-customer")
            .pattern(PatternDefinition::new("Order").bind("o").literal("amount", Greater, 100))
            .pattern(PatternDefinition::new("Customer").join("id", Equal, "o", "customerId")),
        // Three-way join with composite keys on both joins and a trailing filter.
        RuleDefinition::new("regional-shipment")
            .pattern(PatternDefinition::new("Order").bind("o"))
            .pattern(
                PatternDefinition::new("Customer")
                    .bind("c")
                    .join("id", Equal, "o", "customerId")
                    .join("region", Equal, "o", "region"),
            )
            .pattern(
                PatternDefinition::new("Shipment")
                    .join("orderId", Equal, "o", "id")
                    .join("region", Equal, "c", "region")
                    .join("weight", LessOrEqual, "o", "amount"),
            ),
        // Equality key followed by a cross-kind ordering filter.
        RuleDefinition::new("tier-limit")
            .pattern(PatternDefinition::new("Customer").bind("c"))
            .pattern(
                PatternDefinition::new("Order")
                    .join("customerId", Equal, "c", "id")
                    .join("amount", Greater, "c", "tier"),
            ),
        // Unindexed cross product behind an alpha test.
        RuleDefinition::new("priority-shipment")
            .pattern(PatternDefinition::new("Customer").literal("tier", GreaterOrEqual, 2))
            .pattern(PatternDefinition::new("Shipment")),
    ]
}

pub fn network(config: NetworkConfig) -> Arc<ReteNetwork> {
    Arc::new(ReteNetwork::build(rules(), schemas(), config).expect("fixture rules compile"))
}

pub fn order(id: i64, customer: i64, amount: f64, region: &str) -> Fact {
    Fact::new("Order")
        .with("id", id)
        .with("customerId", customer)
        .with("amount", amount)
        .with("region", region)
}

pub fn customer(id: i64, region: &str, tier: i64) -> Fact {
    Fact::new("Customer").with("id", id).with("region", region).with("tier", tier)
}

pub fn shipment(order: i64, region: &str, weight: f64) -> Fact {
    Fact::new("Shipment").with("orderId", order).with("region", region).with("weight", weight)
}

/// Observable state of a session: matches per rule and live counts per node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub matches: BTreeMap<String, Vec<Vec<FactHandle>>>,
    pub counts: Vec<(NodeId, usize, usize)>,
    pub tuples: usize,
}

pub fn snapshot<S: ActivationSink>(wm: &WorkingMemory<S>) -> Snapshot {
    let matches =
        RULES.iter().map(|rule| (rule.to_string(), wm.matches(rule))).collect::<BTreeMap<_, _>>();
    let counts = wm
        .network()
        .nodes()
        .map(|(id, _)| (id, wm.left_count(id), wm.right_count(id)))
        .collect();
    Snapshot { matches, counts, tuples: wm.tuple_count() }
}

// ----------------------------------------------------------------------------
// Strategies
// ----------------------------------------------------------------------------

fn small_int() -> impl Strategy<Value = FactValue> {
    prop_oneof![6 => (0i64..3).prop_map(FactValue::Integer), 1 => Just(FactValue::Null)]
}

/// An integer field that is sometimes of the wrong kind
fn int_or_malformed() -> impl Strategy<Value = FactValue> {
    prop_oneof![
        8 => small_int(),
        1 => (0i64..3).prop_map(|n| FactValue::Float(n as f64)),
        1 => Just(FactValue::from("7")),
    ]
}

fn amount() -> impl Strategy<Value = FactValue> {
    prop_oneof![
        8 => prop::sample::select(vec![1.0, 2.0, 50.0, 150.0, 250.0]).prop_map(FactValue::Float),
        2 => Just(FactValue::Null),
        1 => Just(FactValue::from("heavy")),
    ]
}

fn region() -> impl Strategy<Value = FactValue> {
    prop_oneof![
        4 => prop::sample::select(vec!["north", "south"]).prop_map(FactValue::from),
        1 => Just(FactValue::Null),
    ]
}

fn note() -> impl Strategy<Value = FactValue> {
    prop::sample::select(vec!["", "gift", "rush"]).prop_map(FactValue::from)
}

pub fn any_fact() -> impl Strategy<Value = Fact> {
    prop_oneof![
        (small_int(), int_or_malformed(), amount(), region(), note()).prop_map(
            |(id, customer, amount, region, note)| {
                Fact::new("Order")
                    .with("id", id)
                    .with("customerId", customer)
                    .with("amount", amount)
                    .with("region", region)
                    .with("note", note)
            }
        ),
        (small_int(), region(), int_or_malformed()).prop_map(|(id, region, tier)| {
            Fact::new("Customer").with("id", id).with("region", region).with("tier", tier)
        }),
        (small_int(), region(), amount()).prop_map(|(order, region, weight)| {
            Fact::new("Shipment").with("orderId", order).with("region", region).with("weight", weight)
        }),
    ]
}

/// One working-memory event; indices pick among live handles modulo their count
#[derive(Debug, Clone)]
pub enum Op {
    Insert(Fact),
    Update(usize, Fact),
    Delete(usize),
}

pub fn any_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => any_fact().prop_map(Op::Insert),
        3 => (any::<usize>(), any_fact()).prop_map(|(i, fact)| Op::Update(i, fact)),
        2 => any::<usize>().prop_map(Op::Delete),
    ]
}

/// Apply an op; ops on an empty session are no-ops
pub fn apply<S: ActivationSink>(wm: &mut WorkingMemory<S>, op: &Op) -> Result<(), TrellisError> {
    let live = wm.handles();
    match op {
        Op::Insert(fact) => wm.insert(fact.clone()).map(drop),
        Op::Update(i, fact) if !live.is_empty() => wm.update(live[i % live.len()], fact.clone()),
        Op::Delete(i) if !live.is_empty() => wm.delete(live[i % live.len()]).map(drop),
        _ => Ok(()),
    }
}
