//! Activation output
//!
//! A full match reaching a terminal node is an activation; its retraction is a
//! deactivation. The working memory buffers both while an event propagates and hands
//! them to an [`ActivationSink`] once the event is complete. Ordering and conflict
//! resolution are left to whatever sits behind the sink.

use crate::rete_network::RuleId;
use crate::tuple::TupleId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use trellis_types::FactHandle;

/// One full match of a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activation {
    pub rule: RuleId,
    pub rule_name: String,
    pub tuple: TupleId,
    /// Matched facts in pattern order
    pub facts: Vec<FactHandle>,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.rule_name)?;
        for (i, handle) in self.facts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{handle}")?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ActivationEvent {
    Activated(Activation),
    Deactivated(Activation),
}

/// Receiver of activation changes
pub trait ActivationSink {
    /// A tuple reached a terminal node
    fn activate(&mut self, activation: &Activation);

    /// A previously activated tuple was retracted
    fn deactivate(&mut self, activation: &Activation);
}

impl ActivationSink for Vec<ActivationEvent> {
    fn activate(&mut self, activation: &Activation) {
        self.push(ActivationEvent::Activated(activation.clone()));
    }

    fn deactivate(&mut self, activation: &Activation) {
        self.push(ActivationEvent::Deactivated(activation.clone()));
    }
}

impl<S: ActivationSink + ?Sized> ActivationSink for &mut S {
    fn activate(&mut self, activation: &Activation) {
        (**self).activate(activation);
    }

    fn deactivate(&mut self, activation: &Activation) {
        (**self).deactivate(activation);
    }
}

impl<S: ActivationSink + ?Sized> ActivationSink for Box<S> {
    fn activate(&mut self, activation: &Activation) {
        (**self).activate(activation);
    }

    fn deactivate(&mut self, activation: &Activation) {
        (**self).deactivate(activation);
    }
}

/// Default sink: the set of currently active matches plus running totals
#[derive(Debug, Default)]
pub struct ActivationLog {
    active: BTreeMap<TupleId, Activation>,
    activations: u64,
    deactivations: u64,
    history: Option<Vec<ActivationEvent>>,
}

impl ActivationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also keep every event in arrival order
    pub fn with_history() -> Self {
        Self { history: Some(Vec::new()), ..Self::default() }
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active(&self) -> impl Iterator<Item = &Activation> {
        self.active.values()
    }

    pub fn active_for<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a Activation> {
        self.active.values().filter(move |activation| activation.rule_name == rule_name)
    }

    /// Total activations received
    pub fn activation_count(&self) -> u64 {
        self.activations
    }

    /// Total deactivations received
    pub fn deactivation_count(&self) -> u64 {
        self.deactivations
    }

    pub fn take_history(&mut self) -> Vec<ActivationEvent> {
        self.history.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

impl ActivationSink for ActivationLog {
    fn activate(&mut self, activation: &Activation) {
        self.activations += 1;
        self.active.insert(activation.tuple, activation.clone());
        if let Some(history) = &mut self.history {
            history.push(ActivationEvent::Activated(activation.clone()));
        }
    }

    fn deactivate(&mut self, activation: &Activation) {
        self.deactivations += 1;
        self.active.remove(&activation.tuple);
        if let Some(history) = &mut self.history {
            history.push(ActivationEvent::Deactivated(activation.clone()));
        }
    }
}
