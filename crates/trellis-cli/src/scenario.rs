//! Scenario files: schemas, rules, configuration and a fact event stream
//!
//! ```yaml
//! config: { composite_key_depth: 1 }
//! types:
//!   - { name: Order, fields: { amount: float, customerId: integer } }
//!   - { name: Customer, fields: { id: integer } }
//! rules:
//!   - name: big-order
//!     patterns: [ ... ]
//! events:
//!   - { op: insert, id: c5, fact_type: Customer, fields: { id: 5 } }
//!   - { op: delete, id: c5 }
//! ```
//!
//! Facts are named by symbolic ids inside the file; replay maps them to handles.

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use trellis_core::{
    Activation, ActivationEvent, ActivationLog, NetworkConfig, NetworkStats, ReteNetwork,
    RuleDefinition, WorkingMemory,
};
use trellis_types::{Fact, FactHandle, FactSchema, FactValue, SchemaRegistry};

/// A complete replayable scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: Option<NetworkConfig>,
    #[serde(default)]
    pub types: Vec<FactSchema>,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
}

/// One working-memory operation on a symbolic fact id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Insert {
        id: String,
        fact_type: String,
        #[serde(default)]
        fields: serde_json::Map<String, serde_json::Value>,
    },
    /// Replace the fact; the type defaults to the current one
    Update {
        id: String,
        #[serde(default)]
        fact_type: Option<String>,
        #[serde(default)]
        fields: serde_json::Map<String, serde_json::Value>,
    },
    Delete { id: String },
}

impl ScenarioEvent {
    pub fn op(&self) -> &'static str {
        match self {
            ScenarioEvent::Insert { .. } => "insert",
            ScenarioEvent::Update { .. } => "update",
            ScenarioEvent::Delete { .. } => "delete",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ScenarioEvent::Insert { id, .. }
            | ScenarioEvent::Update { id, .. }
            | ScenarioEvent::Delete { id } => id,
        }
    }
}

impl Scenario {
    pub fn parse(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).context("Failed to parse scenario")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario '{}'", path.display()))?;
        Self::parse(&source).with_context(|| format!("Invalid scenario '{}'", path.display()))
    }

    pub fn schemas(&self) -> SchemaRegistry {
        self.types.iter().cloned().collect()
    }

    /// Compile the scenario's rules
    pub fn build_network(&self, config: NetworkConfig) -> Result<ReteNetwork> {
        ReteNetwork::build(self.rules.clone(), self.schemas(), config)
            .context("Failed to compile scenario rules")
    }
}

/// Outcome of one replayed event
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub op: &'static str,
    pub id: String,
    pub handle: FactHandle,
    pub activated: Vec<Activation>,
    pub deactivated: Vec<Activation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepOutcome>,
    /// Matches still active at the end, in tuple order
    pub active: Vec<Activation>,
    pub stats: NetworkStats,
}

impl ReplayReport {
    pub fn error_count(&self) -> usize {
        self.steps.iter().filter(|step| step.error.is_some()).count()
    }
}

/// Feeds scenario events into a working memory
pub struct Replayer {
    memory: WorkingMemory<ActivationLog>,
    ids: HashMap<String, FactHandle>,
    last_handle: u64,
}

impl Replayer {
    pub fn new(network: Arc<ReteNetwork>) -> Self {
        Self {
            memory: WorkingMemory::with_sink(network, ActivationLog::with_history()),
            ids: HashMap::new(),
            last_handle: 0,
        }
    }

    pub fn memory(&self) -> &WorkingMemory<ActivationLog> {
        &self.memory
    }

    /// Replay every event. Engine errors are recorded per step; malformed events
    /// (unknown or reused ids, non-scalar field values) abort the replay.
    #[instrument(skip_all, fields(events = events.len()))]
    pub fn replay(mut self, events: &[ScenarioEvent]) -> Result<ReplayReport> {
        let mut steps = Vec::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            let step = index + 1;
            let outcome =
                self.apply(step, event).with_context(|| format!("Event {step} ({})", event.op()))?;
            steps.push(outcome);
        }

        let report = ReplayReport {
            active: self.memory.sink().active().cloned().collect(),
            stats: self.memory.node_stats(),
            steps,
        };
        info!(
            steps = report.steps.len(),
            active = report.active.len(),
            errors = report.error_count(),
            "Scenario replayed"
        );
        Ok(report)
    }

    fn apply(&mut self, step: usize, event: &ScenarioEvent) -> Result<StepOutcome> {
        let (handle, result) = match event {
            ScenarioEvent::Insert { id, fact_type, fields } => {
                if self.ids.contains_key(id) {
                    bail!("Fact id '{id}' is already in use");
                }
                let fact = self.build_fact(fact_type, fields)?;
                self.last_handle += 1;
                let handle = FactHandle(self.last_handle);
                self.ids.insert(id.clone(), handle);
                (handle, self.memory.insert_with_handle(handle, fact))
            }
            ScenarioEvent::Update { id, fact_type, fields } => {
                let handle = self.handle(id)?;
                let fact_type = match fact_type {
                    Some(fact_type) => fact_type.clone(),
                    None => self
                        .memory
                        .get(handle)
                        .map(|fact| fact.fact_type.clone())
                        .ok_or_else(|| anyhow!("Fact '{id}' is not in working memory"))?,
                };
                let fact = self.build_fact(&fact_type, fields)?;
                (handle, self.memory.update(handle, fact))
            }
            ScenarioEvent::Delete { id } => {
                let handle = self.handle(id)?;
                let result = self.memory.delete(handle).map(|_| ());
                if result.is_ok() {
                    self.ids.remove(id);
                }
                (handle, result)
            }
        };

        let mut outcome = StepOutcome {
            step,
            op: event.op(),
            id: event.id().to_string(),
            handle,
            activated: Vec::new(),
            deactivated: Vec::new(),
            error: None,
        };
        for change in self.memory.sink_mut().take_history() {
            match change {
                ActivationEvent::Activated(activation) => outcome.activated.push(activation),
                ActivationEvent::Deactivated(activation) => outcome.deactivated.push(activation),
            }
        }
        if let Err(err) = result {
            warn!(step, id = %outcome.id, error = %err, "Event failed");
            outcome.error = Some(err.to_string());
        }
        debug!(
            step,
            activated = outcome.activated.len(),
            deactivated = outcome.deactivated.len(),
            "Event applied"
        );
        Ok(outcome)
    }

    fn handle(&self, id: &str) -> Result<FactHandle> {
        self.ids.get(id).copied().ok_or_else(|| anyhow!("Unknown fact id '{id}'"))
    }

    /// Convert JSON fields, coercing values to the declared kinds where possible
    fn build_fact(
        &self,
        fact_type: &str,
        fields: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Fact> {
        let mut fact = Fact::new(fact_type);
        let schema = self.memory.network().schemas().get(fact_type);
        for (name, raw) in fields {
            let value = FactValue::try_from(raw)
                .with_context(|| format!("Field '{fact_type}.{name}'"))?;
            let value = match schema.and_then(|schema| schema.field_kind(name)) {
                Some(kind) => value.coerce_to(kind).unwrap_or(value),
                None => value,
            };
            fact.set(name.clone(), value);
        }
        Ok(fact)
    }
}
