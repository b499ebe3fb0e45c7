#![allow(missing_docs)]
//! Core matching engine of the Trellis production-rule system.
//!
//! This crate compiles rule conditions into a RETE network of alpha and join nodes,
//! indexes join memories on composite equality keys, and keeps the set of full
//! matches current as facts are inserted, updated and deleted.

/// Field accessors and declarations
pub mod accessor;
/// Activations, the activation sink trait and the default activation log
pub mod activation;
/// Constraint ordering and composite key extraction for join nodes
pub mod beta_constraints;
/// Join propagation and per-session node memories
pub mod beta_network;
/// Network build configuration
pub mod config;
/// Alpha and beta constraints and their operators
pub mod constraint;
/// Per-node and per-session statistics
pub mod diagnostics;
/// Error types
pub mod error;
/// Fact storage addressed by handle
pub mod fact_store;
/// Hashed and linear tuple memories
pub mod memory;
/// Alpha node sharing during network build
pub mod node_sharing;
/// RETE network construction
pub mod rete_network;
/// Rule definitions accepted by the network compiler
pub mod rule;
/// Tuple arena with parent/child links
pub mod tuple;
/// Propagation controller for insert, update and delete
pub mod working_memory;

pub use activation::{Activation, ActivationEvent, ActivationLog, ActivationSink};
pub use beta_constraints::BetaConstraints;
pub use config::NetworkConfig;
pub use constraint::{AlphaPredicate, BetaPredicate, ConstraintOperator};
pub use diagnostics::{NetworkStats, NodeStats};
pub use error::{BuildError, ConsistencyError, PropagationError, TrellisError, TrellisResult};
pub use rete_network::{NodeId, ReteNetwork, RuleId};
pub use rule::{ConstraintDefinition, PatternDefinition, RuleDefinition};
pub use working_memory::{PropagationStats, WorkingMemory};

pub use trellis_types::{Fact, FactHandle, FactSchema, FactValue, SchemaRegistry, ValueKind};
