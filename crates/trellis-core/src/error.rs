//! Error handling for the Trellis matching network
//!
//! Errors fall into three kinds with different lifetimes:
//!
//! * [`BuildError`] - the rule set or configuration is malformed. Raised while
//!   compiling the network, never at runtime.
//! * [`PropagationError`] - a field accessor failed while an event was being
//!   propagated. Returned from the working-memory call that triggered it.
//! * [`ConsistencyError`] - the caller referred to a fact handle the working memory
//!   does not know, or reused one. No memory bucket is touched.

use crate::rete_network::NodeId;
use std::fmt;
use thiserror::Error;
use trellis_types::{FactHandle, ValueKind};

/// Top-level error type for network construction and working-memory operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    /// The network could not be built
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// An event could not be fully propagated
    #[error("Propagation error at node {node} for fact {handle}: {source}")]
    Propagation { handle: FactHandle, node: NodeId, source: PropagationError },

    /// A fact handle was unknown, stale or duplicated
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),
}

/// Rule set or configuration problems detected while compiling the network
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("rule '{rule}' has no patterns")]
    EmptyRule { rule: String },

    #[error("rule name '{rule}' is used more than once")]
    DuplicateRule { rule: String },

    #[error("rule '{rule}' refers to unknown fact type '{fact_type}'")]
    UnknownFactType { rule: String, fact_type: String },

    #[error("fact type '{fact_type}' has no field '{field}'")]
    UnknownField { fact_type: String, field: String },

    #[error(
        "rule '{rule}' pattern {pattern} refers to declaration '{declaration}' which is not bound by an earlier pattern"
    )]
    UnboundDeclaration { rule: String, pattern: usize, declaration: String },

    #[error("rule '{rule}' binds declaration '{declaration}' more than once")]
    DuplicateDeclaration { rule: String, declaration: String },

    #[error("operator '{operator}' is not supported for {kind} field '{field}'")]
    UnsupportedOperator { field: String, operator: String, kind: ValueKind },

    #[error("literal {literal} cannot be compared with {kind} field '{field}'")]
    LiteralTypeMismatch { field: String, literal: String, kind: ValueKind },

    #[error("{left_kind} field '{left}' cannot be compared with {right_kind} field '{right}'")]
    OperandTypeMismatch { left: String, left_kind: ValueKind, right: String, right_kind: ValueKind },

    #[error("invalid configuration for '{setting}': {message}")]
    InvalidConfig { setting: String, message: String },
}

/// Field access failures raised while propagating an event
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("field '{field}' of {fact_type} holds a {actual} value, declared {expected}")]
    FieldTypeMismatch { fact_type: String, field: String, expected: ValueKind, actual: &'static str },

    #[error("accessor for {expected}.{field} applied to a {actual} fact")]
    WrongFactType { field: String, expected: String, actual: String },
}

/// Working-memory bookkeeping violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("fact handle {0} is not present in working memory")]
    UnknownHandle(FactHandle),

    #[error("fact handle {0} is already live in working memory")]
    DuplicateHandle(FactHandle),

    #[error("fact handle {handle} is not greater than the last issued handle {last}")]
    StaleHandle { handle: FactHandle, last: FactHandle },

    #[error("node {node} has no memory entry for fact {handle}")]
    MissingMemoryEntry { node: NodeId, handle: FactHandle },

    #[error("hashed memory of node {node} was given no key while propagating fact {handle}")]
    MissingIndexKey { node: NodeId, handle: FactHandle },
}

impl TrellisError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TrellisError::Build(_) => "build",
            TrellisError::Propagation { .. } => "propagation",
            TrellisError::Consistency(_) => "consistency",
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrellisError::Build(BuildError::InvalidConfig { .. }) => ErrorSeverity::Critical,
            TrellisError::Build(_) => ErrorSeverity::High,
            TrellisError::Propagation { .. } => ErrorSeverity::Medium,
            TrellisError::Consistency(
                ConsistencyError::MissingMemoryEntry { .. } | ConsistencyError::MissingIndexKey { .. },
            ) => ErrorSeverity::Critical,
            TrellisError::Consistency(_) => ErrorSeverity::Low,
        }
    }

    /// Check if the working memory can keep processing events after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            TrellisError::Build(_) => false, // No network was produced
            TrellisError::Propagation { .. } => true,
            TrellisError::Consistency(
                ConsistencyError::MissingMemoryEntry { .. } | ConsistencyError::MissingIndexKey { .. },
            ) => false,
            TrellisError::Consistency(_) => true,
        }
    }

    /// Fact handle the error refers to, when there is one
    pub fn handle(&self) -> Option<FactHandle> {
        match self {
            TrellisError::Build(_) => None,
            TrellisError::Propagation { handle, .. } => Some(*handle),
            TrellisError::Consistency(
                ConsistencyError::UnknownHandle(handle)
                | ConsistencyError::DuplicateHandle(handle)
                | ConsistencyError::StaleHandle { handle, .. }
                | ConsistencyError::MissingMemoryEntry { handle, .. }
                | ConsistencyError::MissingIndexKey { handle, .. },
            ) => Some(*handle),
        }
    }
}

/// Error severity levels for logging and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "LOW"),
            ErrorSeverity::Medium => write!(f, "MEDIUM"),
            ErrorSeverity::High => write!(f, "HIGH"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Result type alias for network operations
pub type TrellisResult<T> = Result<T, TrellisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let build: TrellisError =
            BuildError::EmptyRule { rule: "r".to_string() }.into();
        assert_eq!(build.category(), "build");
        assert!(!build.is_recoverable());
        assert_eq!(build.handle(), None);

        let unknown: TrellisError = ConsistencyError::UnknownHandle(FactHandle(7)).into();
        assert_eq!(unknown.category(), "consistency");
        assert_eq!(unknown.severity(), ErrorSeverity::Low);
        assert!(unknown.is_recoverable());
        assert_eq!(unknown.handle(), Some(FactHandle(7)));

        let propagation = TrellisError::Propagation {
            handle: FactHandle(3),
            node: NodeId(4),
            source: PropagationError::FieldTypeMismatch {
                fact_type: "Order".to_string(),
                field: "amount".to_string(),
                expected: ValueKind::Float,
                actual: "string",
            },
        };
        assert!(propagation.is_recoverable());
        assert!(propagation.to_string().contains("amount"));
        assert!(propagation.to_string().contains("#3"));
    }
}
