//! Constraint operators and compiled alpha/beta constraints
//!
//! All comparisons are null-safe: null equals null, null is unequal to every other
//! value, and null never satisfies an ordering operator.

use crate::accessor::{Declaration, FactRef, FieldAccessor};
use crate::error::PropagationError;
use crate::node_sharing::AlphaNodeSignature;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use trellis_types::{Fact, FactValue};

/// Comparison operators usable in alpha and beta constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintOperator {
    #[serde(rename = "==", alias = "equal")]
    Equal,
    #[serde(rename = "!=", alias = "not_equal")]
    NotEqual,
    #[serde(rename = ">", alias = "greater")]
    Greater,
    #[serde(rename = ">=", alias = "greater_or_equal")]
    GreaterOrEqual,
    #[serde(rename = "<", alias = "less")]
    Less,
    #[serde(rename = "<=", alias = "less_or_equal")]
    LessOrEqual,
}

impl ConstraintOperator {
    pub const ALL: [ConstraintOperator; 6] = [
        ConstraintOperator::Equal,
        ConstraintOperator::NotEqual,
        ConstraintOperator::Greater,
        ConstraintOperator::GreaterOrEqual,
        ConstraintOperator::Less,
        ConstraintOperator::LessOrEqual,
    ];

    /// Evaluate `left <op> right`
    pub fn evaluate(self, left: &FactValue, right: &FactValue) -> bool {
        match self {
            ConstraintOperator::Equal => left.null_safe_eq(right),
            ConstraintOperator::NotEqual => !left.null_safe_eq(right),
            ConstraintOperator::Greater => left.compare(right) == Some(Ordering::Greater),
            ConstraintOperator::GreaterOrEqual => {
                matches!(left.compare(right), Some(Ordering::Greater | Ordering::Equal))
            }
            ConstraintOperator::Less => left.compare(right) == Some(Ordering::Less),
            ConstraintOperator::LessOrEqual => {
                matches!(left.compare(right), Some(Ordering::Less | Ordering::Equal))
            }
        }
    }

    /// Whether the operator needs an ordered operand kind
    pub fn is_ordering(self) -> bool {
        !matches!(self, ConstraintOperator::Equal | ConstraintOperator::NotEqual)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ConstraintOperator::Equal => "==",
            ConstraintOperator::NotEqual => "!=",
            ConstraintOperator::Greater => ">",
            ConstraintOperator::GreaterOrEqual => ">=",
            ConstraintOperator::Less => "<",
            ConstraintOperator::LessOrEqual => "<=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

impl fmt::Display for ConstraintOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Opaque single-value test, e.g. a host-language lambda over one field
#[derive(Clone)]
pub struct AlphaPredicate {
    name: Arc<str>,
    test: Arc<dyn Fn(&FactValue) -> bool + Send + Sync>,
}

impl AlphaPredicate {
    pub fn new(
        name: impl Into<Arc<str>>,
        test: impl Fn(&FactValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), test: Arc::new(test) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, value: &FactValue) -> bool {
        (self.test)(value)
    }
}

impl fmt::Debug for AlphaPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AlphaPredicate").field(&self.name).finish()
    }
}

/// Opaque two-value test: `(candidate field value, declaration value)`
#[derive(Clone)]
pub struct BetaPredicate {
    name: Arc<str>,
    test: Arc<dyn Fn(&FactValue, &FactValue) -> bool + Send + Sync>,
}

impl BetaPredicate {
    pub fn new(
        name: impl Into<Arc<str>>,
        test: impl Fn(&FactValue, &FactValue) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { name: name.into(), test: Arc::new(test) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, candidate: &FactValue, bound: &FactValue) -> bool {
        (self.test)(candidate, bound)
    }
}

impl fmt::Debug for BetaPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BetaPredicate").field(&self.name).finish()
    }
}

/// A test over a single fact, evaluated by an alpha node
#[derive(Debug, Clone)]
pub enum AlphaConstraint {
    Literal { accessor: FieldAccessor, operator: ConstraintOperator, value: FactValue },
    Predicate { accessor: FieldAccessor, predicate: AlphaPredicate },
}

impl AlphaConstraint {
    pub fn accessor(&self) -> &FieldAccessor {
        match self {
            AlphaConstraint::Literal { accessor, .. }
            | AlphaConstraint::Predicate { accessor, .. } => accessor,
        }
    }

    pub fn is_allowed(&self, fact: &Fact) -> Result<bool, PropagationError> {
        match self {
            AlphaConstraint::Literal { accessor, operator, value } => {
                Ok(operator.evaluate(accessor.read(fact)?, value))
            }
            AlphaConstraint::Predicate { accessor, predicate } => {
                Ok(predicate.test(accessor.read(fact)?))
            }
        }
    }

    /// Sharing key; opaque predicates are never shared
    pub fn signature(&self) -> Option<AlphaNodeSignature> {
        match self {
            AlphaConstraint::Literal { accessor, operator, value } => {
                Some(AlphaNodeSignature::new(accessor.clone(), *operator, value.key()))
            }
            AlphaConstraint::Predicate { .. } => None,
        }
    }
}

impl fmt::Display for AlphaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlphaConstraint::Literal { accessor, operator, value } => {
                write!(f, "{} {operator} {value}", accessor.field())
            }
            AlphaConstraint::Predicate { accessor, predicate } => {
                write!(f, "{}({})", predicate.name(), accessor.field())
            }
        }
    }
}

/// A test between the candidate fact of a join and a value bound by an earlier pattern
#[derive(Debug, Clone)]
pub enum BetaConstraint {
    /// `candidate.field <operator> declaration`
    Compare { accessor: FieldAccessor, operator: ConstraintOperator, declaration: Declaration },
    /// `predicate(candidate.field, declaration)`, never indexable
    Predicate { accessor: FieldAccessor, declaration: Declaration, predicate: BetaPredicate },
}

impl BetaConstraint {
    /// Equality between two plain field extractions, so both sides can be hashed
    pub fn is_indexable(&self) -> bool {
        matches!(self, BetaConstraint::Compare { operator: ConstraintOperator::Equal, .. })
    }

    /// Declaration read from the left tuple
    pub fn required_declaration(&self) -> &Declaration {
        match self {
            BetaConstraint::Compare { declaration, .. }
            | BetaConstraint::Predicate { declaration, .. } => declaration,
        }
    }

    /// Accessor applied to the right-input fact
    pub fn field_extractor(&self) -> &FieldAccessor {
        match self {
            BetaConstraint::Compare { accessor, .. }
            | BetaConstraint::Predicate { accessor, .. } => accessor,
        }
    }

    pub fn is_allowed(&self, tuple: &[FactRef<'_>], fact: &Fact) -> Result<bool, PropagationError> {
        let candidate = self.field_extractor().read(fact)?;
        let bound = self.required_declaration().read(tuple)?;
        Ok(match self {
            BetaConstraint::Compare { operator, .. } => operator.evaluate(candidate, bound),
            BetaConstraint::Predicate { predicate, .. } => predicate.test(candidate, bound),
        })
    }
}

impl fmt::Display for BetaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetaConstraint::Compare { accessor, operator, declaration } => {
                write!(f, "{} {operator} {declaration}", accessor.field())
            }
            BetaConstraint::Predicate { accessor, declaration, predicate } => {
                write!(f, "{}({}, {declaration})", predicate.name(), accessor.field())
            }
        }
    }
}
