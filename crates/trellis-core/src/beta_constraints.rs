//! Beta constraints and the join indexing strategy
//!
//! A join node's constraints are split once, when the network is built:
//!
//! ```text
//!   declared:  [ a == $x.a , b == $y.b , c >= $x.c , d == $y.d ]
//!                └──────── key ───────┘  └──── filters ─────┘
//!                index_count = 2         evaluated in declared order
//! ```
//!
//! The key is the leading contiguous run of indexable equality constraints, truncated
//! to the configured composite key depth. Scanning stops at the first constraint that
//! cannot be indexed, so `d == $y.d` above stays a filter: constraints are never
//! reordered. When the key is non-empty both sides of the join memory are hashed on
//! it; otherwise both sides are linear lists and every constraint is a filter.

use crate::accessor::FactRef;
use crate::constraint::BetaConstraint;
use crate::error::PropagationError;
use crate::memory::{BetaMemory, CompositeIndex, FieldIndex, IndexKey, MemoryKind};
use std::fmt;
use trellis_types::Fact;

/// Ordered constraints of one join together with the index chosen for them
#[derive(Debug, Clone)]
pub struct BetaConstraints {
    constraints: Vec<BetaConstraint>,
    index: CompositeIndex,
}

impl BetaConstraints {
    /// Select the key prefix for `constraints` under the given depth
    pub fn new(constraints: Vec<BetaConstraint>, composite_key_depth: usize) -> Self {
        let index = CompositeIndex::new(
            constraints
                .iter()
                .take_while(|constraint| constraint.is_indexable())
                .take(composite_key_depth)
                .map(|constraint| {
                    FieldIndex::new(
                        constraint.required_declaration().clone(),
                        constraint.field_extractor().clone(),
                    )
                })
                .collect(),
        );
        Self { constraints, index }
    }

    /// A cross-product join with nothing to test
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether any constraint participates in a hash key
    pub fn is_indexed(&self) -> bool {
        !self.index.is_empty()
    }

    /// Number of constraints folded into the key
    pub fn index_count(&self) -> usize {
        self.index.len()
    }

    /// The `position`-th key component
    pub fn field_index(&self, position: usize) -> Option<&FieldIndex> {
        self.index.field_index(position)
    }

    /// Constraints evaluated after the index lookup
    pub fn filters(&self) -> &[BetaConstraint] {
        &self.constraints[self.index_count()..]
    }

    pub fn memory_kind(&self) -> MemoryKind {
        if self.is_indexed() { MemoryKind::Hashed } else { MemoryKind::Linear }
    }

    /// Fresh left/right memory pair matching the indexing decision
    pub fn create_memory(&self) -> BetaMemory {
        BetaMemory::new(self.memory_kind())
    }

    /// Key of a left tuple, `None` when unindexed
    pub fn left_key(&self, tuple: &[FactRef<'_>]) -> Result<Option<IndexKey>, PropagationError> {
        if !self.is_indexed() {
            return Ok(None);
        }
        self.index.left_key(tuple).map(Some)
    }

    /// Key of a right fact, `None` when unindexed
    pub fn right_key(&self, fact: &Fact) -> Result<Option<IndexKey>, PropagationError> {
        if !self.is_indexed() {
            return Ok(None);
        }
        self.index.right_key(fact).map(Some)
    }

    /// Evaluate the filters for a tuple/fact pair already matched on the key.
    /// Stops at the first failing constraint.
    pub fn is_allowed(&self, tuple: &[FactRef<'_>], fact: &Fact) -> Result<bool, PropagationError> {
        for constraint in self.filters() {
            if !constraint.is_allowed(tuple, fact)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for BetaConstraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, constraint) in self.constraints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if i < self.index_count() {
                write!(f, "#{constraint}")?;
            } else {
                write!(f, "{constraint}")?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::{Declaration, FieldAccessor};
    use crate::constraint::{BetaPredicate, ConstraintOperator};
    use trellis_types::{FactHandle, FactSchema, FactValue, ValueKind};

    fn schema() -> FactSchema {
        FactSchema::new("Cheese")
            .field("type", ValueKind::String)
            .field("price", ValueKind::Integer)
            .field("age", ValueKind::Integer)
            .field("origin", ValueKind::String)
    }

    fn compare(field: &str, operator: ConstraintOperator) -> BetaConstraint {
        let accessor = FieldAccessor::resolve(&schema(), field).unwrap();
        BetaConstraint::Compare {
            accessor: accessor.clone(),
            operator,
            declaration: Declaration::new("$c", 0, accessor),
        }
    }

    fn lambda(field: &str) -> BetaConstraint {
        let accessor = FieldAccessor::resolve(&schema(), field).unwrap();
        BetaConstraint::Predicate {
            accessor: accessor.clone(),
            declaration: Declaration::new("$c", 0, accessor),
            predicate: BetaPredicate::new("eq", |a, b| a.null_safe_eq(b)),
        }
    }

    use crate::constraint::ConstraintOperator::{Equal, Greater, NotEqual};

    #[test]
    fn test_prefix_selection() {
        let constraints = BetaConstraints::new(
            vec![compare("type", Equal), compare("price", Equal), compare("age", Greater)],
            3,
        );
        assert!(constraints.is_indexed());
        assert_eq!(constraints.index_count(), 2);
        assert_eq!(constraints.filters().len(), 1);
        assert_eq!(constraints.memory_kind(), MemoryKind::Hashed);
    }

    #[test]
    fn test_scan_stops_at_first_unindexable() {
        let constraints = BetaConstraints::new(
            vec![compare("type", Equal), compare("age", NotEqual), compare("price", Equal)],
            3,
        );
        assert_eq!(constraints.index_count(), 1);

        let leading_filter =
            BetaConstraints::new(vec![compare("age", NotEqual), compare("type", Equal)], 3);
        assert!(!leading_filter.is_indexed());
        assert_eq!(leading_filter.memory_kind(), MemoryKind::Linear);

        let leading_lambda = BetaConstraints::new(vec![lambda("type"), compare("type", Equal)], 3);
        assert_eq!(leading_lambda.index_count(), 0);
    }

    #[test]
    fn test_depth_truncates_key() {
        let all_equal = vec![
            compare("type", Equal),
            compare("price", Equal),
            compare("age", Equal),
            compare("origin", Equal),
        ];
        for depth in 0..=3 {
            let constraints = BetaConstraints::new(all_equal.clone(), depth);
            assert_eq!(constraints.index_count(), depth);
            assert_eq!(constraints.is_indexed(), depth > 0);
        }
        assert_eq!(BetaConstraints::empty().index_count(), 0);
    }

    #[test]
    fn test_keys_and_filters() {
        let constraints =
            BetaConstraints::new(vec![compare("type", Equal), compare("age", Greater)], 3);
        let left = Fact::new("Cheese").with("type", "brie").with("age", 3);
        let tuple = [FactRef { handle: FactHandle(1), fact: &left }];
        let older = Fact::new("Cheese").with("type", "brie").with("age", 5);
        let younger = Fact::new("Cheese").with("type", "brie").with("age", 1);

        let left_key = constraints.left_key(&tuple).unwrap();
        assert_eq!(left_key, constraints.right_key(&older).unwrap());
        assert_eq!(
            left_key.as_ref().map(|k| k.atoms().to_vec()),
            Some(vec![FactValue::String("brie".into()).key()])
        );
        assert!(constraints.is_allowed(&tuple, &older).unwrap());
        assert!(!constraints.is_allowed(&tuple, &younger).unwrap());
        assert_eq!(constraints.to_string(), "[#type == $c.type, age > $c.age]");
    }
}
