//! Field accessors and declarations
//!
//! A [`FieldAccessor`] is resolved once against a [`FactSchema`] while the network is
//! compiled and is then a pure function from a fact to one of its field values. A
//! [`Declaration`] is an accessor bound to a fact position inside a tuple, which is
//! how join constraints read values from facts matched by earlier patterns.

use crate::error::{BuildError, PropagationError};
use std::fmt;
use std::sync::Arc;
use trellis_types::{Fact, FactHandle, FactSchema, FactValue, ValueKind};

static NULL: FactValue = FactValue::Null;

/// A fact together with its handle, as seen by join evaluation
#[derive(Debug, Clone, Copy)]
pub struct FactRef<'a> {
    pub handle: FactHandle,
    pub fact: &'a Fact,
}

/// Reads one declared field of one fact type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAccessor {
    fact_type: Arc<str>,
    field: Arc<str>,
    kind: ValueKind,
}

impl FieldAccessor {
    /// Resolve `field` against a schema
    pub fn resolve(schema: &FactSchema, field: &str) -> Result<Self, BuildError> {
        let kind = schema.field_kind(field).ok_or_else(|| BuildError::UnknownField {
            fact_type: schema.name.clone(),
            field: field.to_string(),
        })?;
        Ok(Self { fact_type: Arc::from(schema.name.as_str()), field: Arc::from(field), kind })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Read the field. Absent fields read as null; a value of the wrong kind is an error.
    pub fn read<'f>(&self, fact: &'f Fact) -> Result<&'f FactValue, PropagationError> {
        if fact.fact_type.as_str() != &*self.fact_type {
            return Err(PropagationError::WrongFactType {
                field: self.field.to_string(),
                expected: self.fact_type.to_string(),
                actual: fact.fact_type.clone(),
            });
        }
        match fact.get(&self.field) {
            None => Ok(&NULL),
            Some(value) if self.kind.accepts(value) => Ok(value),
            Some(value) => Err(PropagationError::FieldTypeMismatch {
                fact_type: self.fact_type.to_string(),
                field: self.field.to_string(),
                expected: self.kind,
                actual: value.type_name(),
            }),
        }
    }
}

impl fmt::Display for FieldAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.fact_type, self.field)
    }
}

/// A named binding that reads a field from the fact at a fixed tuple position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Declaration {
    identifier: Arc<str>,
    pattern: usize,
    accessor: FieldAccessor,
}

impl Declaration {
    pub fn new(identifier: impl Into<Arc<str>>, pattern: usize, accessor: FieldAccessor) -> Self {
        Self { identifier: identifier.into(), pattern, accessor }
    }

    /// Binding name of the pattern this declaration reads from
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Index of the pattern (tuple position) this declaration reads from
    pub fn pattern(&self) -> usize {
        self.pattern
    }

    pub fn accessor(&self) -> &FieldAccessor {
        &self.accessor
    }

    /// Read the declared field from the matching tuple position
    pub fn read<'a>(&self, tuple: &[FactRef<'a>]) -> Result<&'a FactValue, PropagationError> {
        match tuple.get(self.pattern) {
            Some(fact_ref) => self.accessor.read(fact_ref.fact),
            None => {
                debug_assert!(false, "declaration {} read past tuple end", self.identifier);
                Ok(&NULL)
            }
        }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.identifier, self.accessor.field)
    }
}
