use crate::accessor::{Declaration, FactRef, FieldAccessor};
use crate::error::PropagationError;
use std::fmt;
use trellis_types::{Fact, ValueKey};

/// Composite hash key: one normalised value per indexed constraint, in declared order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexKey(Box<[ValueKey]>);

impl IndexKey {
    pub fn new(atoms: Vec<ValueKey>) -> Self {
        Self(atoms.into_boxed_slice())
    }

    pub fn atoms(&self) -> &[ValueKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, atom) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{atom:?}")?;
        }
        write!(f, ")")
    }
}

/// One component of a composite index: the left extractor reads the bound declaration
/// from a tuple, the right extractor reads the candidate fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    left: Declaration,
    right: FieldAccessor,
}

impl FieldIndex {
    pub fn new(left: Declaration, right: FieldAccessor) -> Self {
        Self { left, right }
    }

    pub fn left_extractor(&self) -> &Declaration {
        &self.left
    }

    pub fn right_extractor(&self) -> &FieldAccessor {
        &self.right
    }
}

/// Ordered list of [`FieldIndex`] components shared by both sides of a hashed memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeIndex {
    fields: Vec<FieldIndex>,
}

impl CompositeIndex {
    pub fn new(fields: Vec<FieldIndex>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_index(&self, position: usize) -> Option<&FieldIndex> {
        self.fields.get(position)
    }

    pub fn left_key(&self, tuple: &[FactRef<'_>]) -> Result<IndexKey, PropagationError> {
        let atoms = self
            .fields
            .iter()
            .map(|index| index.left.read(tuple).map(|value| value.key()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexKey::new(atoms))
    }

    pub fn right_key(&self, fact: &Fact) -> Result<IndexKey, PropagationError> {
        let atoms = self
            .fields
            .iter()
            .map(|index| index.right.read(fact).map(|value| value.key()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndexKey::new(atoms))
    }
}
