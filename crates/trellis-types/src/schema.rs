use crate::types::ValueKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Field layout of one fact type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSchema {
    /// Type tag this schema describes
    pub name: String,
    /// Declared kind per field name
    #[serde(default)]
    pub fields: BTreeMap<String, ValueKind>,
}

impl FactSchema {
    /// Create an empty schema for `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), fields: BTreeMap::new() }
    }

    /// Builder-style field declaration
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Declared kind of a field
    pub fn field_kind(&self, field: &str) -> Option<ValueKind> {
        self.fields.get(field).copied()
    }
}

/// Known fact types, keyed by type tag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaRegistry {
    types: HashMap<String, FactSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous one with the same name
    pub fn register(&mut self, schema: FactSchema) -> Option<FactSchema> {
        self.types.insert(schema.name.clone(), schema)
    }

    /// Builder-style registration
    #[must_use]
    pub fn with(mut self, schema: FactSchema) -> Self {
        self.register(schema);
        self
    }

    /// Look up a schema by type tag
    pub fn get(&self, fact_type: &str) -> Option<&FactSchema> {
        self.types.get(fact_type)
    }

    /// Declared kind of `fact_type.field`
    pub fn field_kind(&self, fact_type: &str, field: &str) -> Option<ValueKind> {
        self.get(fact_type).and_then(|schema| schema.field_kind(field))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<FactSchema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = FactSchema>>(iter: I) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}
