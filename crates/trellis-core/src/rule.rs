//! Rule definitions consumed by the network compiler
//!
//! These are the already-parsed conditions of a rule set: an ordered list of patterns
//! per rule, each with a fact type, an optional binding name, and constraints. They
//! are `serde`-friendly so rule sets can be kept in YAML or JSON. Opaque predicates
//! can only be attached in code and are skipped by serialisation.

use crate::constraint::{AlphaPredicate, BetaPredicate, ConstraintOperator};
use serde::{Deserialize, Serialize};
use trellis_types::FactValue;

/// A named rule condition: an ordered list of patterns joined left to right
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,
}

impl RuleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), patterns: Vec::new() }
    }

    #[must_use]
    pub fn pattern(mut self, pattern: PatternDefinition) -> Self {
        self.patterns.push(pattern);
        self
    }
}

/// One pattern: a fact type filter plus constraints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub fact_type: String,
    /// Name later patterns use to refer to this pattern's fact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<String>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDefinition>,
}

/// A constraint as written in a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintDefinition {
    /// `field <operator> value`
    Literal { field: String, operator: ConstraintOperator, value: FactValue },
    /// `field <operator> declaration.declaration_field`
    Join { field: String, operator: ConstraintOperator, declaration: String, declaration_field: String },
    #[serde(skip)]
    AlphaPredicate { field: String, predicate: AlphaPredicate },
    #[serde(skip)]
    JoinPredicate {
        field: String,
        declaration: String,
        declaration_field: String,
        predicate: BetaPredicate,
    },
}

impl ConstraintDefinition {
    /// Field of the pattern's own fact this constraint reads
    pub fn field(&self) -> &str {
        match self {
            ConstraintDefinition::Literal { field, .. }
            | ConstraintDefinition::Join { field, .. }
            | ConstraintDefinition::AlphaPredicate { field, .. }
            | ConstraintDefinition::JoinPredicate { field, .. } => field,
        }
    }
}

impl PatternDefinition {
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self { fact_type: fact_type.into(), binding: None, constraints: Vec::new() }
    }

    #[must_use]
    pub fn bind(mut self, binding: impl Into<String>) -> Self {
        self.binding = Some(binding.into());
        self
    }

    /// `field <operator> value`
    #[must_use]
    pub fn literal(
        mut self,
        field: impl Into<String>,
        operator: ConstraintOperator,
        value: impl Into<FactValue>,
    ) -> Self {
        self.constraints.push(ConstraintDefinition::Literal {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// `field <operator> declaration.declaration_field`
    #[must_use]
    pub fn join(
        mut self,
        field: impl Into<String>,
        operator: ConstraintOperator,
        declaration: impl Into<String>,
        declaration_field: impl Into<String>,
    ) -> Self {
        self.constraints.push(ConstraintDefinition::Join {
            field: field.into(),
            operator,
            declaration: declaration.into(),
            declaration_field: declaration_field.into(),
        });
        self
    }

    #[must_use]
    pub fn alpha_predicate(mut self, field: impl Into<String>, predicate: AlphaPredicate) -> Self {
        self.constraints
            .push(ConstraintDefinition::AlphaPredicate { field: field.into(), predicate });
        self
    }

    #[must_use]
    pub fn join_predicate(
        mut self,
        field: impl Into<String>,
        declaration: impl Into<String>,
        declaration_field: impl Into<String>,
        predicate: BetaPredicate,
    ) -> Self {
        self.constraints.push(ConstraintDefinition::JoinPredicate {
            field: field.into(),
            declaration: declaration.into(),
            declaration_field: declaration_field.into(),
            predicate,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_from_yaml() {
        let yaml = r#"
name: big-order-customer
patterns:
  - fact_type: Order
    binding: o
    constraints:
      - { kind: literal, field: amount, operator: ">", value: 100 }
  - fact_type: Customer
    constraints:
      - { kind: join, field: id, operator: "==", declaration: o, declaration_field: customerId }
"#;
        let rule: RuleDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.patterns.len(), 2);
        assert_eq!(rule.patterns[0].binding.as_deref(), Some("o"));
        match &rule.patterns[0].constraints[0] {
            ConstraintDefinition::Literal { operator, value, .. } => {
                assert_eq!(*operator, ConstraintOperator::Greater);
                assert_eq!(*value, FactValue::Integer(100));
            }
            other => panic!("unexpected constraint {other:?}"),
        }
        assert_eq!(rule.patterns[1].constraints[0].field(), "id");
    }

    #[test]
    fn test_builder_serialises_without_predicates() {
        let rule = RuleDefinition::new("r").pattern(
            PatternDefinition::new("Item").bind("i").literal("code", ConstraintOperator::Equal, "X"),
        );
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains(r#""kind":"literal""#));
        assert!(json.contains(r#""value":"X""#));

        let with_predicate = RuleDefinition::new("p").pattern(
            PatternDefinition::new("Item")
                .alpha_predicate("code", AlphaPredicate::new("non_empty", |v| !v.is_null())),
        );
        assert!(serde_json::to_string(&with_predicate).is_err());
    }
}
