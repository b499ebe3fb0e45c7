use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

/// Possible values that can be stored in a fact field
///
/// Serialised untagged so rule and scenario files can write plain literals. Dates
/// therefore read back as strings; the network compiler coerces string literals for
/// date fields using the field's declared [`ValueKind`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FactValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// UTC date/time value
    Date(DateTime<Utc>),
}

/// Declared kind of a fact field. Null is a value, not a kind: any field may hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float; integer values are accepted too
    Float,
    /// Boolean; supports equality operators only
    Boolean,
    /// UTC timestamp
    Date,
}

impl ValueKind {
    /// Whether a runtime value may be stored in a field of this kind
    pub fn accepts(self, value: &FactValue) -> bool {
        matches!(
            (self, value),
            (_, FactValue::Null)
                | (Self::String, FactValue::String(_))
                | (Self::Integer, FactValue::Integer(_))
                | (Self::Float, FactValue::Float(_) | FactValue::Integer(_))
                | (Self::Boolean, FactValue::Boolean(_))
                | (Self::Date, FactValue::Date(_))
        )
    }

    /// Whether `<`, `<=`, `>` and `>=` are meaningful for this kind
    pub fn is_ordered(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Whether values of the two kinds can be compared with each other
    pub fn is_comparable_with(self, other: Self) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// Integer or float
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Lower-case name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Normalised, hashable form of a [`FactValue`].
///
/// Two values produce equal keys exactly when they are null-safe equal: null equals
/// null, integral floats equal the matching integer, `-0.0` equals `0.0` and every NaN
/// equals every other NaN. Hash indexes rely on this agreeing with `==` constraints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// Integer, or a float with an exact integer value
    Integer(i64),
    /// Bit pattern of a non-integral float
    Float(u64),
    /// String
    String(String),
    /// Seconds and nanoseconds since the epoch
    Date(i64, u32),
}

const CANONICAL_NAN_BITS: u64 = 0x7ff8_0000_0000_0000;

// 2^63 as f64; the smallest float that no longer fits in an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl FactValue {
    /// Declared kind this value belongs to, `None` for null
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(ValueKind::Boolean),
            Self::Integer(_) => Some(ValueKind::Integer),
            Self::Float(_) => Some(ValueKind::Float),
            Self::String(_) => Some(ValueKind::String),
            Self::Date(_) => Some(ValueKind::Date),
        }
    }

    /// Name of the runtime variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        self.kind().map_or("null", ValueKind::name)
    }

    /// Whether this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Normalised equality key
    #[allow(clippy::cast_possible_truncation)]
    pub fn key(&self) -> ValueKey {
        match self {
            Self::Null => ValueKey::Null,
            Self::Boolean(b) => ValueKey::Boolean(*b),
            Self::Integer(i) => ValueKey::Integer(*i),
            Self::Float(f) if f.is_nan() => ValueKey::Float(CANONICAL_NAN_BITS),
            Self::Float(f) if f.fract() == 0.0 && *f >= -I64_BOUND && *f < I64_BOUND => {
                ValueKey::Integer(*f as i64)
            }
            Self::Float(f) => ValueKey::Float(f.to_bits()),
            Self::String(s) => ValueKey::String(s.clone()),
            Self::Date(d) => ValueKey::Date(d.timestamp(), d.timestamp_subsec_nanos()),
        }
    }

    /// Null-safe equality: null equals null and nothing else
    pub fn null_safe_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            _ => self.key() == other.key(),
        }
    }

    /// Null-safe equality that also requires both values to be of the same kind, so
    /// `7` and `7.0` differ here while `==` constraints treat them as equal.
    pub fn is_identical(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.key() == other.key()
    }

    /// Ordering used by the relational operators.
    ///
    /// `None` when either side is null, for booleans, for NaN and for values of
    /// unrelated kinds; such comparisons never satisfy an ordering operator.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Integer(a), Self::Float(b)) => compare_integer_float(*a, *b),
            (Self::Float(a), Self::Integer(b)) => {
                compare_integer_float(*b, *a).map(Ordering::reverse)
            }
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Convert a literal to the representation expected by a field of `kind`.
    ///
    /// Integers are kept as-is for float fields since they compare numerically, and
    /// RFC 3339 strings are parsed for date fields. Returns `None` when the literal
    /// cannot stand for a value of that kind.
    pub fn coerce_to(&self, kind: ValueKind) -> Option<Self> {
        if kind.accepts(self) {
            return Some(self.clone());
        }
        match (kind, self) {
            (ValueKind::Date, Self::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|d| Self::Date(d.with_timezone(&Utc))),
            _ => None,
        }
    }
}

/// Exact ordering of an integer against a float, without rounding the integer.
#[allow(clippy::cast_possible_truncation)]
fn compare_integer_float(integer: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if float < -I64_BOUND {
        return Some(Ordering::Greater);
    }
    // In range, the integral part converts exactly.
    let whole = float.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        ordering => Some(ordering),
    }
}

impl From<i64> for FactValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FactValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FactValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FactValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FactValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FactValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<DateTime<Utc>> for FactValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<FactValue>> From<Option<T>> for FactValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

// -------------------------------------------------------------------------------------------------
// Conversions between `FactValue` and `serde_json::Value`, used by the scenario loader.
// -------------------------------------------------------------------------------------------------

impl From<&FactValue> for serde_json::Value {
    fn from(value: &FactValue) -> Self {
        match value {
            FactValue::String(s) => Self::String(s.clone()),
            FactValue::Integer(i) => Self::Number(serde_json::Number::from(*i)),
            FactValue::Float(f) => {
                serde_json::Number::from_f64(*f).map_or(Self::Null, Self::Number)
            }
            FactValue::Boolean(b) => Self::Bool(*b),
            FactValue::Date(dt) => Self::String(dt.to_rfc3339()),
            FactValue::Null => Self::Null,
        }
    }
}

impl TryFrom<&serde_json::Value> for FactValue {
    type Error = anyhow::Error;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        Ok(match value {
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Self::Float(f)
                } else {
                    return Err(anyhow!("Unsupported number value: {}", n));
                }
            }
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(anyhow!("Nested values are not supported as fact fields: {}", value));
            }
        })
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(fl) => write!(f, "{fl}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Stable identity of a fact inside one working memory.
///
/// Handles are assigned in strictly increasing order and never reused, so they double
/// as an insertion sequence number. They need not be contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactHandle(pub u64);

impl FactHandle {
    /// Raw numeric identity
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed record of named field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Type tag matched by object-type nodes
    pub fact_type: String,
    /// Field values by name; absent fields read as null
    #[serde(default)]
    pub fields: HashMap<String, FactValue>,
}

impl Fact {
    /// Create a fact of the given type with no fields
    pub fn new(fact_type: impl Into<String>) -> Self {
        Self { fact_type: fact_type.into(), fields: HashMap::new() }
    }

    /// Builder-style field assignment
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set a field, returning the previous value
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<FactValue>) -> Option<FactValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Raw field lookup
    pub fn get(&self, field: &str) -> Option<&FactValue> {
        self.fields.get(field)
    }

    /// Names of fields whose values differ between `self` and `other`. A change of
    /// value kind counts even when the values compare equal; a field missing on one
    /// side counts as null there.
    pub fn changed_fields<'a>(&'a self, other: &'a Self) -> Vec<&'a str> {
        let null = FactValue::Null;
        let mut changed: Vec<&str> = self
            .fields
            .iter()
            .filter(|(name, value)| !value.is_identical(other.fields.get(*name).unwrap_or(&null)))
            .map(|(name, _)| name.as_str())
            .collect();
        changed.extend(
            other
                .fields
                .iter()
                .filter(|(name, value)| !self.fields.contains_key(*name) && !value.is_null())
                .map(|(name, _)| name.as_str()),
        );
        changed.sort_unstable();
        changed
    }

    /// Build a fact from a JSON object of field values
    pub fn from_json(fact_type: impl Into<String>, value: &serde_json::Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow!("Fact fields must be a JSON object, got {}", value))?;
        let mut fact = Self::new(fact_type);
        for (name, raw) in object {
            fact.fields.insert(name.clone(), FactValue::try_from(raw)?);
        }
        Ok(fact)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.fields.keys().collect();
        names.sort();
        write!(f, "{} {{", self.fact_type)?;
        for (i, name) in names.into_iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {name}: {}", self.fields[name])?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_safe_equality() {
        assert!(FactValue::Null.null_safe_eq(&FactValue::Null));
        assert!(!FactValue::Null.null_safe_eq(&FactValue::Integer(0)));
        assert!(!FactValue::String(String::new()).null_safe_eq(&FactValue::Null));
        assert!(FactValue::Integer(5).null_safe_eq(&FactValue::Float(5.0)));
        assert!(!FactValue::Integer(5).null_safe_eq(&FactValue::String("5".into())));
    }

    #[test]
    fn test_key_normalisation_agrees_with_equality() {
        assert_eq!(FactValue::Float(-0.0).key(), FactValue::Float(0.0).key());
        assert_eq!(FactValue::Float(f64::NAN).key(), FactValue::Float(-f64::NAN).key());
        assert_eq!(FactValue::Float(42.0).key(), FactValue::Integer(42).key());
        assert_ne!(FactValue::Float(42.5).key(), FactValue::Integer(42).key());
        assert_ne!(FactValue::Boolean(true).key(), FactValue::Integer(1).key());
        assert_eq!(FactValue::Null.key(), ValueKey::Null);
    }

    #[test]
    fn test_compare_null_and_boolean_are_unordered() {
        assert_eq!(FactValue::Null.compare(&FactValue::Null), None);
        assert_eq!(FactValue::Integer(1).compare(&FactValue::Null), None);
        assert_eq!(FactValue::Boolean(true).compare(&FactValue::Boolean(false)), None);
        assert_eq!(FactValue::Integer(2).compare(&FactValue::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(
            FactValue::String("a".into()).compare(&FactValue::String("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_integer_float_ordering_is_exact() {
        let big = FactValue::Integer((1 << 53) + 1);
        let float = FactValue::Float(9_007_199_254_740_992.0);
        assert_eq!(big.compare(&float), Some(Ordering::Greater));
        assert_eq!(float.compare(&big), Some(Ordering::Less));
        assert!(!big.null_safe_eq(&float));

        let cases = [
            (2, 2.0, Some(Ordering::Equal)),
            (0, -0.0, Some(Ordering::Equal)),
            (-3, -2.5, Some(Ordering::Less)),
            (-2, -2.5, Some(Ordering::Greater)),
            (i64::MAX, I64_BOUND, Some(Ordering::Less)),
            (i64::MIN, -I64_BOUND, Some(Ordering::Equal)),
            (1, f64::NEG_INFINITY, Some(Ordering::Greater)),
            (1, f64::NAN, None),
        ];
        for (integer, float, expected) in cases {
            let ordering = FactValue::Integer(integer).compare(&FactValue::Float(float));
            assert_eq!(ordering, expected, "{integer} vs {float}");
        }
    }

    #[test]
    fn test_coerce_literals() {
        let date = FactValue::String("2024-03-01T12:00:00Z".into()).coerce_to(ValueKind::Date);
        assert!(matches!(date, Some(FactValue::Date(_))));
        assert_eq!(FactValue::Integer(3).coerce_to(ValueKind::Float), Some(FactValue::Integer(3)));
        assert_eq!(FactValue::Boolean(true).coerce_to(ValueKind::Integer), None);
        assert_eq!(FactValue::Null.coerce_to(ValueKind::String), Some(FactValue::Null));
    }

    #[test]
    fn test_changed_fields() {
        let before = Fact::new("Order").with("amount", 10).with("status", "open");
        let after = Fact::new("Order").with("amount", 10.0).with("status", "closed").with("note", "x");
        assert_eq!(before.changed_fields(&after), vec!["amount", "note", "status"]);
        assert!(before.changed_fields(&before.clone()).is_empty());

        let integral = Fact::new("Order").with("customerId", 7);
        let float = Fact::new("Order").with("customerId", 7.0);
        assert!(FactValue::Integer(7).null_safe_eq(&FactValue::Float(7.0)));
        assert_eq!(integral.changed_fields(&float), vec!["customerId"]);

        let explicit_null = Fact::new("Order").with("note", FactValue::Null);
        assert!(Fact::new("Order").changed_fields(&explicit_null).is_empty());
    }

    #[test]
    fn test_fact_from_json() {
        let json = serde_json::json!({ "id": 5, "name": "Acme", "vip": null });
        let fact = Fact::from_json("Customer", &json).unwrap();
        assert_eq!(fact.get("id"), Some(&FactValue::Integer(5)));
        assert_eq!(fact.get("vip"), Some(&FactValue::Null));
        assert!(Fact::from_json("Customer", &serde_json::json!([1, 2])).is_err());
    }

    #[test]
    fn test_untagged_deserialisation() {
        let values: Vec<FactValue> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FactValue::Null,
                FactValue::Boolean(true),
                FactValue::Integer(3),
                FactValue::Float(2.5),
                FactValue::String("x".into()),
            ]
        );
    }
}
