use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tagged-variant numeric filter operator (design notes: "define tagged-variant
/// structures for ... filter ops ... instead of untyped dictionaries").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "lowercase")]
pub enum NumericOp {
    Eq(f64),
    Gt(f64),
    Lt(f64),
    Gte(f64),
    Lte(f64),
}

impl NumericOp {
    /// Suffix used by the Discover Engine's SQL/field-name mapping (spec §4.8 step 7).
    pub fn field_suffix(&self) -> &'static str {
        match self {
            NumericOp::Eq(_) => "",
            NumericOp::Gt(_) => "__gt",
            NumericOp::Lt(_) => "__lt",
            NumericOp::Gte(_) => "__gte",
            NumericOp::Lte(_) => "__lte",
        }
    }

    pub fn value(&self) -> f64 {
        match self {
            NumericOp::Eq(v) | NumericOp::Gt(v) | NumericOp::Lt(v) | NumericOp::Gte(v) | NumericOp::Lte(v) => *v,
        }
    }

    pub fn matches(&self, candidate: f64) -> bool {
        match self {
            NumericOp::Eq(v) => (candidate - v).abs() < f64::EPSILON,
            NumericOp::Gt(v) => candidate > *v,
            NumericOp::Lt(v) => candidate < *v,
            NumericOp::Gte(v) => candidate >= *v,
            NumericOp::Lte(v) => candidate <= *v,
        }
    }
}

/// A single filter value: either an enum-list (OR semantics), a scalar (equality), or
/// a numeric operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    EnumList(Vec<String>),
    Scalar(String),
    Numeric(NumericOp),
}

pub type FilterMap = BTreeMap<String, FilterValue>;

/// Placeholder values that the code-level enforcement strips from strings, filters,
/// excludes, and campaign-context fields (spec §4.12 step 1).
pub const PLACEHOLDER_VALUES: &[&str] = &[
    "not specified",
    "unknown",
    "n/a",
    "na",
    "none",
    "any",
    "",
    "null",
    "undecided",
    "not sure",
];

pub fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_lowercase();
    PLACEHOLDER_VALUES.contains(&normalized.as_str())
}

/// Strips placeholder values from a raw JSON filters object, returning only the
/// fields that carry real values.
pub fn strip_placeholder_filters(raw: &Value) -> FilterMap {
    let mut out = FilterMap::new();
    let Some(obj) = raw.as_object() else {
        return out;
    };
    for (key, value) in obj {
        match value {
            Value::String(s) if !is_placeholder(s) => {
                out.insert(key.clone(), FilterValue::Scalar(s.clone()));
            }
            Value::Array(items) => {
                let cleaned: Vec<String> = items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .filter(|s| !is_placeholder(s))
                    .map(|s| s.to_string())
                    .collect();
                if !cleaned.is_empty() {
                    out.insert(key.clone(), FilterValue::EnumList(cleaned));
                }
            }
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    out.insert(key.clone(), FilterValue::Numeric(NumericOp::Eq(f)));
                }
            }
            _ => {}
        }
    }
    out
}
