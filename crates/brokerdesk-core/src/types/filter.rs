//! Remote filter conditions pushed down to the data gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Filter comparison operator understood by every gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
}

impl FilterOp {
    /// Operator token used in filter expressions (`field=eq.value`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }
}

/// A filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// A floating-point value.
    Number(f64),
    /// A boolean value.
    Boolean(bool),
}

impl FilterValue {
    /// Compare this filter value against a JSON cell using `op`.
    ///
    /// Missing or mistyped cells never match.
    pub fn matches(&self, op: FilterOp, cell: Option<&serde_json::Value>) -> bool {
        let Some(cell) = cell else {
            return false;
        };
        match (self, cell) {
            (Self::String(expected), serde_json::Value::String(actual)) => match op {
                FilterOp::Eq => actual == expected,
                FilterOp::Neq => actual != expected,
                FilterOp::Gte => actual.as_str() >= expected.as_str(),
                FilterOp::Lte => actual.as_str() <= expected.as_str(),
            },
            (Self::Number(expected), serde_json::Value::Number(actual)) => {
                let Some(actual) = actual.as_f64() else {
                    return false;
                };
                match op {
                    FilterOp::Eq => actual == *expected,
                    FilterOp::Neq => actual != *expected,
                    FilterOp::Gte => actual >= *expected,
                    FilterOp::Lte => actual <= *expected,
                }
            }
            (Self::Boolean(expected), serde_json::Value::Bool(actual)) => match op {
                FilterOp::Eq => actual == expected,
                FilterOp::Neq => actual != expected,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterField {
    /// The column or field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::String(value.into()))
    }

    /// Render as a `field=op.value` expression, the form used by realtime
    /// subscriptions.
    pub fn to_expression(&self) -> String {
        format!("{}={}.{}", self.field, self.op.as_str(), self.value)
    }

    /// Parse a `field=op.value` expression. Values are kept as strings.
    pub fn parse_expression(expr: &str) -> Option<Self> {
        let (field, rest) = expr.split_once('=')?;
        let (op, value) = rest.split_once('.')?;
        let op = match op {
            "eq" => FilterOp::Eq,
            "neq" => FilterOp::Neq,
            "gte" => FilterOp::Gte,
            "lte" => FilterOp::Lte,
            _ => return None,
        };
        if field.is_empty() {
            return None;
        }
        Some(Self::new(field, op, FilterValue::String(value.to_string())))
    }

    /// Evaluate the condition against a JSON row.
    pub fn matches_row(&self, row: &serde_json::Value) -> bool {
        self.value.matches(self.op, row.get(&self.field))
    }
}
