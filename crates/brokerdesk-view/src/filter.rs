//! Local filter and search engine.
//!
//! [`apply`] is a pure function over a slice of records: it never reorders
//! its input, so callers can sort first and filter second (or the reverse)
//! and get the same relative order.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use brokerdesk_core::config::ViewConfig;
use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::types::sorting::{SortDirection, SortField};
use brokerdesk_entity::record::{FieldValue, Record};

/// A constraint on one named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Constraint {
    /// Exact match on the field's string form.
    Equals(String),
    /// Exact match on any of the listed values.
    OneOf(Vec<String>),
    /// Inclusive numeric bounds; either side may be open.
    Range { min: Option<f64>, max: Option<f64> },
    /// Boolean flag value.
    Flag(bool),
}

impl Constraint {
    fn matches(&self, value: Option<FieldValue<'_>>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Self::Equals(expected) => value_equals(&value, expected),
            Self::OneOf(options) => options.iter().any(|o| value_equals(&value, o)),
            Self::Range { min, max } => match value.as_number() {
                Some(n) => min.is_none_or(|m| n >= m) && max.is_none_or(|m| n <= m),
                None => false,
            },
            Self::Flag(expected) => matches!(value, FieldValue::Flag(b) if b == *expected),
        }
    }
}

fn value_equals(value: &FieldValue<'_>, expected: &str) -> bool {
    match value {
        FieldValue::Text(s) | FieldValue::Category(s) => *s == expected,
        FieldValue::Number(n) => expected.parse::<f64>().is_ok_and(|e| e == *n),
        FieldValue::Flag(b) => expected.parse::<bool>().is_ok_and(|e| e == *b),
        FieldValue::Timestamp(_) => false,
    }
}

/// Free-text search over designated fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuery {
    /// Substring to look for, case-insensitively.
    pub text: String,
    /// Fields searched; a record matches if any of them contains the text.
    pub fields: Vec<String>,
}

/// Criteria for [`apply`]. An empty criteria matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Optional free-text search.
    #[serde(default)]
    pub text: Option<TextQuery>,
    /// Field name → constraint, all of which must hold.
    #[serde(default)]
    pub constraints: BTreeMap<String, Constraint>,
}

impl FilterCriteria {
    /// Criteria with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search `text` across `fields`.
    pub fn search<I, S>(mut self, text: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text = Some(TextQuery {
            text: text.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Search `text` across the fields configured for `T`'s page.
    pub fn search_in<T: Record>(self, text: impl Into<String>, config: &ViewConfig) -> Self {
        self.search(text, config.search_fields(T::COLLECTION).iter().cloned())
    }

    /// Add (or replace) the constraint on `field`.
    pub fn with(mut self, field: impl Into<String>, constraint: Constraint) -> Self {
        self.constraints.insert(field.into(), constraint);
        self
    }

    /// Require `field` to equal `value`.
    pub fn equals(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(field, Constraint::Equals(value.into()))
    }

    /// Require `field` to fall within `[min, max]`.
    pub fn range(self, field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        self.with(field, Constraint::Range { min, max })
    }

    /// Drop the constraint on `field`.
    pub fn without(mut self, field: &str) -> Self {
        self.constraints.remove(field);
        self
    }

    /// Whether the criteria constrain nothing.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty() && self.active_text().is_none()
    }

    /// Reject criteria no record could sensibly be checked against:
    /// inverted or negative ranges, empty option sets, and a text search
    /// without fields.
    pub fn validate(&self) -> AppResult<()> {
        if let Some(query) = &self.text {
            if !query.text.trim().is_empty() && query.fields.is_empty() {
                return Err(AppError::validation("Text search needs at least one field"));
            }
        }

        for (field, constraint) in &self.constraints {
            match constraint {
                Constraint::Range { min, max } => {
                    for bound in [min, max].into_iter().flatten() {
                        if !bound.is_finite() || *bound < 0.0 {
                            return Err(AppError::validation(format!(
                                "Bound on '{field}' must be a non-negative amount, got {bound}"
                            )));
                        }
                    }
                    if let (Some(lo), Some(hi)) = (min, max) {
                        if lo > hi {
                            return Err(AppError::validation(format!(
                                "Range on '{field}' is inverted ({lo} > {hi})"
                            )));
                        }
                    }
                }
                Constraint::OneOf(options) if options.is_empty() => {
                    return Err(AppError::validation(format!(
                        "Constraint on '{field}' lists no values"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Whether one record satisfies the criteria.
    pub fn matches<T: Record>(&self, record: &T) -> bool {
        if let Some((needle, fields)) = self.active_text() {
            let hit = fields.iter().any(|field| {
                record
                    .field(field)
                    .and_then(|v| v.as_text())
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            });
            if !hit {
                return false;
            }
        }

        self.constraints
            .iter()
            .all(|(field, constraint)| constraint.matches(record.field(field)))
    }

    fn active_text(&self) -> Option<(String, &[String])> {
        let query = self.text.as_ref()?;
        let needle = query.text.trim();
        if needle.is_empty() {
            return None;
        }
        Some((needle.to_lowercase(), query.fields.as_slice()))
    }
}

/// Return the records satisfying `criteria`, in input order.
pub fn apply<T: Record>(records: &[T], criteria: &FilterCriteria) -> Vec<T> {
    if criteria.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| criteria.matches(*r))
        .cloned()
        .collect()
}

/// Stable-sort records by a field. Records missing the field sort last in
/// either direction.
pub fn sort_records<T: Record>(records: &mut [T], order: &SortField) {
    records.sort_by(|a, b| {
        let (a, b) = (sort_key(a, &order.field), sort_key(b, &order.field));
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ordering = compare_values(&a, &b);
                match order.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }
        }
    });
}

fn sort_key<'a, T: Record>(record: &'a T, field: &str) -> Option<FieldValue<'a>> {
    match record.field(field) {
        Some(value) => Some(value),
        None if field == "created_at" => Some(FieldValue::Timestamp(record.created_at())),
        None => None,
    }
}

fn compare_values(a: &FieldValue<'_>, b: &FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Number(x), FieldValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (FieldValue::Timestamp(x), FieldValue::Timestamp(y)) => x.cmp(y),
        (FieldValue::Flag(x), FieldValue::Flag(y)) => x.cmp(y),
        _ => match (a.as_text(), b.as_text()) {
            (Some(x), Some(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
            _ => Ordering::Equal,
        },
    }
}
