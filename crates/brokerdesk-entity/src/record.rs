//! The `Record` trait shared by every listable entity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use brokerdesk_core::result::AppResult;

use crate::notification::NotificationPriority;

/// A borrowed view of a named field, as seen by the filter engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// Free text (searchable by substring).
    Text(&'a str),
    /// A closed-set enum value rendered as its wire string.
    Category(&'a str),
    /// A numeric value (money, counts).
    Number(f64),
    /// A boolean flag.
    Flag(bool),
    /// A timestamp.
    Timestamp(DateTime<Utc>),
}

impl<'a> FieldValue<'a> {
    /// The string form of text-like values.
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Self::Text(s) | Self::Category(s) => Some(s),
            _ => None,
        }
    }

    /// The numeric form of number values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// An entity held in a collection store.
///
/// `id` is unique within a collection and never changes. `field` returns
/// `None` for unknown names and for optional fields that are absent.
pub trait Record:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Name of the backend collection holding this entity.
    const COLLECTION: &'static str;

    /// Opaque unique identifier.
    fn id(&self) -> &str;

    /// Creation timestamp; collections are ordered newest first.
    fn created_at(&self) -> DateTime<Utc>;

    /// Look up a field by name.
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;

    /// Delivery priority used by the realtime adapter.
    fn priority(&self) -> NotificationPriority {
        NotificationPriority::Normal
    }

    /// Check the entity's own invariants (non-negative money, etc.).
    fn check(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Fails with a validation error when `value` is negative or not finite.
pub(crate) fn ensure_money(field: &str, value: f64) -> AppResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(brokerdesk_core::AppError::validation(format!(
            "{field} must be a non-negative amount, got {value}"
        )));
    }
    Ok(())
}
