//! Decoding of realtime change payloads into store operations.

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::realtime::{ChangeEvent, ChangeKind};
use brokerdesk_entity::record::Record;

/// What a change payload asks the store to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    /// Insert or replace an entity.
    Upsert {
        /// The decoded entity.
        record: T,
        /// Whether the backend reported a new row.
        inserted: bool,
    },
    /// Remove an entity.
    Remove {
        /// Id of the deleted row.
        id: String,
    },
}

/// Decode a raw payload. Every failure is a decode error.
pub fn decode<T: Record>(payload: &str) -> AppResult<Delivery<T>> {
    let event: ChangeEvent = serde_json::from_str(payload).map_err(|e| {
        AppError::with_source(
            brokerdesk_core::error::ErrorKind::Decode,
            format!("Malformed change event: {e}"),
            e,
        )
    })?;

    match event.event_type {
        ChangeKind::Delete => {
            let id = event
                .old_row
                .as_ref()
                .and_then(|row| row.get("id"))
                .and_then(|id| id.as_str())
                .ok_or_else(|| AppError::decode("Delete event without a row id"))?;
            Ok(Delivery::Remove { id: id.to_string() })
        }
        kind => {
            let row = event
                .new_row
                .ok_or_else(|| AppError::decode(format!("{kind:?} event without a row")))?;
            let record: T = serde_json::from_value(row).map_err(|e| {
                AppError::decode(format!("Row does not fit '{}': {e}", T::COLLECTION))
            })?;
            record
                .check()
                .map_err(|e| AppError::decode(format!("Row breaks invariants: {}", e.message)))?;
            Ok(Delivery::Upsert {
                record,
                inserted: kind == ChangeKind::Insert,
            })
        }
    }
}
