//! Helpers for working with untyped JSON rows.

use std::cmp::Ordering;

use brokerdesk_core::error::AppError;
use brokerdesk_core::result::AppResult;
use brokerdesk_core::traits::gateway::Row;
use brokerdesk_core::types::sorting::{SortDirection, SortField};

/// Return the string id of a row.
pub fn row_id(row: &Row) -> Option<&str> {
    row.get("id").and_then(|v| v.as_str())
}

/// Ensure a row is a JSON object.
pub fn expect_object(row: &Row) -> AppResult<&serde_json::Map<String, Row>> {
    row.as_object()
        .ok_or_else(|| AppError::validation("Row must be a JSON object"))
}

/// Merge the keys of `patch` into `row`.
pub fn merge_patch(row: &mut Row, patch: &Row) -> AppResult<()> {
    let patch = expect_object(patch)?.clone();
    let target = row
        .as_object_mut()
        .ok_or_else(|| AppError::internal("Stored row is not an object"))?;
    for (key, value) in patch {
        target.insert(key, value);
    }
    Ok(())
}

/// Compare two optional cells in `direction`. Missing and null cells sort
/// last either way.
pub fn compare_cells(a: Option<&Row>, b: Option<&Row>, direction: SortDirection) -> Ordering {
    fn present<'a>(cell: Option<&'a Row>) -> Option<&'a Row> {
        cell.filter(|v| !v.is_null())
    }
    match (present(a), present(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            let ordering = match (a, b) {
                (Row::Number(x), Row::Number(y)) => {
                    let x = x.as_f64().unwrap_or(0.0);
                    let y = y.as_f64().unwrap_or(0.0);
                    x.partial_cmp(&y).unwrap_or(Ordering::Equal)
                }
                (Row::String(x), Row::String(y)) => x.cmp(y),
                (Row::Bool(x), Row::Bool(y)) => x.cmp(y),
                _ => Ordering::Equal,
            };
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        }
    }
}

/// Stable-sort rows by a field.
pub fn sort_rows(rows: &mut [Row], order: &SortField) {
    rows.sort_by(|a, b| compare_cells(a.get(&order.field), b.get(&order.field), order.direction));
}
