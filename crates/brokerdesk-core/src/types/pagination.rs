//! Row windows for remote queries.

use serde::{Deserialize, Serialize};

/// Largest window one query may ask for.
pub const MAX_LIMIT: u64 = 1000;

/// A window of rows: skip `offset`, return at most `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Rows to skip.
    #[serde(default)]
    pub offset: u64,
    /// Maximum rows to return, in `1..=MAX_LIMIT`.
    pub limit: u64,
}

impl PageRequest {
    /// An explicit window; `limit` is clamped.
    pub fn window(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// The first `limit` rows.
    pub fn first(limit: u64) -> Self {
        Self::window(0, limit)
    }

    /// Page `page` (1-based, 0 reads as 1) of `size` rows.
    pub fn page(page: u64, size: u64) -> Self {
        let size = size.clamp(1, MAX_LIMIT);
        Self::window(page.max(1).saturating_sub(1).saturating_mul(size), size)
    }

    /// The window directly after this one.
    pub fn next(&self) -> Self {
        Self::window(self.offset.saturating_add(self.limit), self.limit)
    }
}
