//! Notification priority levels.

use serde::{Deserialize, Serialize};

/// How urgently a notification needs the agent's attention.
///
/// Ordered from least to most urgent. `High` and `Urgent` deliveries raise
/// an on-screen alert in addition to landing in the inbox.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    /// Digest material: listing views, weekly summaries.
    Low,
    /// Routine pipeline activity.
    #[default]
    Normal,
    /// A buyer inquiry or an offer.
    High,
    /// Time-critical: expiring offers, closing deadlines.
    Urgent,
}

impl NotificationPriority {
    /// Lenient parse used for legacy rows; unknown values read as `Normal`.
    pub fn from_str_value(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Normal,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn raises_alert(&self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}
