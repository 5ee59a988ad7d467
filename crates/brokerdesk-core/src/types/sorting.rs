//! Ordering for list queries and local sorts.
//!
//! Orderings travel as `field.direction` strings (`created_at.desc`), the
//! form the REST endpoint takes in its `order` parameter.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest (or newest) first.
    Desc,
}

impl SortDirection {
    /// Wire token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Order by one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Field to order by.
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// The default list order: `created_at`, newest first.
    pub fn newest_first() -> Self {
        Self::desc("created_at")
    }

    /// Render as `field.direction`.
    pub fn to_param(&self) -> String {
        format!("{}.{}", self.field, self.direction.as_str())
    }

    /// Parse `field.direction`; a bare field sorts ascending.
    pub fn parse_param(param: &str) -> Option<Self> {
        let (field, direction) = match param.rsplit_once('.') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some(_) => return None,
            None => (param, SortDirection::Asc),
        };
        (!field.is_empty()).then(|| Self::new(field, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_round_trip() {
        assert_eq!(SortField::newest_first().to_param(), "created_at.desc");
        assert_eq!(
            SortField::parse_param("estimated_value.desc"),
            Some(SortField::desc("estimated_value"))
        );
        assert_eq!(SortField::parse_param("name"), Some(SortField::asc("name")));
        assert!(SortField::parse_param("name.sideways").is_none());
        assert!(SortField::parse_param(".desc").is_none());
    }
}
