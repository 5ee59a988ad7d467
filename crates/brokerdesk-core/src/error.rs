//! Unified application error types for BrokerDesk.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] drives the
//! recovery policy of the view layer: fetch failures keep the last good
//! state, write failures trigger an optimistic rollback, decode failures
//! are dropped, and validation failures block the remote call.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Nobody is signed in, or the credentials were rejected.
    Authentication,
    /// Local input failed a precondition before any remote call.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// A remote query failed (network, auth, or server).
    Fetch,
    /// A remote mutation failed.
    Write,
    /// A realtime payload or row could not be decoded.
    Decode,
    /// The operation was abandoned because its view or session went away.
    Cancelled,
    /// An internal error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A callable remote function reported a failure.
    ExternalService,
    /// The backend is temporarily unavailable.
    ServiceUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Fetch => write!(f, "FETCH"),
            Self::Write => write!(f, "WRITE"),
            Self::Decode => write!(f, "DECODE"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ExternalService => write!(f, "EXTERNAL_SERVICE"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
        }
    }
}

/// The unified application error used throughout BrokerDesk.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a fetch (query) error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    /// Create a write (mutation) error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Write, message)
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    /// Create a cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an external-service error.
    pub fn external_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalService, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Re-tag this error as a fetch failure, keeping the original as source.
    pub fn into_fetch(self, context: impl Into<String>) -> Self {
        if self.kind == ErrorKind::Fetch {
            return self;
        }
        let message = format!("{}: {}", context.into(), self.message);
        Self::with_source(ErrorKind::Fetch, message, self)
    }

    /// Re-tag this error as a write failure, keeping the original as source.
    pub fn into_write(self, context: impl Into<String>) -> Self {
        if self.kind == ErrorKind::Write {
            return self;
        }
        let message = format!("{}: {}", context.into(), self.message);
        Self::with_source(ErrorKind::Write, message, self)
    }

    /// Whether this error should be shown to the user as a dismissible notice.
    ///
    /// Decode failures are recovered silently and validation failures are
    /// reported inline by the caller.
    pub fn is_user_visible(&self) -> bool {
        !matches!(
            self.kind,
            ErrorKind::Decode | ErrorKind::Cancelled | ErrorKind::Validation
        )
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind() {
        let err = AppError::fetch("leads unavailable");
        assert_eq!(err.to_string(), "FETCH: leads unavailable");
    }

    #[test]
    fn test_into_write_keeps_source() {
        let err = AppError::service_unavailable("timeout").into_write("Failed to favorite");
        assert_eq!(err.kind, ErrorKind::Write);
        assert!(err.message.contains("timeout"));
        assert!(err.source.is_some());
    }

    #[test]
    fn test_into_fetch_is_idempotent() {
        let err = AppError::fetch("down").into_fetch("again");
        assert_eq!(err.message, "down");
    }

    #[test]
    fn test_decode_errors_are_not_user_visible() {
        assert!(!AppError::decode("bad frame").is_user_visible());
        assert!(AppError::write("rejected").is_user_visible());
    }
}
