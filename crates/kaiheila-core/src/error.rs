//! Unified error types for the Kaiheila adapter.
//!
//! Three families, one per boundary:
//!
//! - [`EventError`]: an accessor was called on an event that cannot answer it
//! - [`AdapterError`]: an inbound envelope could not be decoded into any event
//! - [`ApiError`]: an outbound platform call (e.g. asset upload) failed
//!
//! Malformed inline tags in message text have no error variant: they
//! degrade to literal text instead of failing.

use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Event Errors
// =============================================================================

/// Errors raised by event accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The event variant has no backing field for the requested identity.
    #[error("event '{event}' has no {field}")]
    NoIdentity {
        /// Name of the event the accessor was called on.
        event: String,
        /// The identity that was requested (`user_id`, `session_id`).
        field: &'static str,
    },

    /// The event variant does not carry a message.
    #[error("event '{event}' has no message")]
    NoMessage {
        /// Name of the event the accessor was called on.
        event: String,
    },
}

impl EventError {
    /// Creates a [`EventError::NoIdentity`].
    pub fn no_identity(event: impl Into<String>, field: &'static str) -> Self {
        Self::NoIdentity {
            event: event.into(),
            field,
        }
    }

    /// Creates a [`EventError::NoMessage`].
    pub fn no_message(event: impl Into<String>) -> Self {
        Self::NoMessage {
            event: event.into(),
        }
    }
}

// =============================================================================
// Adapter Errors
// =============================================================================

/// Errors that can occur while decoding an inbound envelope.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    /// No candidate event model accepted the envelope.
    #[error("envelope matches none of [{}]: {reason}", candidates.join(", "))]
    Validation {
        /// Candidate models that were tried, most specific first.
        candidates: Vec<&'static str>,
        /// Error reported by the last (most general) candidate.
        reason: String,
    },

    /// The envelope's `post_type` is missing or names no known category.
    #[error("unknown post_type: {0:?}")]
    UnknownPostType(Option<String>),

    /// The raw payload is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound platform calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform answered with a non-zero `code`.
    ///
    /// `message` and `detail` are kept verbatim from the response.
    #[error("action failed ({code}): {message}")]
    ActionFailed {
        /// The platform status code.
        code: i64,
        /// The platform error message.
        message: String,
        /// Any fields the platform returned under `data`.
        detail: Map<String, Value>,
    },

    /// The request never produced a usable response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A successful response lacked a required field.
    #[error("response is missing field '{0}'")]
    MissingField(&'static str),

    /// A local file could not be read before the call.
    #[error("io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for event accessors.
pub type EventResult<T> = Result<T, EventError>;

/// Result type for envelope decoding.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Result type for platform calls.
pub type ApiResult<T> = Result<T, ApiError>;
