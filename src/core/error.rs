//! Error types for the pangea client.
//!
//! Every call returns exactly one [`PangeaError`]. The variant set is closed,
//! so callers can match exhaustively: retry on transport or timeout failures,
//! surface [`StructuredError`] field errors to end users, and treat
//! configuration errors as fatal at startup.

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A single field-level diagnostic reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Machine-readable error code, e.g. `BadFormatHostname`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,

    /// Human-readable explanation.
    #[serde(default, deserialize_with = "null_as_default")]
    pub detail: String,

    /// Locator of the offending request field, e.g. `/domain`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
}

/// Reads an explicit `null` the same way as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(
        code: impl Into<String>,
        detail: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
            source: source.into(),
        }
    }
}

/// A failure reported by the backend.
///
/// `errors` keeps the order in which the server emitted them; the first
/// entry is the primary cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredError {
    /// Top-level message, always prefixed with `API error: `.
    pub message: String,

    /// Field-level diagnostics in server emission order.
    pub errors: Vec<FieldError>,

    /// Request identifier assigned by the backend, if the body carried one.
    pub request_id: Option<String>,

    /// HTTP status of the response that carried the failure.
    pub http_status: Option<u16>,
}

impl StructuredError {
    /// Creates a structured error with the given summary and no field errors.
    pub fn new(summary: impl AsRef<str>) -> Self {
        Self {
            message: format!("API error: {}", summary.as_ref()),
            errors: Vec::new(),
            request_id: None,
            http_status: None,
        }
    }

    /// Sets the field errors.
    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    /// Sets the request identifier.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the HTTP status.
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Returns the primary field error, if any.
    pub fn primary(&self) -> Option<&FieldError> {
        self.errors.first()
    }

    /// Returns the first field error reported for the given source locator.
    pub fn error_for(&self, source: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.source == source)
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for error in &self.errors {
            write!(f, "; {} at {}: {}", error.code, error.source, error.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for StructuredError {}

/// The single error type returned by every pangea call.
#[derive(Debug, Error)]
pub enum PangeaError {
    /// Missing or malformed configuration. Raised before any network I/O.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Network, DNS, TLS or per-request timeout failure.
    #[error("transport error: {source}")]
    Transport {
        /// The underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a body that does not follow the envelope
    /// protocol.
    #[error("protocol violation: {details}")]
    ProtocolViolation {
        /// Description of the violation.
        details: String,
    },

    /// The backend reported a failure.
    #[error(transparent)]
    Api(StructuredError),

    /// The call deadline elapsed before the job completed.
    #[error("call timed out after {elapsed:?}")]
    Timeout {
        /// Time spent on the call before giving up.
        elapsed: Duration,
        /// Identifier of the job being polled, if one was accepted.
        request_id: Option<String>,
    },

    /// The caller cancelled the call.
    #[error("call was cancelled")]
    Cancelled {
        /// Identifier of the job being polled, if one was accepted.
        request_id: Option<String>,
    },
}

impl PangeaError {
    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `ProtocolViolation` error.
    pub fn protocol(details: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            details: details.into(),
        }
    }

    /// Returns the structured backend error, if this is one.
    pub fn as_structured(&self) -> Option<&StructuredError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns `true` if repeating the call may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// Returns the backend request identifier associated with this error.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api(err) => err.request_id.as_deref(),
            Self::Timeout { request_id, .. } | Self::Cancelled { request_id } => {
                request_id.as_deref()
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PangeaError {
    fn from(source: reqwest::Error) -> Self {
        Self::Transport { source }
    }
}

impl From<StructuredError> for PangeaError {
    fn from(err: StructuredError) -> Self {
        Self::Api(err)
    }
}

/// A specialized `Result` type for pangea calls.
pub type Result<T> = std::result::Result<T, PangeaError>;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
    #[serde(default)]
    result: Option<ErrorResult>,
}

#[derive(Debug, Deserialize)]
struct ErrorResult {
    #[serde(default, deserialize_with = "null_as_default")]
    errors: Vec<FieldError>,
}

/// Translates a non-success HTTP response into a [`PangeaError::Api`].
///
/// Bodies that parse as a structured error keep their summary, field
/// errors and request identifier. Without a summary the message is
/// `API error: <reason phrase>`; bodies that are not JSON objects yield
/// only that message.
pub fn decode_error(status: StatusCode, body: &[u8]) -> PangeaError {
    let reason = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP status {}", status.as_u16()));

    let parsed = serde_json::from_slice::<ErrorBody>(body).ok();

    let err = match parsed {
        Some(body) => {
            let errors = body
                .errors
                .or_else(|| body.result.map(|r| r.errors))
                .unwrap_or_default();
            let summary = body
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or(reason);
            let err = StructuredError::new(summary).with_errors(errors);
            match body.request_id {
                Some(id) => err.with_request_id(id),
                None => err,
            }
        }
        None => StructuredError::new(reason),
    };

    PangeaError::Api(err.with_http_status(status.as_u16()))
}
