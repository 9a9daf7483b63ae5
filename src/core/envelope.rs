//! The response envelope shared by every service.
//!
//! Each response carries the same fixed fields (`request_id`, `status`,
//! `summary`, ...) around a `result` whose shape depends on the call.
//! [`decode`] validates the fixed fields and hands the raw `result` bytes to
//! the caller's type only when the status is `Success`.

use crate::core::error::{FieldError, PangeaError, Result, StructuredError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;
use std::str::FromStr;

/// Status of a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// The call completed and `result` holds its output.
    Success,
    /// The call failed; the envelope carries field errors.
    Failure,
    /// The job was accepted and must be polled.
    InProgress,
}

impl ResponseStatus {
    /// Returns `true` for `Success` and `Failure`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failure => "Failure",
            Self::InProgress => "InProgress",
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = PangeaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Success" => Ok(Self::Success),
            "Failure" => Ok(Self::Failure),
            "InProgress" => Ok(Self::InProgress),
            other => Err(PangeaError::protocol(format!(
                "unexpected envelope status '{}'",
                other
            ))),
        }
    }
}

/// A decoded response envelope.
///
/// `result` is `Some` exactly when `status` is `Success`; `errors` is only
/// populated for `Failure`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    /// Backend-assigned request identifier.
    pub request_id: String,
    /// When the backend received the request.
    pub request_time: Option<String>,
    /// When the backend produced the response.
    pub response_time: Option<String>,
    /// Envelope status.
    pub status: ResponseStatus,
    /// Diagnostic summary.
    pub summary: String,
    /// Typed payload.
    pub result: Option<T>,
    /// Field errors for a `Failure` envelope.
    pub errors: Vec<FieldError>,
}

impl<T> Envelope<T> {
    /// Returns `true` if the status is `Success`.
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Returns `true` if the job must be polled.
    pub fn is_in_progress(&self) -> bool {
        self.status == ResponseStatus::InProgress
    }

    /// Builds the structured error carried by a `Failure` envelope.
    pub fn to_structured_error(&self) -> StructuredError {
        let summary = if self.summary.is_empty() {
            "request failed"
        } else {
            self.summary.as_str()
        };
        StructuredError::new(summary)
            .with_errors(self.errors.clone())
            .with_request_id(self.request_id.clone())
    }

    /// Converts a terminal envelope into the caller-facing outcome.
    ///
    /// # Errors
    ///
    /// `Failure` becomes `PangeaError::Api`; `InProgress` is a protocol
    /// violation at this point because there is nothing to return.
    pub fn into_response(self) -> Result<Response<T>> {
        match self.status {
            ResponseStatus::Success => {
                let result = self.result.ok_or_else(|| {
                    PangeaError::protocol("success envelope without a result")
                })?;
                Ok(Response {
                    request_id: self.request_id,
                    request_time: self.request_time,
                    response_time: self.response_time,
                    summary: self.summary,
                    result,
                })
            }
            ResponseStatus::Failure => Err(PangeaError::Api(self.to_structured_error())),
            ResponseStatus::InProgress => Err(PangeaError::protocol(format!(
                "request {} is still in progress",
                self.request_id
            ))),
        }
    }
}

/// The successful outcome of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    /// Backend-assigned request identifier.
    pub request_id: String,
    /// When the backend received the request.
    pub request_time: Option<String>,
    /// When the backend produced the response.
    pub response_time: Option<String>,
    /// Diagnostic summary.
    pub summary: String,
    /// Typed payload.
    pub result: T,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope<'a> {
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    request_time: Option<String>,
    #[serde(default)]
    response_time: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(borrow, default)]
    result: Option<&'a RawValue>,
    #[serde(default)]
    errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Default, Deserialize)]
struct FailureResult {
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Decodes a response body into an envelope with a `T` payload.
///
/// # Errors
///
/// Returns `PangeaError::ProtocolViolation` if the body is not an envelope,
/// the status is not one of the three known values, or the `result` of a
/// `Success` envelope does not match `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<Envelope<T>> {
    let raw: RawEnvelope<'_> = serde_json::from_slice(body)
        .map_err(|e| PangeaError::protocol(format!("malformed envelope: {}", e)))?;

    let request_id = raw
        .request_id
        .ok_or_else(|| PangeaError::protocol("envelope is missing request_id"))?;
    let status: ResponseStatus = raw
        .status
        .as_deref()
        .ok_or_else(|| PangeaError::protocol("envelope is missing status"))?
        .parse()?;

    let (result, errors) = match status {
        ResponseStatus::Success => {
            let parsed = match raw.result {
                Some(bytes) => serde_json::from_str::<T>(bytes.get()),
                None => serde_json::from_value::<T>(serde_json::Value::Null),
            }
            .map_err(|e| {
                PangeaError::protocol(format!(
                    "result of request {} does not match the expected shape: {}",
                    request_id, e
                ))
            })?;
            (Some(parsed), Vec::new())
        }
        ResponseStatus::Failure => {
            let errors = match raw.errors {
                Some(errors) => errors,
                None => raw
                    .result
                    .and_then(|bytes| serde_json::from_str::<FailureResult>(bytes.get()).ok())
                    .unwrap_or_default()
                    .errors,
            };
            (None, errors)
        }
        ResponseStatus::InProgress => (None, Vec::new()),
    };

    Ok(Envelope {
        request_id,
        request_time: raw.request_time,
        response_time: raw.response_time,
        status,
        summary: raw.summary.unwrap_or_default(),
        result,
        errors,
    })
}
