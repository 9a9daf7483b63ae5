//! Core types shared by every service.
//!
//! - [`config`] - Validated client configuration and override patches
//! - [`error`] - The closed error taxonomy and structured backend errors
//! - [`envelope`] - The uniform response envelope and its codec
//! - [`context`] - Per-call cancellation and deadline

pub mod config;
pub mod context;
pub mod envelope;
pub mod error;

pub use config::{ConfigOverrides, Configuration};
pub use context::CallContext;
pub use envelope::{Envelope, Response, ResponseStatus};
pub use error::{decode_error, FieldError, PangeaError, Result, StructuredError};
