//! # Pangea
//!
//! An async client for the Pangea security services REST API.
//!
//! ## Overview
//!
//! Every service is reached through the same dispatcher, which:
//!
//! - Authenticates each request with a bearer token
//! - Decodes the common response envelope into typed results
//! - Polls jobs the backend accepts without finishing, until they complete,
//!   the call deadline passes, or the caller cancels
//! - Reports every failure as a single [`PangeaError`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pangea::prelude::*;
//! use pangea::services::ip_intel::IpLookupInput;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Configuration::new("pts_token", "aws.us.pangea.cloud")?;
//!     let intel = IpIntel::new(config)?;
//!
//!     let input = IpLookupInput::new("93.231.182.110").with_provider("crowdstrike");
//!     let response = intel.lookup(&CallContext::new(), &input).await?;
//!
//!     println!("{}: {}", response.request_id, response.result.data.verdict);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: configuration, call context, response envelope and errors
//! - **Dispatch**: the authenticated HTTP client and poll loop
//! - **Services**: typed façades for audit and the intel services

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod dispatch;
pub mod services;

// Re-export commonly used types at the crate root
pub use crate::core::{
    decode_error, CallContext, ConfigOverrides, Configuration, Envelope, FieldError, PangeaError,
    Response, ResponseStatus, Result, StructuredError,
};

pub use crate::dispatch::{ApiClient, PollPolicy};
pub use crate::services::{Audit, DomainIntel, FileIntel, IpIntel, Service, UrlIntel};

/// Prelude module for convenient imports.
///
/// ```rust
/// use pangea::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        CallContext, ConfigOverrides, Configuration, PangeaError, Response, StructuredError,
    };
    pub use crate::dispatch::ApiClient;
    pub use crate::services::{
        Audit, DomainIntel, FileIntel, IpIntel, LookupOutput, Service, UrlIntel,
    };
}
