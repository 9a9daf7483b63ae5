//! Service façades.
//!
//! Each façade owns an [`ApiClient`] bound to its service name and exposes
//! typed calls that map one input shape to one output shape. All of them
//! share the dispatcher, so envelope handling, polling and errors behave
//! identically across services.
//!
//! ## Available Services
//!
//! - [`audit`] - Tamper-evident audit log
//! - [`domain_intel`] - Domain reputation
//! - [`ip_intel`] - IP address reputation
//! - [`url_intel`] - URL reputation
//! - [`file_intel`] - File reputation by content hash
//!
//! ## Adding a Service
//!
//! ```rust,ignore
//! use pangea::dispatch::ApiClient;
//! use pangea::services::Service;
//!
//! #[derive(Debug, Clone)]
//! pub struct Embargo {
//!     client: ApiClient,
//! }
//!
//! impl Service for Embargo {
//!     fn name(&self) -> &'static str {
//!         "embargo"
//!     }
//!
//!     fn client(&self) -> &ApiClient {
//!         &self.client
//!     }
//! }
//! ```

pub mod audit;
pub mod domain_intel;
pub mod file_intel;
pub mod intel;
pub mod ip_intel;
pub mod url_intel;

use crate::core::Configuration;
use crate::dispatch::ApiClient;

use std::fmt::Debug;

/// Common surface of every service façade.
pub trait Service: Send + Sync + Debug {
    /// Service name, also the URL prefix of its endpoints.
    fn name(&self) -> &'static str;

    /// The dispatcher bound to this service.
    fn client(&self) -> &ApiClient;

    /// The configuration the service was built with.
    fn config(&self) -> &Configuration {
        self.client().config()
    }
}

pub use audit::Audit;
pub use domain_intel::DomainIntel;
pub use file_intel::FileIntel;
pub use intel::{LookupData, LookupOutput};
pub use ip_intel::IpIntel;
pub use url_intel::UrlIntel;
