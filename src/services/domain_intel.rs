//! Domain reputation service.
//!
//! # Example
//!
//! ```rust,no_run
//! use pangea::services::domain_intel::{DomainIntel, DomainLookupInput};
//! use pangea::{CallContext, Configuration};
//!
//! # async fn run() -> pangea::Result<()> {
//! let config = Configuration::new("pts_token", "aws.us.pangea.cloud")?;
//! let intel = DomainIntel::new(config)?;
//!
//! let input = DomainLookupInput::new("teoghehofuuxo.su").with_provider("crowdstrike");
//! let response = intel.lookup(&CallContext::new(), &input).await?;
//! println!("verdict: {}", response.result.data.verdict);
//! # Ok(())
//! # }
//! ```

use crate::core::{CallContext, Configuration, Response, Result};
use crate::dispatch::ApiClient;
use crate::services::intel::LookupOutput;
use crate::services::Service;

use serde::{Deserialize, Serialize};

/// Service name and URL prefix.
pub const SERVICE_NAME: &str = "domain-intel";

/// Input of [`DomainIntel::lookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainLookupInput {
    /// Domain to look up.
    pub domain: String,

    /// Echo request parameters in the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,

    /// Include the provider's raw response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,

    /// Reputation provider, e.g. `crowdstrike` or `domaintools`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl DomainLookupInput {
    /// Creates an input for the given domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Sets the verbose flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Sets the raw flag.
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Sets the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }
}

/// Domain reputation client.
#[derive(Debug, Clone)]
pub struct DomainIntel {
    client: ApiClient,
}

impl DomainIntel {
    /// Creates the service with its own connection pool.
    pub fn new(config: Configuration) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(SERVICE_NAME, config)?,
        })
    }

    /// Creates the service on top of another client's configuration and
    /// connection pool.
    pub fn from_client(client: &ApiClient) -> Self {
        Self {
            client: client.for_service(SERVICE_NAME),
        }
    }

    /// Looks up the reputation of a domain.
    ///
    /// # Errors
    ///
    /// Invalid input is reported by the backend as `PangeaError::Api`, e.g.
    /// `BadFormatHostname` at `/domain` for an empty domain.
    pub async fn lookup(
        &self,
        ctx: &CallContext,
        input: &DomainLookupInput,
    ) -> Result<Response<LookupOutput>> {
        self.client.post(ctx, "v1/lookup", input).await
    }
}

impl Service for DomainIntel {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_options_are_omitted() {
        let body = serde_json::to_value(DomainLookupInput::new("example.org")).unwrap();
        assert_eq!(body, serde_json::json!({"domain": "example.org"}));

        let body = serde_json::to_value(
            DomainLookupInput::new("")
                .with_provider("crowdstrike")
                .with_raw(true)
                .with_verbose(false),
        )
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"domain": "", "provider": "crowdstrike", "raw": true, "verbose": false})
        );
    }
}
