//! URL reputation service.

use crate::core::{CallContext, Configuration, Response, Result};
use crate::dispatch::ApiClient;
use crate::services::intel::LookupOutput;
use crate::services::Service;

use serde::{Deserialize, Serialize};

/// Service name and URL prefix.
pub const SERVICE_NAME: &str = "url-intel";

/// Input of [`UrlIntel::lookup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlLookupInput {
    /// Absolute URL to look up.
    pub url: String,
    /// Echo request parameters in the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    /// Include the provider's raw response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
    /// Reputation provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl UrlLookupInput {
    /// Creates an input for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
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

/// URL reputation client.
#[derive(Debug, Clone)]
pub struct UrlIntel {
    client: ApiClient,
}

impl UrlIntel {
    /// Creates the service with its own connection pool.
    pub fn new(config: Configuration) -> Result<Self> {
        Ok(Self {
            client: ApiClient::new(SERVICE_NAME, config)?,
        })
    }

    /// Creates the service sharing another client's pool.
    pub fn from_client(client: &ApiClient) -> Self {
        Self {
            client: client.for_service(SERVICE_NAME),
        }
    }

    /// Looks up the reputation of a URL.
    pub async fn lookup(
        &self,
        ctx: &CallContext,
        input: &UrlLookupInput,
    ) -> Result<Response<LookupOutput>> {
        self.client.post(ctx, "v1/lookup", input).await
    }
}

impl Service for UrlIntel {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
