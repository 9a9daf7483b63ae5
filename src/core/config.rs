//! Client configuration.
//!
//! A [`Configuration`] is validated once at construction and never mutated
//! afterwards. Per-call-group variations are made with
//! [`Configuration::copy`], which applies a [`ConfigOverrides`] patch to a
//! fresh value and leaves the receiver untouched.

use crate::core::error::{PangeaError, Result};

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

/// Default timeout for a single HTTP exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default wait between two polls of an accepted job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default wall-clock budget for a call, polling included.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(120);

/// Validated, immutable client configuration.
///
/// # Examples
///
/// ```rust
/// use pangea::{ConfigOverrides, Configuration};
/// use std::time::Duration;
///
/// let base = Configuration::new("pts_token", "aws.us.pangea.cloud")?;
/// let fast = base.copy(
///     &ConfigOverrides::new()
///         .with_config_id("pci_profile")
///         .with_poll_interval(Duration::from_millis(250)),
/// )?;
///
/// assert_eq!(base.config_id(), None);
/// assert_eq!(fast.config_id(), Some("pci_profile"));
/// # Ok::<(), pangea::PangeaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Configuration {
    token: SecretString,
    domain: String,
    config_id: Option<String>,
    request_timeout: Duration,
    poll_interval: Duration,
    poll_timeout: Duration,
    insecure: bool,
    debug: bool,
}

impl Configuration {
    /// Creates a configuration with default options.
    ///
    /// # Errors
    ///
    /// Returns `PangeaError::Configuration` if the token or domain is empty
    /// or unusable.
    pub fn new(token: impl Into<String>, domain: impl Into<String>) -> Result<Self> {
        Self::with_overrides(token, domain, &ConfigOverrides::default())
    }

    /// Creates a configuration and applies the given options in one step.
    pub fn with_overrides(
        token: impl Into<String>,
        domain: impl Into<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let base = Self {
            token: SecretString::from(token.into()),
            domain: domain.into(),
            config_id: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            insecure: false,
            debug: false,
        };
        base.apply(overrides)
    }

    /// Returns a new configuration equal to this one except for the fields
    /// present in `overrides`.
    ///
    /// # Errors
    ///
    /// Returns `PangeaError::Configuration` if the patched value is invalid,
    /// e.g. an explicitly empty token.
    pub fn copy(&self, overrides: &ConfigOverrides) -> Result<Self> {
        self.clone().apply(overrides)
    }

    fn apply(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(ref token) = overrides.token {
            self.token = SecretString::from(token.clone());
        }
        if let Some(ref domain) = overrides.domain {
            self.domain = domain.clone();
        }
        if let Some(ref config_id) = overrides.config_id {
            // An explicit empty identifier clears the selection.
            self.config_id = Some(config_id.clone()).filter(|id| !id.is_empty());
        }
        if let Some(timeout) = overrides.request_timeout {
            self.request_timeout = timeout;
        }
        if let Some(interval) = overrides.poll_interval {
            self.poll_interval = interval;
        }
        if let Some(timeout) = overrides.poll_timeout {
            self.poll_timeout = timeout;
        }
        if let Some(insecure) = overrides.insecure {
            self.insecure = insecure;
        }
        if let Some(debug) = overrides.debug {
            self.debug = debug;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let token = self.token.expose_secret();
        if token.trim().is_empty() {
            return Err(PangeaError::configuration("token must not be empty"));
        }
        if HeaderValue::from_str(&format!("Bearer {}", token)).is_err() {
            return Err(PangeaError::configuration(
                "token contains characters not allowed in an HTTP header",
            ));
        }

        if self.domain.trim().is_empty() {
            return Err(PangeaError::configuration("domain must not be empty"));
        }
        let probe = Url::parse(&format!("https://{}/", self.domain)).map_err(|e| {
            PangeaError::configuration(format!("invalid domain '{}': {}", self.domain, e))
        })?;
        let bare = probe.host_str().is_some()
            && probe.path() == "/"
            && probe.query().is_none()
            && probe.fragment().is_none()
            && probe.username().is_empty()
            && probe.password().is_none()
            && !self.domain.contains(['/', '?', '#', '@']);
        if !bare {
            return Err(PangeaError::configuration(format!(
                "domain '{}' must be a bare host name, optionally with a port",
                self.domain
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(PangeaError::configuration("request timeout must be non-zero"));
        }
        if self.poll_interval.is_zero() {
            return Err(PangeaError::configuration("poll interval must be non-zero"));
        }
        if self.poll_timeout < self.poll_interval {
            return Err(PangeaError::configuration(
                "poll timeout must not be shorter than the poll interval",
            ));
        }

        Ok(())
    }

    /// Returns the authentication token.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// Returns the backend domain.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the configuration identifier, if one is selected.
    pub fn config_id(&self) -> Option<&str> {
        self.config_id.as_deref()
    }

    /// Returns the timeout for a single HTTP exchange.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the wait between two polls.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the default wall-clock budget for a call.
    pub fn poll_timeout(&self) -> Duration {
        self.poll_timeout
    }

    /// Returns whether plain HTTP is used instead of HTTPS.
    pub fn insecure(&self) -> bool {
        self.insecure
    }

    /// Returns whether request and response bodies are logged.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// URL scheme derived from the `insecure` flag.
    pub(crate) fn scheme(&self) -> &'static str {
        if self.insecure {
            "http"
        } else {
            "https"
        }
    }
}

/// A patch applied by [`Configuration::copy`].
///
/// Unset fields leave the original value in place; set fields replace it,
/// even when the new value is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replacement token.
    pub token: Option<String>,
    /// Replacement domain.
    pub domain: Option<String>,
    /// Replacement configuration identifier. `Some("")` clears it.
    pub config_id: Option<String>,
    /// Replacement request timeout.
    pub request_timeout: Option<Duration>,
    /// Replacement poll interval.
    pub poll_interval: Option<Duration>,
    /// Replacement poll timeout.
    pub poll_timeout: Option<Duration>,
    /// Replacement insecure flag.
    pub insecure: Option<bool>,
    /// Replacement debug flag.
    pub debug: Option<bool>,
}

impl ConfigOverrides {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Overrides the domain.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Overrides the configuration identifier.
    pub fn with_config_id(mut self, config_id: impl Into<String>) -> Self {
        self.config_id = Some(config_id.into());
        self
    }

    /// Overrides the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Overrides the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Overrides the poll timeout.
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = Some(timeout);
        self
    }

    /// Overrides the insecure flag.
    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = Some(insecure);
        self
    }

    /// Overrides the debug flag.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
