//! The request dispatcher shared by every service.

use crate::core::envelope::{self, ResponseStatus};
use crate::core::error::{decode_error, PangeaError, Result};
use crate::core::{CallContext, Configuration, Response};
use crate::dispatch::poll::{guard, CallState, Interrupt, PollPolicy, PollTarget, Tick};

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("pangea-rust/", env!("CARGO_PKG_VERSION"));

/// Endpoint used to poll accepted jobs, relative to the service prefix.
pub const POLL_ENDPOINT: &str = "v1/request";

/// Authenticated client for one service.
///
/// Cloning is cheap; clones share the configuration and the HTTP
/// connection pool. Calls are independent and may run concurrently.
#[derive(Debug, Clone)]
pub struct ApiClient {
    service: &'static str,
    config: Arc<Configuration>,
    policy: PollPolicy,
    http: reqwest::Client,
}

impl ApiClient {
    /// Creates a client for `service` with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns `PangeaError::Configuration` if the HTTP client cannot be
    /// built.
    pub fn new(service: &'static str, config: Configuration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                PangeaError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self::with_http_client(service, config, http))
    }

    /// Creates a client for `service` on top of an existing connection pool.
    ///
    /// The pool's own timeouts apply instead of `request_timeout`.
    pub fn with_http_client(
        service: &'static str,
        config: Configuration,
        http: reqwest::Client,
    ) -> Self {
        Self {
            service,
            policy: PollPolicy::from_config(&config),
            config: Arc::new(config),
            http,
        }
    }

    /// Returns a client for another service sharing this one's
    /// configuration and connection pool.
    pub fn for_service(&self, service: &'static str) -> Self {
        Self {
            service,
            ..self.clone()
        }
    }

    /// Returns the service name used as the URL prefix.
    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Returns the poll policy.
    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    /// Resolves the absolute URL of an endpoint of this service.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let raw = format!(
            "{}://{}/{}/{}",
            self.config.scheme(),
            self.config.domain(),
            self.service,
            endpoint.trim_start_matches('/')
        );
        Url::parse(&raw).map_err(|e| {
            PangeaError::configuration(format!("invalid endpoint URL '{}': {}", raw, e))
        })
    }

    /// Invokes `endpoint` with `input` and returns its typed result.
    ///
    /// If the backend accepts the job without finishing it, the call polls
    /// the request status endpoint until the job succeeds or fails, the
    /// deadline passes, or `ctx` is cancelled. The original request is sent
    /// exactly once; nothing is retried.
    ///
    /// # Errors
    ///
    /// Any failure is returned as a single [`PangeaError`].
    pub async fn post<I, O>(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        input: &I,
    ) -> Result<Response<O>>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let started = Instant::now();
        let deadline = self.policy.deadline(ctx, started);
        let mut state = CallState::Building;

        loop {
            tracing::trace!(
                service = self.service,
                endpoint = endpoint,
                state = state.name(),
                "Call state"
            );

            state = match state {
                CallState::Building => CallState::Sent {
                    request: self.build_request(endpoint, input)?,
                    poll: None,
                },

                CallState::Sent { request, poll } => {
                    let exchange = guard(ctx, deadline, self.exchange(request))
                        .await
                        .map_err(|i| self.interrupted(i, started, poll.as_ref()))?;
                    let (status, body) = exchange?;
                    CallState::Decoding { status, body, poll }
                }

                CallState::Decoding { status, body, poll } => {
                    if !status.is_success() {
                        return Err(decode_error(status, &body));
                    }

                    let envelope = envelope::decode::<O>(&body).inspect_err(|e| {
                        tracing::warn!(
                            service = self.service,
                            endpoint = endpoint,
                            status = status.as_u16(),
                            error = %e,
                            "Malformed response envelope"
                        );
                    })?;
                    match envelope.status {
                        ResponseStatus::Success => {
                            tracing::debug!(
                                service = self.service,
                                endpoint = endpoint,
                                request_id = %envelope.request_id,
                                attempts = poll.as_ref().map_or(0, |p| p.attempt),
                                "Call succeeded"
                            );
                            return envelope.into_response();
                        }
                        ResponseStatus::Failure => {
                            let err = envelope
                                .to_structured_error()
                                .with_http_status(status.as_u16());
                            return Err(err.into());
                        }
                        ResponseStatus::InProgress => {
                            let target = match poll {
                                Some(target) => target.next(),
                                None => {
                                    tracing::debug!(
                                        service = self.service,
                                        endpoint = endpoint,
                                        request_id = %envelope.request_id,
                                        "Request accepted, polling for result"
                                    );
                                    PollTarget::new(envelope.request_id)
                                }
                            };
                            CallState::Polling(target)
                        }
                    }
                }

                CallState::Polling(target) => {
                    match self.policy.next_tick(Instant::now(), deadline) {
                        Tick::Poll(delay) => {
                            let wait = guard(ctx, deadline, tokio::time::sleep(delay)).await;
                            if let Err(interrupt) = wait {
                                return Err(self.interrupted(interrupt, started, Some(&target)));
                            }
                            CallState::Sent {
                                request: self.build_poll_request(&target.request_id)?,
                                poll: Some(target),
                            }
                        }
                        Tick::Expire(rest) => {
                            let interrupt = guard(ctx, deadline, tokio::time::sleep(rest))
                                .await
                                .err()
                                .unwrap_or(Interrupt::Expired);
                            return Err(self.interrupted(interrupt, started, Some(&target)));
                        }
                    }
                }
            };
        }
    }

    fn build_request<I: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        input: &I,
    ) -> Result<reqwest::Request> {
        let url = self.endpoint_url(endpoint)?;
        let mut body = serde_json::to_value(input).map_err(|e| {
            PangeaError::protocol(format!("request body could not be encoded: {}", e))
        })?;

        if let (Some(config_id), Value::Object(map)) = (self.config.config_id(), &mut body) {
            map.entry("config_id")
                .or_insert_with(|| Value::String(config_id.to_string()));
        }

        self.json_request(url, &body)
    }

    fn build_poll_request(&self, request_id: &str) -> Result<reqwest::Request> {
        let url = self.endpoint_url(POLL_ENDPOINT)?;
        self.json_request(url, &serde_json::json!({ "request_id": request_id }))
    }

    fn json_request(&self, url: Url, body: &Value) -> Result<reqwest::Request> {
        if self.config.debug() {
            tracing::debug!(url = %url, body = %body, "Request");
        }

        self.http
            .post(url)
            .bearer_auth(self.config.token().expose_secret())
            .json(body)
            .build()
            .map_err(PangeaError::from)
    }

    /// One HTTP round trip. The whole body is read before returning, so an
    /// abandoned exchange never yields partial data.
    async fn exchange(&self, request: reqwest::Request) -> Result<(StatusCode, Vec<u8>)> {
        let url = request.url().clone();
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;

        if self.config.debug() {
            tracing::debug!(
                url = %url,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "Response"
            );
        } else {
            tracing::debug!(url = %url, status = status.as_u16(), "Response");
        }

        Ok((status, body.to_vec()))
    }

    fn interrupted(
        &self,
        interrupt: Interrupt,
        started: Instant,
        poll: Option<&PollTarget>,
    ) -> PangeaError {
        let request_id = poll.map(|p| p.request_id.clone());
        tracing::debug!(
            service = self.service,
            request_id = ?request_id,
            reason = ?interrupt,
            "Call interrupted"
        );
        match interrupt {
            Interrupt::Cancelled => PangeaError::Cancelled { request_id },
            Interrupt::Expired => PangeaError::Timeout {
                elapsed: started.elapsed(),
                request_id,
            },
        }
    }
}
