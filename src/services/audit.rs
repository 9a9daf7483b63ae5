//! Secure audit log service.
//!
//! Events are appended with [`Audit::log`] and queried with
//! [`Audit::search`]. Large searches are paginated: the first search
//! returns an `id` that [`Audit::search_results`] pages through.

use crate::core::{CallContext, Configuration, Response, Result};
use crate::dispatch::ApiClient;
use crate::services::Service;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service name and URL prefix.
pub const SERVICE_NAME: &str = "audit";

/// An audit record.
///
/// Only `message` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Free-form description of what happened.
    pub message: String,

    /// Who performed the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// What was done, e.g. `reboot`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Outcome of the action, e.g. `success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Where the action originated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// What the action was performed on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Value before the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old: Option<String>,

    /// Value after the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new: Option<String>,

    /// Tenant the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// When the event happened. The backend stamps receipt time separately.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates an event with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Sets the actor.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the action.
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Records a value change.
    pub fn with_change(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.old = Some(old.into());
        self.new = Some(new.into());
        self
    }

    /// Sets the tenant.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the event time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// An event as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The logged event.
    pub event: Event,

    /// When the backend received it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct LogRequest<'a> {
    event: &'a Event,
    verbose: bool,
    return_hash: bool,
}

/// Result of [`Audit::log`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogOutput {
    /// Hash of the stored record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// The stored record, returned with `verbose`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<EventEnvelope>,
}

/// Sort direction of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    Desc,
}

/// Input of [`Audit::search`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInput {
    /// Query expression, e.g. `actor:alice action:login`.
    pub query: String,

    /// Only events at or after this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,

    /// Only events before this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,

    /// Sort direction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SearchOrder>,

    /// Event field to sort by.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Cap on the total number of matches retained for paging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    /// Include stored hashes and receipt times.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
}

impl SearchInput {
    /// Creates a search for the given query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Restricts the time range.
    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Sets the sort order.
    pub fn with_order(mut self, order: SearchOrder, order_by: impl Into<String>) -> Self {
        self.order = Some(order);
        self.order_by = Some(order_by.into());
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the result cap.
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Sets the verbose flag.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }
}

/// Input of [`Audit::search_results`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultsInput {
    /// Identifier returned by [`Audit::search`].
    pub id: String,

    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Index of the first event of the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl SearchResultsInput {
    /// Creates a request for one page of a previous search.
    pub fn new(id: impl Into<String>, offset: u32, limit: u32) -> Self {
        Self {
            id: id.into(),
            limit: Some(limit),
            offset: Some(offset),
        }
    }
}

/// A search match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEvent {
    /// The stored event.
    pub envelope: EventEnvelope,

    /// Hash of the stored record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Position of the record in the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_index: Option<u64>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutput {
    /// Identifier for paging through the results.
    pub id: String,

    /// Total number of matches.
    #[serde(default)]
    pub count: u64,

    /// Matches on this page.
    #[serde(default)]
    pub events: Vec<SearchEvent>,

    /// When `id` stops being valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SearchOutput {
    /// Returns `true` if matches remain after a page ending at `offset`.
    pub fn has_more(&self, offset: u64) -> bool {
        offset + (self.events.len() as u64) < self.count
    }
}

/// Audit log client.
#[derive(Debug, Clone)]
pub struct Audit {
    client: ApiClient,
}

impl Audit {
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

    /// Appends an event to the log.
    ///
    /// With `verbose`, the output includes the stored envelope; with
    /// `return_hash`, the hash of the stored record.
    pub async fn log(
        &self,
        ctx: &CallContext,
        event: &Event,
        verbose: bool,
        return_hash: bool,
    ) -> Result<Response<LogOutput>> {
        let request = LogRequest {
            event,
            verbose,
            return_hash,
        };
        self.client.post(ctx, "v1/log", &request).await
    }

    /// Searches the log.
    pub async fn search(
        &self,
        ctx: &CallContext,
        input: &SearchInput,
    ) -> Result<Response<SearchOutput>> {
        self.client.post(ctx, "v1/search", input).await
    }

    /// Fetches another page of a previous search.
    pub async fn search_results(
        &self,
        ctx: &CallContext,
        input: &SearchResultsInput,
    ) -> Result<Response<SearchOutput>> {
        self.client.post(ctx, "v1/results", input).await
    }
}

impl Service for Audit {
    fn name(&self) -> &'static str {
        SERVICE_NAME
    }

    fn client(&self) -> &ApiClient {
        &self.client
    }
}
