//! Poll scheduling and the per-call state machine.

use crate::core::{CallContext, Configuration};

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// How an accepted job is polled.
///
/// Polls run at a fixed interval with no attempt cap; the only bound is the
/// call deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Wait between two polls.
    pub interval: Duration,

    /// Budget for a call whose context has no deadline.
    pub timeout: Duration,
}

impl PollPolicy {
    /// Creates a policy.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Creates the policy described by a configuration.
    pub fn from_config(config: &Configuration) -> Self {
        Self::new(config.poll_interval(), config.poll_timeout())
    }

    /// Resolves the deadline of a call started at `started`.
    pub fn deadline(&self, ctx: &CallContext, started: Instant) -> Instant {
        ctx.deadline().unwrap_or(started + self.timeout)
    }

    /// Decides what the poll loop does next.
    ///
    /// A poll is only scheduled if it would be sent strictly before the
    /// deadline; otherwise the loop waits out the remaining time and expires.
    pub fn next_tick(&self, now: Instant, deadline: Instant) -> Tick {
        let remaining = deadline.saturating_duration_since(now);
        if remaining > self.interval {
            Tick::Poll(self.interval)
        } else {
            Tick::Expire(remaining)
        }
    }
}

/// Next step of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Sleep for the given duration, then poll.
    Poll(Duration),
    /// Sleep for the given duration, then fail with a timeout.
    Expire(Duration),
}

/// Why a guarded wait ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Cancelled,
    Expired,
}

/// Runs `fut` unless the context is cancelled or the deadline passes first.
///
/// When several branches are ready at once, cancellation wins over expiry
/// and both win over the future.
pub(crate) async fn guard<F: Future>(
    ctx: &CallContext,
    deadline: Instant,
    fut: F,
) -> Result<F::Output, Interrupt> {
    tokio::select! {
        biased;
        _ = ctx.cancellation_token().cancelled() => Err(Interrupt::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Err(Interrupt::Expired),
        out = fut => Ok(out),
    }
}

/// A job accepted by the backend and awaiting completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PollTarget {
    pub request_id: String,
    pub attempt: u32,
}

impl PollTarget {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            attempt: 0,
        }
    }

    /// Same job, one more attempt. The identifier never changes.
    pub fn next(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self
        }
    }
}

/// Non-terminal states of a call. Terminal outcomes leave the loop directly.
#[derive(Debug)]
pub(crate) enum CallState {
    /// Composing the initial request.
    Building,
    /// A request is ready to go on the wire.
    Sent {
        request: reqwest::Request,
        poll: Option<PollTarget>,
    },
    /// A reply arrived and must be classified.
    Decoding {
        status: StatusCode,
        body: Vec<u8>,
        poll: Option<PollTarget>,
    },
    /// Waiting out the interval before the next poll.
    Polling(PollTarget),
}

impl CallState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Sent { .. } => "sent",
            Self::Decoding { .. } => "decoding",
            Self::Polling(_) => "polling",
        }
    }
}
