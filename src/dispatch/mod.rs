//! Request dispatch: building authenticated requests, classifying replies
//! and polling accepted jobs.
//!
//! A call moves through `building → sent → decoding`, and from there either
//! ends or enters `polling`, which loops back to `sent` with a poll request
//! keyed by the original request identifier. Waits are bounded by the
//! caller's cancellation token and the call deadline.

mod client;
mod poll;

pub use client::{ApiClient, POLL_ENDPOINT, USER_AGENT};
pub use poll::{PollPolicy, Tick};
