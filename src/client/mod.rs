//! OSC transport client.
//!
//! Connects to one peer, queues packets while the link is down and retries
//! with a fixed delay up to a bounded number of attempts.

#[allow(clippy::module_inception)]
mod client;

pub use client::*;
