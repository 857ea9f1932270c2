//! Shared types for the Roundtable live run hub.
//!
//! Everything that crosses the HTTP boundary lives here: request and
//! response objects, lifecycle payloads, the event-stream framing and the
//! reconnect policy used by clients. The HTTP client itself is behind the
//! `client` feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod backoff;
pub mod objects;
pub mod sse;

#[cfg(feature = "client")]
pub mod client;
