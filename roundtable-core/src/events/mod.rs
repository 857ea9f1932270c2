//! Event values and the channels that carry them out of the core.
//!
//! # Event Flow
//!
//! 1. Producers and the `RunController` call `Hub::publish`
//! 2. The hub assigns a sequence number and fans the event out to every
//!    subscriber channel
//! 3. When a run ends, its transcript is sent over a [`TranscriptSender`]
//!    to the persistence collaborator
//!
//! Events are immutable once published and shared between channels
//! behind an `Arc`.

pub mod channels;
pub mod types;

pub use channels::{DEFAULT_CHANNEL_BUFFER, TranscriptReceiver, TranscriptSender, transcript_channel};
pub use types::{ChannelId, Event, RunTranscript, SharedEvent};
