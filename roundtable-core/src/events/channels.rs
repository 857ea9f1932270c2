//! Channel factories for handing data to collaborators outside the core.

use super::types::RunTranscript;
use tokio::sync::mpsc;

/// Default buffer size for hand-off channels.
///
/// Transcripts are handed off without waiting, so the buffer only has to
/// absorb a persistence backlog of a few runs.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender half used by the controller's finalizer.
pub type TranscriptSender = mpsc::Sender<RunTranscript>;
/// Receiver half owned by the persistence collaborator.
pub type TranscriptReceiver = mpsc::Receiver<RunTranscript>;

/// Create a new transcript hand-off channel.
pub fn transcript_channel() -> (TranscriptSender, TranscriptReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
