//! File-based run history.
//!
//! The [`HistoryStore`] is the persistence collaborator of the run
//! controller. Its writer loop receives finished transcripts over the
//! hand-off channel and stores each one as
//! `<dir>/conversation_<YYYYMMDD_HHMMSS>_<run8>.json`; the history API reads
//! them back.

use roundtable_core::events::{RunTranscript, TranscriptReceiver};
use roundtable_sdk::objects::{HistoryEntry, StoredTranscript};
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tokio::sync::watch;

const FILE_PREFIX: &str = "conversation_";
const FILE_EXTENSION: &str = "json";
const STAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid history id: {0}")]
    InvalidId(String),

    #[error("history entry not found: {0}")]
    NotFound(String),

    #[error("history i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("history encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("history timestamp error: {0}")]
    Format(#[from] time::error::Format),
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Id (file stem) under which a transcript is stored.
    pub fn entry_id(transcript: &StoredTranscript) -> Result<String, HistoryError> {
        let stamp = transcript.ended_at.format(STAMP_FORMAT)?;
        let run = transcript.run_id.simple().to_string();
        let run8 = &run[run.len() - 8..];
        Ok(format!("{FILE_PREFIX}{stamp}_{run8}"))
    }

    /// Write one transcript, returning its id.
    pub async fn save(&self, transcript: &RunTranscript) -> Result<String, HistoryError> {
        let stored = transcript.to_stored();
        let id = Self::entry_id(&stored)?;
        let json = serde_json::to_vec_pretty(&stored)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        // Write to a temp file and rename, so readers never see half a file.
        let path = self.path_of(&id);
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        Ok(id)
    }

    /// Summaries of every stored run, newest first.
    ///
    /// Files that cannot be parsed are skipped.
    pub async fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(file) = dir.next_entry().await? {
            let path = file.path();
            let Some(id) = history_id_of(&path) else {
                continue;
            };
            match read_transcript(&path).await {
                Ok(transcript) => entries.push(HistoryEntry {
                    id,
                    timestamp: transcript.ended_at,
                    scenario: transcript.name,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable history file");
                }
            }
        }

        entries.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(entries)
    }

    /// Load one stored transcript.
    pub async fn get(&self, id: &str) -> Result<StoredTranscript, HistoryError> {
        validate_id(id)?;
        let path = self.path_of(id);
        match read_transcript(&path).await {
            Err(HistoryError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(HistoryError::NotFound(id.to_string()))
            }
            other => other,
        }
    }

    /// Persist transcripts until shutdown.
    ///
    /// Transcripts already queued when the shutdown signal arrives are still
    /// written.
    pub async fn run(self, mut transcripts: TranscriptReceiver, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(dir = %self.dir.display(), "History writer started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::info!("History writer received shutdown signal");
                        break;
                    }
                }

                transcript = transcripts.recv() => {
                    match transcript {
                        Some(transcript) => self.persist(&transcript).await,
                        None => {
                            tracing::info!("Transcript channel closed");
                            return;
                        }
                    }
                }
            }
        }

        while let Ok(transcript) = transcripts.try_recv() {
            self.persist(&transcript).await;
        }
        tracing::info!("History writer shutdown complete");
    }

    async fn persist(&self, transcript: &RunTranscript) {
        match self.save(transcript).await {
            Ok(id) => tracing::info!(
                run_id = %transcript.run_id,
                %id,
                events = transcript.events.len(),
                "Run transcript saved"
            ),
            Err(e) => tracing::error!(
                run_id = %transcript.run_id,
                error = %e,
                "Failed to save run transcript"
            ),
        }
    }

    fn path_of(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{FILE_EXTENSION}"))
    }
}

/// Ids are file stems; anything that could leave the directory is refused.
fn validate_id(id: &str) -> Result<(), HistoryError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(HistoryError::InvalidId(id.to_string()))
    }
}

fn history_id_of(path: &Path) -> Option<String> {
    if path.extension()? != FILE_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.starts_with(FILE_PREFIX).then(|| stem.to_string())
}

async fn read_transcript(path: &Path) -> Result<StoredTranscript, HistoryError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
