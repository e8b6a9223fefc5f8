use crate::progress::ProgressState;
use crate::tts::UtteranceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use ts_rs::TS;

/// Narration lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
    Error(String),
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            PlaybackState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => f.write_str("idle"),
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Paused => f.write_str("paused"),
            PlaybackState::Finished => f.write_str("finished"),
            PlaybackState::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Status line shown next to the controls. `Stopped` is an idle player that
/// still holds a position from an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum NarrationStatus {
    Ready,
    Playing,
    Paused,
    Stopped,
    Finished,
    Error,
}

impl NarrationStatus {
    pub fn label(self) -> &'static str {
        match self {
            NarrationStatus::Ready => "Ready",
            NarrationStatus::Playing => "Playing",
            NarrationStatus::Paused => "Paused",
            NarrationStatus::Stopped => "Stopped",
            NarrationStatus::Finished => "Finished",
            NarrationStatus::Error => "Error",
        }
    }
}

/// Serializable view of the controller for the host UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct NarrationSnapshot {
    pub state: PlaybackState,
    pub status: NarrationStatus,
    pub progress: ProgressState,
    pub chunk_count: usize,
    pub speed: f32,
    pub current_chunk: Option<String>,
    pub elapsed_label: String,
    pub total_label: String,
}

/// The single utterance the synthesizer is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InFlight {
    pub(crate) id: UtteranceId,
    pub(crate) chunk_index: usize,
    pub(crate) started: bool,
}

/// Chunk sequence plus cursor bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChunkCursor {
    pub(crate) chunks: Vec<String>,
    /// Set when a chunk ended and the next one is due after the gap.
    pub(crate) advance_due: Option<Instant>,
}

impl ChunkCursor {
    pub(crate) fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks,
            advance_due: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(String::as_str)
    }

    pub(crate) fn clamp_index(&self, index: usize) -> usize {
        index.min(self.chunks.len().saturating_sub(1))
    }

    /// Chunk a seek to `percent` lands on.
    pub(crate) fn index_for_percent(&self, percent: f64) -> usize {
        let count = self.chunks.len();
        if count == 0 {
            return 0;
        }
        let raw = (percent / 100.0 * count as f64).floor();
        self.clamp_index(raw.max(0.0) as usize)
    }

    /// Share of the estimate that precedes chunk `index`.
    pub(crate) fn start_fraction(&self, index: usize) -> f64 {
        if self.chunks.is_empty() {
            return 0.0;
        }
        index as f64 / self.chunks.len() as f64
    }
}

/// Clamp a requested seek percentage; NaN maps to the start.
pub(crate) fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

pub(crate) fn status_for(state: &PlaybackState, position_held: bool) -> NarrationStatus {
    match state {
        PlaybackState::Idle if position_held => NarrationStatus::Stopped,
        PlaybackState::Idle => NarrationStatus::Ready,
        PlaybackState::Playing => NarrationStatus::Playing,
        PlaybackState::Paused => NarrationStatus::Paused,
        PlaybackState::Finished => NarrationStatus::Finished,
        PlaybackState::Error(_) => NarrationStatus::Error,
    }
}
