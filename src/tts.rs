//! Speech synthesis capability consumed by the narration controller.
//!
//! The controller never produces audio itself. Hosts plug in whatever the
//! platform offers (a browser speech API bridge, a native engine) behind
//! [`SpeechSynthesizer`] and feed completion events back through
//! `NarrationController::on_synthesis_event`.

use crate::error::NarrationResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use ts_rs::TS;

/// Identifier of one submitted utterance. Monotonic per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A voice reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Voice {
    pub name: String,
    /// BCP 47 style tag such as `en-US`; some platforms report `en_US`.
    pub lang: String,
    /// Installed on the device rather than served remotely.
    #[serde(default)]
    pub local_service: bool,
    #[serde(default)]
    pub default: bool,
}

impl Voice {
    pub fn new(name: &str, lang: &str, local_service: bool) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
            local_service,
            default: false,
        }
    }

    fn normalized_lang(&self) -> String {
        normalize_lang(&self.lang)
    }

    pub fn is_english(&self) -> bool {
        self.normalized_lang().starts_with("en")
    }

    pub fn matches_lang(&self, tag: &str) -> bool {
        self.normalized_lang() == normalize_lang(tag)
    }
}

fn normalize_lang(tag: &str) -> String {
    tag.trim().replace('_', "-").to_ascii_lowercase()
}

/// One unit of text handed to the synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub chunk_index: usize,
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Asynchronous notifications the synthesizer reports for an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Ended,
    Failed(String),
}

/// Failure reasons platforms use when an utterance was cut short by a
/// cancel rather than by a fault.
pub const INTERRUPTION_REASONS: [&str; 3] = ["interrupted", "canceled", "cancelled"];

pub fn is_interruption_reason(reason: &str) -> bool {
    let reason = reason.trim();
    INTERRUPTION_REASONS
        .iter()
        .any(|known| reason.eq_ignore_ascii_case(known))
}

/// Platform speech synthesis. Exactly one utterance is spoken at a time;
/// `cancel` aborts whatever is currently speaking or queued.
pub trait SpeechSynthesizer {
    fn is_available(&self) -> bool;

    fn voices(&self) -> Vec<Voice>;

    /// Queue `utterance` for speaking. Completion is reported later through
    /// the controller, not through the return value.
    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()>;

    fn cancel(&mut self);
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Box<T> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn voices(&self) -> Vec<Voice> {
        (**self).voices()
    }

    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()> {
        (**self).speak(utterance)
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

/// Pick the voice used for narration.
///
/// Locally installed English voices win; among them the first matching
/// entry of `preferred` (in order), else the first local English voice.
/// Without a local English voice, fall back to any English voice, then to
/// whatever the platform lists first.
pub fn select_voice<'a>(voices: &'a [Voice], preferred: &[String]) -> Option<&'a Voice> {
    let local_english: Vec<&Voice> = voices
        .iter()
        .filter(|voice| voice.local_service && voice.is_english())
        .collect();

    if let Some(first_local) = local_english.first() {
        let chosen = preferred
            .iter()
            .find_map(|tag| local_english.iter().find(|voice| voice.matches_lang(tag)))
            .copied()
            .unwrap_or(*first_local);
        debug!(voice = %chosen.name, lang = %chosen.lang, "Selected local English voice");
        return Some(chosen);
    }

    let fallback = voices
        .iter()
        .find(|voice| voice.is_english())
        .or_else(|| voices.first());
    if let Some(voice) = fallback {
        debug!(voice = %voice.name, lang = %voice.lang, "Selected fallback voice");
    }
    fallback
}

/// In-memory synthesizer that records what it was asked to do. Events are
/// not emitted on their own; callers report them to the controller.
#[derive(Debug, Clone)]
pub struct RecordingSynthesizer {
    pub available: bool,
    pub voices: Vec<Voice>,
    pub spoken: Vec<Utterance>,
    pub cancel_count: usize,
    /// When set, the next `speak` call fails with this reason.
    pub fail_next_speak: Option<String>,
}

impl Default for RecordingSynthesizer {
    fn default() -> Self {
        Self {
            available: true,
            voices: vec![Voice::new("Dry Run", "en-US", true)],
            spoken: Vec::new(),
            cancel_count: 0,
            fail_next_speak: None,
        }
    }
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            voices: Vec::new(),
            ..Self::default()
        }
    }

    pub fn last_spoken(&self) -> Option<&Utterance> {
        self.spoken.last()
    }
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn is_available(&self) -> bool {
        self.available
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> NarrationResult<()> {
        if let Some(reason) = self.fail_next_speak.take() {
            return Err(crate::error::NarrationError::SynthesisError(reason));
        }
        self.spoken.push(utterance.clone());
        Ok(())
    }

    fn cancel(&mut self) {
        self.cancel_count += 1;
    }
}
