//! Text-to-speech narration for blog posts.
//!
//! A post is reduced to plain narration text (`text_prep`), split into
//! sentence-aligned chunks (`text_utils`) and spoken one chunk at a time by
//! the [`NarrationController`], which also keeps an estimated progress
//! clock (`progress`). The platform synthesizer sits behind the
//! [`SpeechSynthesizer`] trait so hosts can plug in their own engine.

pub mod bindings;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod narration;
pub mod post;
pub mod progress;
pub mod simulate;
pub mod speed;
pub mod text_prep;
pub mod text_utils;
pub mod tts;

pub use config::NarrationConfig;
pub use error::{NarrationError, NarrationResult};
pub use narration::{NarrationController, NarrationSnapshot, NarrationStatus, PlaybackState, Visibility};
pub use post::{NarratorProps, PlayerOptions, Post};
pub use progress::ProgressState;
pub use speed::Speed;
pub use tts::{SpeechSynthesizer, SynthesisEvent, Utterance, UtteranceId, Voice};
