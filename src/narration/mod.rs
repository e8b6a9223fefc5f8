//! Narration playback controller.
//!
//! The controller owns the synthesizer, at most one in-flight utterance and
//! at most one progress clock. Every public operation applies its effects
//! (cancel, speak, clock start/stop) before returning, so the host only has
//! to forward UI actions, its ticker and synthesizer events.

mod state;
mod transitions;

pub use state::{NarrationSnapshot, NarrationStatus, PlaybackState};

use crate::cancellation::{CancelReason, CancellationLedger};
use crate::config::NarrationConfig;
use crate::error::{NarrationError, NarrationResult};
use crate::post::Post;
use crate::progress::{DurationEstimator, ProgressClock, ProgressState, format_timestamp};
use crate::speed::Speed;
use crate::text_prep::prepare_narration;
use crate::text_utils::chunk_text;
use crate::tts::{SpeechSynthesizer, Utterance, UtteranceId, Voice, select_voice};
use state::{ChunkCursor, InFlight, clamp_percent, status_for};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Host page visibility as reported by the embedding document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

pub struct NarrationController<S: SpeechSynthesizer> {
    synth: S,
    config: NarrationConfig,
    estimator: DurationEstimator,
    speed: Speed,
    voice: Option<Voice>,
    post_fingerprint: Option<String>,
    text: String,
    cursor: ChunkCursor,
    state: PlaybackState,
    progress: ProgressState,
    clock: Option<ProgressClock>,
    in_flight: Option<InFlight>,
    cancellations: CancellationLedger,
    /// Idle/Error with a position worth resuming from.
    position_held: bool,
    next_utterance: u64,
}

impl<S: SpeechSynthesizer> NarrationController<S> {
    pub fn new(synth: S, config: NarrationConfig) -> Self {
        let voice = select_voice(&synth.voices(), &config.preferred_languages).cloned();
        let speed = config.initial_speed();
        info!(
            speed = speed.value(),
            voice = voice.as_ref().map(|v| v.name.as_str()).unwrap_or("<platform default>"),
            "Narration controller ready"
        );
        Self {
            estimator: config.estimator(),
            synth,
            config,
            speed,
            voice,
            post_fingerprint: None,
            text: String::new(),
            cursor: ChunkCursor::default(),
            state: PlaybackState::Idle,
            progress: ProgressState::default(),
            clock: None,
            in_flight: None,
            cancellations: CancellationLedger::new(),
            position_held: false,
            next_utterance: 0,
        }
    }

    /// Prepare `post` for narration. Returns `false` when the post is the one
    /// already loaded, in which case playback is left untouched.
    pub fn load_post(&mut self, post: &Post) -> bool {
        let fingerprint = post.fingerprint();
        if self.post_fingerprint.as_deref() == Some(fingerprint.as_str()) {
            debug!("Post unchanged; keeping narration state");
            return false;
        }

        self.release(CancelReason::PostChanged);
        self.text = prepare_narration(post);
        self.cursor = ChunkCursor::new(chunk_text(&self.text, self.config.max_chunk_chars));
        self.progress = ProgressState::new(self.estimator.estimate_secs(&self.text, self.speed.value()));
        self.state = PlaybackState::Idle;
        self.position_held = false;
        self.post_fingerprint = Some(fingerprint);
        info!(
            title = %post.title,
            chars = self.text.chars().count(),
            chunks = self.cursor.len(),
            estimated_secs = self.progress.estimated_duration_secs,
            "Loaded post for narration"
        );
        true
    }

    /// Start narration, or continue it when paused or stopped.
    pub fn play(&mut self, now: Instant) -> NarrationResult<()> {
        match self.state {
            PlaybackState::Playing => {
                debug!("Play requested while already playing");
                return Ok(());
            }
            PlaybackState::Paused => return self.resume(now),
            _ => {}
        }

        if !self.synth.is_available() {
            return self.halt(NarrationError::UnsupportedCapability, now);
        }
        if self.text.trim().is_empty() || self.cursor.is_empty() {
            return self.halt(NarrationError::EmptyContent, now);
        }

        let resume_held = self.position_held
            && matches!(self.state, PlaybackState::Idle | PlaybackState::Error(_))
            && self.progress.current_chunk_index < self.cursor.len();

        if resume_held {
            let offset = Duration::from_secs_f64(self.progress.elapsed_secs);
            self.clock = Some(ProgressClock::start(now, offset));
            info!(
                chunk_idx = self.progress.current_chunk_index,
                elapsed_secs = self.progress.elapsed_secs,
                "Resuming narration from held position"
            );
        } else {
            self.progress.reset();
            self.clock = Some(ProgressClock::start(now, Duration::ZERO));
            info!(chunks = self.cursor.len(), "Starting narration from the beginning");
        }

        self.cursor.advance_due = None;
        self.position_held = false;
        self.state = PlaybackState::Playing;
        self.speak_current(now)
    }

    pub fn pause(&mut self, now: Instant) -> NarrationResult<()> {
        if !self.state.is_playing() {
            return Err(NarrationError::InvalidState(format!(
                "cannot pause while {}",
                self.state
            )));
        }
        self.pause_with(CancelReason::UserPaused, now);
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> NarrationResult<()> {
        if !self.state.is_paused() {
            return Err(NarrationError::InvalidState(format!(
                "cannot resume while {}",
                self.state
            )));
        }
        let paused_for = self
            .clock
            .as_mut()
            .map(|clock| clock.resume(now))
            .unwrap_or_default();
        info!(
            chunk_idx = self.progress.current_chunk_index,
            paused_ms = paused_for.as_millis() as u64,
            "Resuming narration"
        );
        self.state = PlaybackState::Playing;
        self.speak_current(now)
    }

    pub fn toggle_play_pause(&mut self, now: Instant) -> NarrationResult<()> {
        if self.state.is_playing() {
            self.pause(now)
        } else {
            self.play(now)
        }
    }

    /// Stop narration but keep the position, so a later `play` continues
    /// where the listener left off.
    pub fn stop(&mut self, now: Instant) {
        if !self.state.is_active() {
            debug!(state = %self.state, "Stop requested while not active");
            return;
        }
        self.apply_pending_advance();
        self.cancel_in_flight(CancelReason::UserStopped);
        self.sync_progress(now);
        self.clock = None;
        self.state = PlaybackState::Idle;
        self.position_held = true;
        info!(
            chunk_idx = self.progress.current_chunk_index,
            elapsed_secs = self.progress.elapsed_secs,
            "Stopped narration"
        );
    }

    /// Change narration speed. The duration estimate is recomputed and the
    /// relative position is kept; while playing, the current chunk is
    /// restarted at the new rate.
    pub fn set_speed(&mut self, value: f32, now: Instant) -> NarrationResult<()> {
        let speed = Speed::new(value)?;
        if speed == self.speed {
            return Ok(());
        }

        self.sync_progress(now);
        let fraction = self.progress.fraction();
        self.speed = speed;
        self.progress.estimated_duration_secs = self.estimator.estimate_secs(&self.text, speed.value());
        self.progress
            .set_elapsed(fraction * self.progress.estimated_duration_secs as f64);
        self.rebase_clock(now);
        info!(
            speed = speed.value(),
            estimated_secs = self.progress.estimated_duration_secs,
            "Adjusted narration speed"
        );

        if self.state.is_playing() && self.cursor.advance_due.is_none() {
            self.cancel_in_flight(CancelReason::SpeedChanged);
            return self.speak_current(now);
        }
        Ok(())
    }

    /// Jump to `percent` (0 to 100) of the estimated duration.
    pub fn seek(&mut self, percent: f64, now: Instant) -> NarrationResult<()> {
        if self.cursor.is_empty() {
            return Err(NarrationError::EmptyContent);
        }
        let percent = clamp_percent(percent);
        let index = self.cursor.index_for_percent(percent);
        let elapsed = percent / 100.0 * self.progress.estimated_duration_secs as f64;
        info!(percent, chunk_idx = index, "Seeking narration");
        self.reposition(index, elapsed, now)
    }

    /// Move to the next chunk.
    pub fn skip_forward(&mut self, now: Instant) -> NarrationResult<()> {
        if self.cursor.is_empty() {
            return Err(NarrationError::EmptyContent);
        }
        let current = self.progress.current_chunk_index;
        let target = self.cursor.clamp_index(current.saturating_add(1));
        if target == current {
            debug!(chunk_idx = current, "Already at last chunk");
            return Ok(());
        }
        self.reposition_to_chunk(target, now)
    }

    /// Move to the previous chunk.
    pub fn skip_backward(&mut self, now: Instant) -> NarrationResult<()> {
        if self.cursor.is_empty() {
            return Err(NarrationError::EmptyContent);
        }
        let current = self.cursor.clamp_index(self.progress.current_chunk_index);
        let target = current.saturating_sub(1);
        self.reposition_to_chunk(target, now)
    }

    /// Host page visibility changed. Hiding the page pauses narration;
    /// becoming visible again does not resume on its own.
    pub fn set_visibility(&mut self, visibility: Visibility, now: Instant) {
        if visibility == Visibility::Hidden && self.state.is_playing() {
            info!("Page hidden; pausing narration");
            self.pause_with(CancelReason::PageHidden, now);
        }
    }

    /// Clear a surfaced error. The position is kept.
    pub fn dismiss_error(&mut self) {
        if let PlaybackState::Error(message) = &self.state {
            debug!(%message, "Dismissed narration error");
            self.state = PlaybackState::Idle;
        }
    }

    /// Release the synthesizer and the clock. Called on drop as well.
    pub fn shutdown(&mut self) {
        if self.in_flight.is_some() || self.clock.is_some() {
            info!("Tearing down narration");
        }
        self.release(CancelReason::Teardown);
        if self.state.is_active() {
            self.state = PlaybackState::Idle;
            self.position_held = true;
        }
    }

    /// Re-run voice selection, for platforms that load voices lazily.
    pub fn refresh_voices(&mut self) {
        self.voice = select_voice(&self.synth.voices(), &self.config.preferred_languages).cloned();
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> NarrationStatus {
        status_for(&self.state, self.position_held)
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn chunks(&self) -> &[String] {
        &self.cursor.chunks
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.config
    }

    pub fn in_flight(&self) -> Option<UtteranceId> {
        self.in_flight.map(|flight| flight.id)
    }

    pub fn synthesizer(&self) -> &S {
        &self.synth
    }

    pub fn synthesizer_mut(&mut self) -> &mut S {
        &mut self.synth
    }

    /// Whether the host should keep calling [`Self::tick`].
    pub fn wants_ticks(&self) -> bool {
        self.state.is_playing()
    }

    pub fn tick_interval(&self) -> Duration {
        self.config.tick_interval()
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        NarrationSnapshot {
            state: self.state.clone(),
            status: self.status(),
            progress: self.progress,
            chunk_count: self.cursor.len(),
            speed: self.speed.value(),
            current_chunk: self
                .cursor
                .get(self.progress.current_chunk_index)
                .map(str::to_string),
            elapsed_label: format_timestamp(self.progress.elapsed_secs),
            total_label: format_timestamp(self.progress.estimated_duration_secs as f64),
        }
    }

    fn pause_with(&mut self, reason: CancelReason, now: Instant) {
        self.apply_pending_advance();
        self.cancel_in_flight(reason);
        self.sync_progress(now);
        if let Some(clock) = self.clock.as_mut() {
            clock.pause(now);
        }
        self.state = PlaybackState::Paused;
        info!(
            chunk_idx = self.progress.current_chunk_index,
            %reason,
            "Paused narration"
        );
    }

    fn reposition_to_chunk(&mut self, index: usize, now: Instant) -> NarrationResult<()> {
        let elapsed =
            self.cursor.start_fraction(index) * self.progress.estimated_duration_secs as f64;
        info!(chunk_idx = index, "Skipping to chunk");
        self.reposition(index, elapsed, now)
    }

    fn reposition(&mut self, index: usize, elapsed_secs: f64, now: Instant) -> NarrationResult<()> {
        self.cursor.advance_due = None;
        self.progress.current_chunk_index = index;
        self.progress.set_elapsed(elapsed_secs);
        self.rebase_clock(now);

        match self.state {
            PlaybackState::Playing => {
                self.cancel_in_flight(CancelReason::SeekRequested);
                self.speak_current(now)
            }
            PlaybackState::Paused | PlaybackState::Error(_) => Ok(()),
            PlaybackState::Idle | PlaybackState::Finished => {
                self.state = PlaybackState::Idle;
                self.position_held = true;
                Ok(())
            }
        }
    }

    /// Submit the chunk under the cursor. Anything still in flight is
    /// cancelled first so only one utterance is ever outstanding.
    fn speak_current(&mut self, now: Instant) -> NarrationResult<()> {
        self.cancel_in_flight(CancelReason::Superseded);
        let chunk_index = self.progress.current_chunk_index;
        let Some(text) = self.cursor.get(chunk_index).map(str::to_string) else {
            warn!(chunk_idx = chunk_index, "Cursor past last chunk; finishing");
            self.finish(None);
            return Ok(());
        };

        self.next_utterance = self.next_utterance.wrapping_add(1);
        let utterance = Utterance {
            id: UtteranceId(self.next_utterance),
            chunk_index,
            text,
            voice: self.voice.clone(),
            rate: self.speed.value(),
            pitch: self.config.pitch,
            volume: self.config.volume,
        };

        match self.synth.speak(&utterance) {
            Ok(()) => {
                debug!(
                    request_id = utterance.id.0,
                    chunk_idx = chunk_index,
                    rate = utterance.rate,
                    chars = utterance.text.chars().count(),
                    "Speaking chunk"
                );
                self.in_flight = Some(InFlight {
                    id: utterance.id,
                    chunk_index,
                    started: false,
                });
                Ok(())
            }
            Err(err) => self.halt(err, now),
        }
    }

    fn cancel_in_flight(&mut self, reason: CancelReason) {
        if let Some(flight) = self.in_flight.take() {
            debug!(
                request_id = flight.id.0,
                chunk_idx = flight.chunk_index,
                %reason,
                "Cancelling in-flight utterance"
            );
            self.cancellations.record(flight.id, reason);
            self.synth.cancel();
        }
    }

    /// A chunk ended during the inter-chunk gap: move the cursor now so a
    /// pause or stop resumes on the next chunk instead of repeating it.
    fn apply_pending_advance(&mut self) {
        if self.cursor.advance_due.take().is_some() {
            let next = self.progress.current_chunk_index + 1;
            self.progress.current_chunk_index = self.cursor.clamp_index(next);
        }
    }

    fn sync_progress(&mut self, now: Instant) {
        if let Some(clock) = &self.clock {
            self.progress.set_elapsed(clock.elapsed(now).as_secs_f64());
        }
    }

    fn rebase_clock(&mut self, now: Instant) {
        let elapsed = Duration::from_secs_f64(self.progress.elapsed_secs);
        if let Some(clock) = self.clock.as_mut() {
            clock.rebase(now, elapsed);
        }
    }

    /// Stop playback on a failure and surface it.
    fn halt(&mut self, err: NarrationError, now: Instant) -> NarrationResult<()> {
        self.sync_progress(now);
        self.cancel_in_flight(CancelReason::Superseded);
        self.cursor.advance_due = None;
        self.clock = None;
        self.position_held = true;
        self.state = PlaybackState::Error(err.to_string());
        warn!(
            chunk_idx = self.progress.current_chunk_index,
            "Narration halted: {err}"
        );
        Err(err)
    }

    fn finish(&mut self, reason: Option<CancelReason>) {
        if let Some(reason) = reason {
            self.cancel_in_flight(reason);
        }
        self.cursor.advance_due = None;
        self.clock = None;
        self.progress
            .set_elapsed(self.progress.estimated_duration_secs as f64);
        self.progress.current_chunk_index = self.cursor.len();
        self.position_held = false;
        self.state = PlaybackState::Finished;
        info!(chunks = self.cursor.len(), "Narration finished");
    }

    fn release(&mut self, reason: CancelReason) {
        self.cancel_in_flight(reason);
        self.cursor.advance_due = None;
        self.clock = None;
    }
}

impl<S: SpeechSynthesizer> Drop for NarrationController<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
