//! Progress estimation for narration.
//!
//! The seek bar is driven by a heuristic duration derived from text length
//! and speed, not by the synthesizer: platform speech engines do not report
//! how long an utterance will take. A virtual clock advances while playing
//! and is rebased whenever the listener seeks.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use ts_rs::TS;

pub const DEFAULT_WORDS_PER_MINUTE: f64 = 150.0;
pub const DEFAULT_CHARS_PER_WORD: f64 = 5.0;

/// Reading-rate model used for the duration heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationEstimator {
    pub words_per_minute: f64,
    pub chars_per_word: f64,
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self {
            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            chars_per_word: DEFAULT_CHARS_PER_WORD,
        }
    }
}

impl DurationEstimator {
    /// Estimated seconds to read `text` aloud at `speed`, rounded up.
    /// Faster speech shortens the estimate proportionally.
    pub fn estimate_secs(&self, text: &str, speed: f32) -> u64 {
        let chars = text.chars().count() as f64;
        if chars == 0.0 || self.chars_per_word <= 0.0 || self.words_per_minute <= 0.0 {
            return 0;
        }
        let speed = if speed.is_finite() && speed > 0.0 {
            f64::from(speed)
        } else {
            1.0
        };
        let words = chars / self.chars_per_word;
        let effective_wpm = self.words_per_minute * speed;
        (words / effective_wpm * 60.0).ceil() as u64
    }

    /// Unrounded reading time; used to fake utterance lengths in dry runs.
    pub fn speaking_time(&self, text: &str, speed: f32) -> Duration {
        let chars = text.chars().count() as f64;
        if chars == 0.0 || self.chars_per_word <= 0.0 || self.words_per_minute <= 0.0 {
            return Duration::ZERO;
        }
        let speed = if speed.is_finite() && speed > 0.0 {
            f64::from(speed)
        } else {
            1.0
        };
        Duration::from_secs_f64(chars / self.chars_per_word / (self.words_per_minute * speed) * 60.0)
    }
}

/// [`DurationEstimator::estimate_secs`] with the default reading rate.
pub fn estimate_duration_secs(text: &str, speed: f32) -> u64 {
    DurationEstimator::default().estimate_secs(text, speed)
}

/// Seek-bar view of the narration position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
pub struct ProgressState {
    #[ts(type = "number")]
    pub estimated_duration_secs: u64,
    pub elapsed_secs: f64,
    /// 0 to 100.
    pub percent: f64,
    pub current_chunk_index: usize,
}

impl ProgressState {
    pub fn new(estimated_duration_secs: u64) -> Self {
        Self {
            estimated_duration_secs,
            ..Self::default()
        }
    }

    /// Store `elapsed_secs` clamped to the estimate and derive `percent`.
    pub fn set_elapsed(&mut self, elapsed_secs: f64) {
        let total = self.estimated_duration_secs as f64;
        self.elapsed_secs = if elapsed_secs.is_finite() {
            elapsed_secs.clamp(0.0, total)
        } else {
            0.0
        };
        self.percent = if total > 0.0 {
            (self.elapsed_secs / total * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Fraction of the estimate already elapsed, 0.0 to 1.0.
    pub fn fraction(&self) -> f64 {
        self.percent / 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.estimated_duration_secs > 0 && self.elapsed_secs >= self.estimated_duration_secs as f64
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.estimated_duration_secs);
    }
}

/// Virtual playback clock.
///
/// `elapsed = offset + (now - origin) - paused_total`, where `offset` holds
/// the position the clock was (re)started from. Time spent paused is
/// accumulated into `paused_total` and never counts as progress.
#[derive(Debug, Clone, Copy)]
pub struct ProgressClock {
    offset: Duration,
    origin: Instant,
    paused_total: Duration,
    paused_at: Option<Instant>,
}

impl ProgressClock {
    pub fn start(now: Instant, offset: Duration) -> Self {
        Self {
            offset,
            origin: now,
            paused_total: Duration::ZERO,
            paused_at: None,
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let reference = self.paused_at.unwrap_or(now);
        let running = reference
            .saturating_duration_since(self.origin)
            .saturating_sub(self.paused_total);
        self.offset + running
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused_at.is_none() {
            self.paused_at = Some(now);
        }
    }

    /// Resume after a pause; returns how long the clock was paused.
    pub fn resume(&mut self, now: Instant) -> Duration {
        match self.paused_at.take() {
            Some(paused_at) => {
                let span = now.saturating_duration_since(paused_at);
                self.paused_total += span;
                span
            }
            None => Duration::ZERO,
        }
    }

    pub fn paused_total(&self) -> Duration {
        self.paused_total
    }

    /// Jump the clock to `elapsed` without changing whether it is paused.
    pub fn rebase(&mut self, now: Instant, elapsed: Duration) {
        self.offset = elapsed;
        self.origin = self.paused_at.unwrap_or(now);
        self.paused_total = Duration::ZERO;
    }
}

/// `m:ss` readout used next to the seek bar.
pub fn format_timestamp(secs: f64) -> String {
    let whole = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_matches_reading_rate() {
        assert_eq!(estimate_duration_secs(&"x".repeat(750), 1.0), 60);
    }

    #[test]
    fn doubling_speed_halves_estimate() {
        let text = "x".repeat(750);
        assert_eq!(estimate_duration_secs(&text, 2.0), 30);
        assert_eq!(estimate_duration_secs(&text, 0.5), 120);
    }

    #[test]
    fn estimate_rounds_up() {
        // 10 chars = 2 words = 0.8s at 150 wpm.
        assert_eq!(estimate_duration_secs("0123456789", 1.0), 1);
        assert_eq!(estimate_duration_secs("", 1.0), 0);
    }

    #[test]
    fn percent_follows_elapsed_and_clamps() {
        let mut progress = ProgressState::new(60);
        progress.set_elapsed(15.0);
        assert_eq!(progress.percent, 25.0);
        progress.set_elapsed(90.0);
        assert_eq!(progress.elapsed_secs, 60.0);
        assert_eq!(progress.percent, 100.0);
        assert!(progress.is_complete());
        progress.set_elapsed(-3.0);
        assert_eq!(progress.percent, 0.0);
    }

    #[test]
    fn zero_estimate_reports_zero_percent() {
        let mut progress = ProgressState::new(0);
        progress.set_elapsed(5.0);
        assert_eq!(progress.percent, 0.0);
        assert!(!progress.is_complete());
    }

    #[test]
    fn clock_excludes_paused_time() {
        let t0 = Instant::now();
        let mut clock = ProgressClock::start(t0, Duration::ZERO);
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(4)), Duration::from_secs(4));

        clock.pause(t0 + Duration::from_secs(4));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(10)), Duration::from_secs(4));

        let paused = clock.resume(t0 + Duration::from_secs(10));
        assert_eq!(paused, Duration::from_secs(6));
        assert_eq!(clock.paused_total(), Duration::from_secs(6));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(12)), Duration::from_secs(6));
    }

    #[test]
    fn rebase_while_paused_holds_position() {
        let t0 = Instant::now();
        let mut clock = ProgressClock::start(t0, Duration::ZERO);
        clock.pause(t0 + Duration::from_secs(3));
        clock.rebase(t0 + Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(8)), Duration::from_secs(30));
        clock.resume(t0 + Duration::from_secs(9));
        assert_eq!(clock.elapsed(t0 + Duration::from_secs(11)), Duration::from_secs(32));
    }

    #[test]
    fn timestamps_are_minutes_and_padded_seconds() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(65.9), "1:05");
        assert_eq!(format_timestamp(600.0), "10:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00");
    }
}
