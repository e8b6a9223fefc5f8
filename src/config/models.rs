use crate::progress::DurationEstimator;
use crate::speed::Speed;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;
use ts_rs::TS;

/// Flattened narrator configuration; the on-disk layout lives in `tables`.
#[derive(Debug, Clone, PartialEq, Deserialize, serde::Serialize)]
pub struct NarrationConfig {
    #[serde(default = "crate::config::defaults::default_speed")]
    pub speed: f32,
    #[serde(default = "crate::config::defaults::default_pitch")]
    pub pitch: f32,
    #[serde(default = "crate::config::defaults::default_volume")]
    pub volume: f32,
    /// Silence between one chunk ending and the next being spoken.
    #[serde(default = "crate::config::defaults::default_chunk_gap_ms")]
    pub chunk_gap_ms: u64,
    /// How often the host should call `tick` while playing.
    #[serde(default = "crate::config::defaults::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "crate::config::defaults::default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "crate::config::defaults::default_words_per_minute")]
    pub words_per_minute: f64,
    #[serde(default = "crate::config::defaults::default_chars_per_word")]
    pub chars_per_word: f64,
    #[serde(default = "crate::config::defaults::default_preferred_languages")]
    pub preferred_languages: Vec<String>,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub theme: ThemeColors,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        use crate::config::defaults;

        NarrationConfig {
            speed: defaults::default_speed(),
            pitch: defaults::default_pitch(),
            volume: defaults::default_volume(),
            chunk_gap_ms: defaults::default_chunk_gap_ms(),
            tick_interval_ms: defaults::default_tick_interval_ms(),
            max_chunk_chars: defaults::default_max_chunk_chars(),
            words_per_minute: defaults::default_words_per_minute(),
            chars_per_word: defaults::default_chars_per_word(),
            preferred_languages: defaults::default_preferred_languages(),
            log_level: defaults::default_log_level(),
            theme: ThemeColors::default(),
        }
    }
}

impl NarrationConfig {
    pub fn chunk_gap(&self) -> Duration {
        Duration::from_millis(self.chunk_gap_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn estimator(&self) -> DurationEstimator {
        DurationEstimator {
            words_per_minute: self.words_per_minute,
            chars_per_word: self.chars_per_word,
        }
    }

    /// Starting speed; falls back to normal speed when the configured value
    /// is out of range.
    pub fn initial_speed(&self) -> Speed {
        Speed::new(self.speed).unwrap_or_default()
    }

    /// Clamp values that would break narration back into range.
    pub fn sanitized(mut self) -> Self {
        let clamped = Speed::clamped(self.speed).value();
        if (clamped - self.speed).abs() > f32::EPSILON {
            warn!(configured = self.speed, clamped, "Speed out of range; clamping");
            self.speed = clamped;
        }
        self.pitch = if self.pitch.is_finite() {
            self.pitch.clamp(0.0, 2.0)
        } else {
            1.0
        };
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if self.max_chunk_chars == 0 {
            warn!("max_chunk_chars must be positive; using default");
            self.max_chunk_chars = crate::config::defaults::default_max_chunk_chars();
        }
        if !(self.words_per_minute.is_finite() && self.words_per_minute > 0.0) {
            warn!(value = self.words_per_minute, "Invalid words_per_minute; using default");
            self.words_per_minute = crate::config::defaults::default_words_per_minute();
        }
        if !(self.chars_per_word.is_finite() && self.chars_per_word > 0.0) {
            warn!(value = self.chars_per_word, "Invalid chars_per_word; using default");
            self.chars_per_word = crate::config::defaults::default_chars_per_word();
        }
        self
    }
}

/// Optional player colors passed through to the host's renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, serde::Serialize, TS)]
pub struct ThemeColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
