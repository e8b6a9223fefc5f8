use super::defaults;
use super::models::{LogLevel, NarrationConfig, ThemeColors};
use serde::Deserialize;

/// On-disk layout: one table per concern.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    playback: PlaybackConfig,
    #[serde(default)]
    chunking: ChunkingConfig,
    #[serde(default)]
    voice: VoiceConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    theme: ThemeColors,
}

impl From<ConfigTables> for NarrationConfig {
    fn from(tables: ConfigTables) -> Self {
        NarrationConfig {
            speed: tables.playback.speed,
            pitch: tables.voice.pitch,
            volume: tables.voice.volume,
            chunk_gap_ms: tables.playback.chunk_gap_ms,
            tick_interval_ms: tables.playback.tick_interval_ms,
            max_chunk_chars: tables.chunking.max_chunk_chars,
            words_per_minute: tables.chunking.words_per_minute,
            chars_per_word: tables.chunking.chars_per_word,
            preferred_languages: tables.voice.preferred_languages,
            log_level: tables.logging.log_level,
            theme: tables.theme,
        }
    }
}

impl From<&NarrationConfig> for ConfigTables {
    fn from(config: &NarrationConfig) -> Self {
        ConfigTables {
            playback: PlaybackConfig {
                speed: config.speed,
                chunk_gap_ms: config.chunk_gap_ms,
                tick_interval_ms: config.tick_interval_ms,
            },
            chunking: ChunkingConfig {
                max_chunk_chars: config.max_chunk_chars,
                words_per_minute: config.words_per_minute,
                chars_per_word: config.chars_per_word,
            },
            voice: VoiceConfig {
                preferred_languages: config.preferred_languages.clone(),
                pitch: config.pitch,
                volume: config.volume,
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            theme: config.theme.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct PlaybackConfig {
    #[serde(default = "defaults::default_speed")]
    speed: f32,
    #[serde(default = "defaults::default_chunk_gap_ms")]
    chunk_gap_ms: u64,
    #[serde(default = "defaults::default_tick_interval_ms")]
    tick_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            speed: defaults::default_speed(),
            chunk_gap_ms: defaults::default_chunk_gap_ms(),
            tick_interval_ms: defaults::default_tick_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ChunkingConfig {
    #[serde(default = "defaults::default_max_chunk_chars")]
    max_chunk_chars: usize,
    #[serde(default = "defaults::default_words_per_minute")]
    words_per_minute: f64,
    #[serde(default = "defaults::default_chars_per_word")]
    chars_per_word: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            max_chunk_chars: defaults::default_max_chunk_chars(),
            words_per_minute: defaults::default_words_per_minute(),
            chars_per_word: defaults::default_chars_per_word(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct VoiceConfig {
    #[serde(default = "defaults::default_preferred_languages")]
    preferred_languages: Vec<String>,
    #[serde(default = "defaults::default_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_volume")]
    volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            preferred_languages: defaults::default_preferred_languages(),
            pitch: defaults::default_pitch(),
            volume: defaults::default_volume(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
