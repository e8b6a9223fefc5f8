pub(crate) fn default_speed() -> f32 {
    1.0
}

pub(crate) fn default_pitch() -> f32 {
    1.0
}

pub(crate) fn default_volume() -> f32 {
    1.0
}

pub(crate) fn default_chunk_gap_ms() -> u64 {
    100
}

pub(crate) fn default_tick_interval_ms() -> u64 {
    100
}

pub(crate) fn default_max_chunk_chars() -> usize {
    crate::text_utils::DEFAULT_MAX_CHUNK_CHARS
}

pub(crate) fn default_words_per_minute() -> f64 {
    crate::progress::DEFAULT_WORDS_PER_MINUTE
}

pub(crate) fn default_chars_per_word() -> f64 {
    crate::progress::DEFAULT_CHARS_PER_WORD
}

pub(crate) fn default_preferred_languages() -> Vec<String> {
    vec!["en-US".to_string(), "en-GB".to_string()]
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
