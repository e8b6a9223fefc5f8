//! Configuration loading for the narrator.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/narrator.toml` if present. Any missing or invalid entries fall back
//! to sensible defaults so narration can still start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{DEFAULT_CONFIG_PATH, load_config, parse_config, serialize_config};
pub use models::{LogLevel, NarrationConfig, ThemeColors};
