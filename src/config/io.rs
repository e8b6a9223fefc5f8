use super::models::NarrationConfig;
use super::tables::ConfigTables;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "conf/narrator.toml";

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> NarrationConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded narrator config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return NarrationConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err:#}");
            NarrationConfig::default()
        }
    }
}

/// Parse the sectioned TOML layout into a sanitized config.
pub fn parse_config(contents: &str) -> Result<NarrationConfig> {
    let tables: ConfigTables = toml::from_str(contents).context("Parsing narrator config")?;
    Ok(NarrationConfig::from(tables).sanitized())
}

pub fn serialize_config(config: &NarrationConfig) -> Result<String> {
    toml::to_string(&ConfigTables::from(config)).context("Serializing narrator config")
}
