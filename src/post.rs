//! Caller-facing input types: the post being narrated and the pass-through
//! props a host attaches to the player.

use crate::config::ThemeColors;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use ts_rs::TS;

/// A blog post as delivered by the content API. Only the fields the narrator
/// reads are modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct Post {
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Raw HTML body.
    #[serde(default)]
    pub content: String,
}

impl Post {
    pub fn new(title: impl Into<String>, excerpt: Option<&str>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            excerpt: excerpt.map(str::to_string),
            content: content.into(),
        }
    }

    /// Stable digest of the narratable fields. Two posts with the same
    /// fingerprint produce the same chunk sequence.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.title.as_bytes());
        hasher.update([0u8]);
        if let Some(excerpt) = &self.excerpt {
            hasher.update(excerpt.as_bytes());
        }
        hasher.update([0u8]);
        hasher.update(self.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Player options the host passes alongside the post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct PlayerOptions {
    #[serde(default)]
    pub theme: Option<ThemeColors>,
}

/// Everything the embedding page hands to the narrator widget.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct NarratorProps {
    pub post: Post,
    #[serde(default)]
    pub config: PlayerOptions,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
}

/// Read a post from a JSON file. Accepts either a bare post or a full
/// `NarratorProps` object with a `post` field.
pub fn load_post(path: &Path) -> anyhow::Result<Post> {
    use anyhow::Context;

    let data = fs::read_to_string(path)
        .with_context(|| format!("Reading post from {}", path.display()))?;
    if let Ok(props) = serde_json::from_str::<NarratorProps>(&data) {
        return Ok(props.post);
    }
    serde_json::from_str::<Post>(&data)
        .with_context(|| format!("Parsing post JSON in {}", path.display()))
}
