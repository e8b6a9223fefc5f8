//! TypeScript bindings for the host widget.

use crate::config::ThemeColors;
use crate::narration::{NarrationSnapshot, NarrationStatus, PlaybackState};
use crate::post::{NarratorProps, PlayerOptions, Post};
use crate::progress::ProgressState;
use crate::tts::Voice;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use ts_rs::TS;

pub const DEFAULT_BINDINGS_DIR: &str = "ui/src/generated";

const INDEX_TS: &str = r#"export type { Post } from "./Post";
export type { PlayerOptions } from "./PlayerOptions";
export type { NarratorProps } from "./NarratorProps";
export type { ThemeColors } from "./ThemeColors";
export type { Voice } from "./Voice";
export type { ProgressState } from "./ProgressState";
export type { PlaybackState } from "./PlaybackState";
export type { NarrationStatus } from "./NarrationStatus";
export type { NarrationSnapshot } from "./NarrationSnapshot";
"#;

fn export_single_type<T: TS + 'static>(out_dir: &Path) -> Result<()> {
    T::export_all_to(out_dir).with_context(|| format!("Exporting {}", T::name()))
}

/// Regenerate every `.ts` file in `out_dir`, removing stale ones first.
pub fn export_ts_bindings(out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("Creating {}", out_dir.display()))?;

    for entry in fs::read_dir(out_dir).with_context(|| format!("Listing {}", out_dir.display()))? {
        let path = entry.context("Reading bindings directory entry")?.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("ts") {
            fs::remove_file(&path).with_context(|| format!("Removing {}", path.display()))?;
        }
    }

    export_single_type::<Post>(out_dir)?;
    export_single_type::<PlayerOptions>(out_dir)?;
    export_single_type::<NarratorProps>(out_dir)?;
    export_single_type::<ThemeColors>(out_dir)?;
    export_single_type::<Voice>(out_dir)?;
    export_single_type::<ProgressState>(out_dir)?;
    export_single_type::<PlaybackState>(out_dir)?;
    export_single_type::<NarrationStatus>(out_dir)?;
    export_single_type::<NarrationSnapshot>(out_dir)?;

    let index = out_dir.join("index.ts");
    fs::write(&index, INDEX_TS).with_context(|| format!("Writing {}", index.display()))?;
    Ok(())
}
