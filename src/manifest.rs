use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::AudioAsset;
use crate::errors::PipelineError;

// @module: JSON sidecar listing a chapter's assets in playback order

/// Conventional manifest name inside a chapter work dir
pub const MANIFEST_FILE_NAME: &str = "subtitles.json";

/// One synthesized asset and the text spoken in it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    /// File name relative to the manifest's audio directory
    pub audio: String,
    /// Exact text sent to the engine
    pub text: String,
}

impl ManifestEntry {
    pub fn from_asset(asset: &AudioAsset) -> Self {
        Self {
            audio: asset.file_name(),
            text: asset.source_text.clone(),
        }
    }
}

/// Ordered manifest for one chapter or the introduction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_assets(assets: &[AudioAsset]) -> Self {
        Self {
            entries: assets.iter().map(ManifestEntry::from_asset).collect(),
        }
    }

    /// Write as a pretty-printed JSON array
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| PipelineError::MergeIo(format!("Failed to serialize manifest: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| PipelineError::MergeIo(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Read a manifest written by `save`
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::TimingInconsistency(format!("Cannot read manifest {}: {}", path.display(), e))
        })?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Input(format!("Malformed manifest {}: {}", path.display(), e)))?;
        Ok(Self { entries })
    }
}
