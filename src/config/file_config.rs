use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,

    // Engine tuning
    pub sync: Option<SyncFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SyncFileConfig {
    /// Multiplier from source time units to seconds
    pub time_factor: Option<f64>,
    /// "id_and_updated_at" or "always_resync"
    pub checksum_policy: Option<String>,
    /// "direct" or "addon"
    pub path_mode: Option<String>,
    pub addon_id: Option<String>,
    pub commit_every: Option<usize>,
    pub time_offset_secs: Option<i64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
