mod file_config;

pub use file_config::{FileConfig, SyncFileConfig};

use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_TIME_FACTOR: f64 = 0.001;
pub const DEFAULT_ADDON_ID: &str = "plugin.video.plexkodiconnect";
pub const DEFAULT_COMMIT_EVERY: usize = 200;

/// When an already mirrored item is considered unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Skip items whose id and last-modified time match the mirror.
    #[default]
    IdAndUpdatedAt,
    /// Rewrite every item on every pass.
    AlwaysResync,
}

/// How playable locations are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum PathMode {
    /// File paths as the media server reports them.
    Direct,
    /// Plugin urls resolved by the player add-on at playback time.
    #[default]
    Addon,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub checksum_policy: Option<ChecksumPolicy>,
    pub path_mode: Option<PathMode>,
    pub commit_every: Option<usize>,
}

/// Engine settings, fixed for the lifetime of a `SyncEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSettings {
    pub time_factor: f64,
    pub checksum_policy: ChecksumPolicy,
    pub path_mode: PathMode,
    pub addon_id: String,
    /// Items per transaction in a batch; 0 commits once at the end.
    pub commit_every: usize,
    pub time_offset_secs: i64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            time_factor: DEFAULT_TIME_FACTOR,
            checksum_policy: ChecksumPolicy::default(),
            path_mode: PathMode::default(),
            addon_id: DEFAULT_ADDON_ID.to_string(),
            commit_every: DEFAULT_COMMIT_EVERY,
            time_offset_secs: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub sync: SyncSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let sync_file = file.sync.unwrap_or_default();
        let defaults = SyncSettings::default();

        let checksum_policy = match sync_file.checksum_policy {
            Some(s) => parse_value::<ChecksumPolicy>(&s, "checksum_policy")?,
            None => cli.checksum_policy.unwrap_or(defaults.checksum_policy),
        };
        let path_mode = match sync_file.path_mode {
            Some(s) => parse_value::<PathMode>(&s, "path_mode")?,
            None => cli.path_mode.unwrap_or(defaults.path_mode),
        };

        let time_factor = sync_file.time_factor.unwrap_or(defaults.time_factor);
        if !(time_factor.is_finite() && time_factor > 0.0) {
            bail!("time_factor must be a positive number, got {}", time_factor);
        }

        let sync = SyncSettings {
            time_factor,
            checksum_policy,
            path_mode,
            addon_id: sync_file.addon_id.unwrap_or(defaults.addon_id),
            commit_every: sync_file
                .commit_every
                .or(cli.commit_every)
                .unwrap_or(defaults.commit_every),
            time_offset_secs: sync_file
                .time_offset_secs
                .unwrap_or(defaults.time_offset_secs),
        };

        Ok(Self { db_dir, sync })
    }

    pub fn library_db_path(&self) -> PathBuf {
        self.db_dir.join("library.db")
    }

    pub fn identity_db_path(&self) -> PathBuf {
        self.db_dir.join("mirror_identity.db")
    }
}

/// Parses a TOML enum value using clap's ValueEnum names.
fn parse_value<T: ValueEnum>(s: &str, field: &str) -> Result<T> {
    T::from_str(s, true).map_err(|_| anyhow::anyhow!("Invalid {} '{}'", field, s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_value() {
        assert_eq!(
            parse_value::<ChecksumPolicy>("always_resync", "p").unwrap(),
            ChecksumPolicy::AlwaysResync
        );
        assert_eq!(
            parse_value::<PathMode>("DIRECT", "p").unwrap(),
            PathMode::Direct
        );
        assert!(parse_value::<PathMode>("sideways", "p").is_err());
    }

    #[test]
    fn test_resolve_cli_only_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            path_mode: Some(PathMode::Direct),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.sync.path_mode, PathMode::Direct);
        assert_eq!(config.sync.time_factor, DEFAULT_TIME_FACTOR);
        assert_eq!(config.sync.checksum_policy, ChecksumPolicy::IdAndUpdatedAt);
        assert_eq!(config.sync.commit_every, DEFAULT_COMMIT_EVERY);
        assert_eq!(config.sync.addon_id, DEFAULT_ADDON_ID);
        assert_eq!(config.library_db_path(), temp_dir.path().join("library.db"));
        assert_eq!(
            config.identity_db_path(),
            temp_dir.path().join("mirror_identity.db")
        );
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(PathBuf::from("/should/be/overridden")),
            path_mode: Some(PathMode::Direct),
            commit_every: Some(10),
            ..Default::default()
        };
        let file_config = FileConfig {
            db_dir: Some(temp_dir.path().to_string_lossy().to_string()),
            sync: Some(SyncFileConfig {
                path_mode: Some("addon".to_string()),
                checksum_policy: Some("always_resync".to_string()),
                time_offset_secs: Some(3600),
                ..Default::default()
            }),
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        assert_eq!(config.db_dir, temp_dir.path());
        assert_eq!(config.sync.path_mode, PathMode::Addon);
        assert_eq!(config.sync.checksum_policy, ChecksumPolicy::AlwaysResync);
        assert_eq!(config.sync.time_offset_secs, 3600);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.sync.commit_every, 10);
    }

    #[test]
    fn test_resolve_missing_db_dir_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_dir must be specified"));
    }

    #[test]
    fn test_resolve_db_dir_not_directory_error() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("not a directory"));
    }

    #[test]
    fn test_resolve_rejects_bad_values() {
        let temp_dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let bad_mode = FileConfig {
            sync: Some(SyncFileConfig {
                path_mode: Some("sideways".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(bad_mode)).is_err());

        let bad_factor = FileConfig {
            sync: Some(SyncFileConfig {
                time_factor: Some(0.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(AppConfig::resolve(&cli, Some(bad_factor)).is_err());
    }
}
