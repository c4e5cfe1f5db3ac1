use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};

/// File name looked up in the current directory and the user config directory.
pub const CONFIG_FILE_NAME: &str = "version-sync.toml";

/// Represents the complete configuration for version-sync.
///
/// Names the monitored repository and reference branch, the label prefix,
/// the artifacts to keep in step, and the poll interval.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_version_prefix")]
    pub version_prefix: String,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Working repository holding the marker and manifest files
    #[serde(default = "default_dir")]
    pub workdir: PathBuf,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub marker: MarkerConfig,

    #[serde(default)]
    pub manifest: Option<ManifestConfig>,

    #[serde(default)]
    pub behavior: BehaviorConfig,
}

fn default_version_prefix() -> String {
    "HYPE".to_string()
}

fn default_interval_secs() -> u64 {
    10
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_reference_branch() -> String {
    "development".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_marker_path() -> PathBuf {
    PathBuf::from("hype_maps")
}

fn default_true() -> bool {
    true
}

/// The repository whose reference branch drives the version label.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    #[serde(default = "default_dir")]
    pub repo_path: PathBuf,

    #[serde(default = "default_reference_branch")]
    pub reference_branch: String,

    /// Remote used both for fetching the source and pushing artifacts
    #[serde(default = "default_remote")]
    pub remote: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            repo_path: default_dir(),
            reference_branch: default_reference_branch(),
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MarkerConfig {
    /// Relative to `workdir`
    #[serde(default = "default_marker_path")]
    pub path: PathBuf,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            path: default_marker_path(),
        }
    }
}

/// The manifest file carrying a `version '...'` field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManifestConfig {
    /// Relative to `workdir`
    pub path: PathBuf,

    /// Branch the manifest lives on; the marker's branch when absent
    #[serde(default)]
    pub branch: Option<String>,
}

/// Configuration for behavior customization.
///
/// Controls what a pass does besides writing files.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BehaviorConfig {
    /// Fetch the monitored repository before resolving
    #[serde(default = "default_true")]
    pub fetch: bool,

    /// Push after committing
    #[serde(default = "default_true")]
    pub push: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            fetch: true,
            push: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version_prefix: default_version_prefix(),
            interval_secs: default_interval_secs(),
            workdir: default_dir(),
            source: SourceConfig::default(),
            marker: MarkerConfig::default(),
            manifest: None,
            behavior: BehaviorConfig::default(),
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| SyncError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings a pass cannot work with.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.version_prefix;
        if prefix.is_empty() {
            return Err(SyncError::config("version_prefix must not be empty"));
        }
        if prefix
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '"')
        {
            return Err(SyncError::config(format!(
                "version_prefix '{}' must not contain quotes or whitespace",
                prefix
            )));
        }

        if self.interval_secs == 0 {
            return Err(SyncError::config("interval_secs must be at least 1"));
        }

        if self.source.reference_branch.trim().is_empty() {
            return Err(SyncError::config("source.reference_branch must not be empty"));
        }

        if self.source.remote.trim().is_empty() {
            return Err(SyncError::config("source.remote must not be empty"));
        }

        check_relative("marker.path", &self.marker.path)?;
        if let Some(manifest) = &self.manifest {
            check_relative("manifest.path", &manifest.path)?;
            if manifest.branch.as_deref().is_some_and(|b| b.trim().is_empty()) {
                return Err(SyncError::config("manifest.branch must not be empty"));
            }
        }

        Ok(())
    }
}

fn check_relative(key: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(SyncError::config(format!("{} must not be empty", key)));
    }
    if path.is_absolute() {
        return Err(SyncError::config(format!(
            "{} must be relative to workdir, got {}",
            key,
            path.display()
        )));
    }
    Ok(())
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `version-sync.toml` in current directory
/// 3. `version-sync.toml` in user config directory
/// 4. Default configuration if no file found
///
/// # Arguments
/// * `config_path` - Optional path to custom configuration file
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If file exists but cannot be read, parsed or validated
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(),
    };

    match path {
        Some(path) => {
            let text = fs::read_to_string(&path).map_err(|e| {
                SyncError::config(format!("cannot read {}: {}", path.display(), e))
            })?;
            Config::from_toml(&text)
        }
        None => Ok(Config::default()),
    }
}

fn discover_config() -> Option<PathBuf> {
    let local = PathBuf::from(".").join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
