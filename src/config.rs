use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::resource::DEFAULT_FETCH_TIMEOUT;
use crate::{Result, SnapshotError};

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Propagate the first image/background/font failure instead of logging
    /// it and leaving the resource as is.
    pub strict_resources: bool,
    /// Modifier group used when a capture does not name one.
    pub default_group: Option<String>,
    pub fetch: FetchConfig,
    pub raster: RasterConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RasterConfig {
    /// Pause between decoding the SVG and drawing it, for platforms that
    /// report an image as loaded before it can be painted. Zero disables it.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl Config {
    /// `~/.config/domsnap/config.toml`, when a home directory is known.
    pub fn central_config_path() -> Option<PathBuf> {
        let home = std::env::var_os("HOME")?;
        Some(PathBuf::from(home).join(".config/domsnap/config.toml"))
    }

    /// Loads `path`, else the central config when it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::central_config_path().filter(|p| p.exists()) {
                Some(central) => central,
                None => return Ok(Self::default()),
            },
        };
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SnapshotError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.timeout.is_zero() {
            return Err(SnapshotError::Config(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        if self
            .default_group
            .as_deref()
            .is_some_and(|g| g.trim().is_empty())
        {
            return Err(SnapshotError::Config(
                "default_group must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
