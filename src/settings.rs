use std::path::Path;
use std::time::Duration;

use domsnap::{Config, SnapshotError};

/// Config after CLI overrides have been applied.
#[derive(Debug, Clone)]
pub struct ResolvedCaptureSettings {
    pub config: Config,
    pub group: Option<String>,
}

/// Merge CLI arguments with the config file, preferring CLI values when given.
pub fn resolve_capture_settings(
    cli_fetch_timeout: Option<u64>,
    cli_group: Option<String>,
    config: &Config,
) -> Result<ResolvedCaptureSettings, SnapshotError> {
    let mut config = config.clone();
    if let Some(secs) = cli_fetch_timeout {
        config.fetch.timeout = Duration::from_secs(secs);
    }
    config
        .validate()
        .map_err(|e| SnapshotError::Config(format!("Invalid --fetch-timeout: {e}")))?;

    let group = cli_group.or_else(|| config.default_group.clone());
    Ok(ResolvedCaptureSettings { config, group })
}

/// Load config from a TOML file, central config, or return defaults.
/// Priority: explicit path > ~/.config/domsnap/config.toml > defaults
pub fn load_config(path: Option<&Path>) -> Result<Config, SnapshotError> {
    let cfg = Config::load(path).map_err(|e| {
        let loc = path
            .map(|p| p.display().to_string())
            .or_else(|| Config::central_config_path().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "defaults".to_string());
        SnapshotError::Config(format!("Failed to read config {}: {}", loc, e))
    })?;

    cfg.validate().map_err(|e| {
        let prefix = path
            .map(|p| format!("Invalid config ({}): {}", p.display(), e))
            .unwrap_or_else(|| format!("Invalid config: {}", e));
        SnapshotError::Config(prefix)
    })?;
    Ok(cfg)
}

/// Format effective settings as a single-line string.
pub fn format_effective_config(
    settings: &ResolvedCaptureSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: fetch timeout={}ms, settle delay={}ms, strict resources={}, group={}",
        settings.config.fetch.timeout.as_millis(),
        settings.config.raster.settle_delay.as_millis(),
        settings.config.strict_resources,
        settings.group.as_deref().unwrap_or("<default>"),
    )
}
