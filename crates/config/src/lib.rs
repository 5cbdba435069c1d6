pub mod schema;

pub use schema::{MonConfig, OutputConfig, OutputFormat, SamplerConfig, SourceConfig};

use mon_core::{MonitorError, Result};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `MonConfig::default()` if
/// the file doesn't exist so the monitor always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<MonConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(MonConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<MonConfig> {
    let config: MonConfig =
        toml::from_str(raw).map_err(|e| MonitorError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Reject settings the sampler cannot run with.
pub fn validate(config: &MonConfig) -> Result<()> {
    if config.sampler.interval_ms == 0 {
        return Err(MonitorError::Config(
            "sampler.interval_ms must be greater than zero".into(),
        ));
    }
    if config.sampler.history_capacity == 0 {
        return Err(MonitorError::Config(
            "sampler.history_capacity must be greater than zero".into(),
        ));
    }
    Ok(())
}

/// Return the default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("mon").join("mon.toml")
}
