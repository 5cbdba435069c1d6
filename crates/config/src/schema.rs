use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure parsed from `mon.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonConfig {
    /// Sampling cadence and history length.
    pub sampler: SamplerConfig,
    /// Where counters are read from.
    pub source: SourceConfig,
    /// How the `mon` binary prints each tick.
    pub output: OutputConfig,
}

/// Sampler loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Tick period in milliseconds.
    pub interval_ms: u64,
    /// Samples retained per history stream.
    pub history_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms:      1_000,
            history_capacity: 60,
        }
    }
}

/// Counter source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Mount point of procfs.
    pub procfs_root: PathBuf,
    /// Interfaces left out of throughput totals. Loopback is always excluded.
    pub exclude_interfaces: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            procfs_root:        PathBuf::from("/proc"),
            exclude_interfaces: vec!["lo".to_string()],
        }
    }
}

/// Output settings for the headless binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Line format printed on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
