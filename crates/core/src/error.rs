use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type used across the monitor workspace.
///
/// The sampler recovers from every variant it can see at runtime
/// (`SourceUnavailable`, `MalformedSample`, `CounterRegression`); only the
/// config and I/O variants ever reach `main`.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("statistics source '{}' unavailable: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed sample from {source_name}: {detail}")]
    MalformedSample {
        source_name: &'static str,
        detail: String,
    },

    #[error("counter regression on {stream}; baseline reset")]
    CounterRegression { stream: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl MonitorError {
    pub fn malformed(source_name: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedSample {
            source_name,
            detail: detail.into(),
        }
    }
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_unavailable_names_the_path() {
        let err = MonitorError::SourceUnavailable {
            path: PathBuf::from("/proc/stat"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/proc/stat"));
    }

    #[test]
    fn malformed_helper_builds_variant() {
        let err = MonitorError::malformed("meminfo", "missing MemTotal");
        assert!(matches!(
            err,
            MonitorError::MalformedSample { source_name: "meminfo", .. }
        ));
    }
}
