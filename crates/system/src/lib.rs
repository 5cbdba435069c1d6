pub mod calc;
pub mod history;
pub mod reader;
pub mod sampler;
pub mod units;

pub use calc::{CpuCalculator, MemoryUsage, NetworkCalculator, NetworkRates};
pub use history::RingBuffer;
pub use reader::{CounterSource, ProcfsSource};
pub use sampler::{Monitor, MonitorHandle, MonitorState, Sampler, SamplerSettings, TickOutcome};

use std::path::PathBuf;

/// Start a monitor reading procfs under `procfs_root` on a background Tokio
/// task.
///
/// The task stops when [`MonitorHandle::stop`] is awaited or the handle is
/// dropped.
pub fn spawn_monitor(procfs_root: impl Into<PathBuf>, settings: SamplerSettings) -> MonitorHandle {
    let source = ProcfsSource::new(procfs_root);
    tracing::info!("Reading counters from {}", source.root().display());
    Monitor::new(source, settings).start()
}
