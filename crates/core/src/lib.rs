pub mod error;
pub mod state;

pub use error::{MonitorError, Result};
pub use state::{
    CpuTicks, HistorySnapshot, InterfaceCounters, MemoryCounters, MetricsFrame, MonitorStats,
    RawCounterSnapshot,
};
