use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cumulative CPU time per category, in clock ticks, from the aggregate
/// `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuTicks {
    pub user:       u64,
    pub nice:       u64,
    pub system:     u64,
    pub idle:       u64,
    pub iowait:     u64,
    pub irq:        u64,
    pub softirq:    u64,
    pub steal:      u64,
    pub guest:      u64,
    pub guest_nice: u64,
}

impl CpuTicks {
    /// Sum of every category.
    #[must_use]
    pub fn total(&self) -> u64 {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
        .iter()
        .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Time spent doing nothing useful: `idle + iowait`.
    #[must_use]
    pub fn idle_all(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// Memory and swap totals from `/proc/meminfo`, all in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCounters {
    pub mem_total_kib:  u64,
    pub mem_free_kib:   u64,
    /// `MemAvailable`, absent on very old kernels.
    pub mem_available_kib: Option<u64>,
    pub swap_total_kib: u64,
    pub swap_free_kib:  u64,
}

/// Cumulative byte counters for one network interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Everything the counter reader captured at one instant.
///
/// A new snapshot supersedes the previous one every tick; nothing mutates
/// a snapshot once it has been read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCounterSnapshot {
    pub cpu: CpuTicks,
    pub memory: MemoryCounters,
    /// Keyed by interface name (e.g. `"eth0"`).
    pub interfaces: BTreeMap<String, InterfaceCounters>,
}

/// Current scalar values derived on the most recent tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsFrame {
    /// Aggregate CPU busy percentage (0.0 – 100.0).
    pub cpu_percent: f64,
    /// RAM used percentage (0.0 – 100.0).
    pub memory_percent: f64,
    /// Swap used percentage (0.0 – 100.0).
    pub swap_percent: f64,
    /// Network receive rate in bytes/second, loopback excluded.
    pub net_rx_bytes_per_sec: f64,
    /// Network transmit rate in bytes/second, loopback excluded.
    pub net_tx_bytes_per_sec: f64,
    /// Total RAM in KiB, for axis scaling and labels.
    pub memory_total_kib: u64,
    pub memory_available_kib: Option<u64>,
    /// Total swap in KiB; `0` means no swap configured.
    pub swap_total_kib: u64,
    /// Wall-clock time of the sample, `None` until the first successful read.
    pub sampled_at: Option<DateTime<Local>>,
    /// Number of ticks that produced this frame's history.
    pub tick: u64,
}

/// Running counters about the sampler itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub ticks: u64,
    pub samples: u64,
    pub failed_reads: u64,
    pub counter_regressions: u64,
}

/// Read-only copy of every tracked history, oldest sample first.
///
/// Owned by whoever receives it; the sampler keeps writing its own buffers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub cpu:    Vec<f64>,
    pub memory: Vec<f64>,
    pub swap:   Vec<f64>,
    pub net_rx: Vec<f64>,
    pub net_tx: Vec<f64>,
    pub latest: MetricsFrame,
    pub stats:  MonitorStats,
}

impl HistorySnapshot {
    /// All-zero history of `capacity` samples per stream.
    pub fn zeroed(capacity: usize) -> Self {
        Self {
            cpu:    vec![0.0; capacity],
            memory: vec![0.0; capacity],
            swap:   vec![0.0; capacity],
            net_rx: vec![0.0; capacity],
            net_tx: vec![0.0; capacity],
            latest: MetricsFrame::default(),
            stats:  MonitorStats::default(),
        }
    }

    /// Samples per stream.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cpu.len()
    }

    /// Highest rate in either network stream, for scaling a throughput graph.
    #[must_use]
    pub fn peak_rate(&self) -> f64 {
        self.net_rx
            .iter()
            .chain(self.net_tx.iter())
            .copied()
            .fold(0.0, f64::max)
    }
}
