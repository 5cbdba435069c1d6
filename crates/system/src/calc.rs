//! Turns consecutive raw counter snapshots into percentages and rates.

use mon_core::{CpuTicks, InterfaceCounters, MemoryCounters, MonitorError};
use std::collections::BTreeMap;
use tracing::debug;

/// Loopback never counts towards throughput, whatever the config says.
pub const LOOPBACK: &str = "lo";

/// CPU busy percentage from tick deltas.
///
/// Holds the previous tick counts as its baseline and the last non-zero
/// reading, which is repeated whenever a delta can't be trusted so graphs
/// stay continuous.
#[derive(Debug, Clone, Default)]
pub struct CpuCalculator {
    baseline:    Option<CpuTicks>,
    last_good:   f64,
    regressions: u64,
}

impl CpuCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Busy percentage since the previous call, in `[0, 100]`.
    ///
    /// The first call only records a baseline and returns `0.0`.
    pub fn update(&mut self, current: &CpuTicks) -> f64 {
        let Some(previous) = self.baseline.replace(*current) else {
            return 0.0;
        };

        let (total, prev_total) = (current.total(), previous.total());
        let (idle, prev_idle) = (current.idle_all(), previous.idle_all());

        if total < prev_total || idle < prev_idle {
            self.regressions += 1;
            debug!("{}", MonitorError::CounterRegression { stream: "cpu".into() });
            return self.last_good;
        }

        let total_delta = total - prev_total;
        let idle_delta = idle - prev_idle;
        if total_delta == 0 || idle_delta > total_delta {
            return self.last_good;
        }

        let busy = 100.0 * (total_delta - idle_delta) as f64 / total_delta as f64;
        let busy = busy.clamp(0.0, 100.0);
        if busy > 0.0 {
            self.last_good = busy;
        }
        busy
    }

    /// Last non-zero reading, or `0.0` if there hasn't been one.
    #[cfg(test)]
    fn last_good(&self) -> f64 {
        self.last_good
    }

    #[cfg(test)]
    fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn regressions(&self) -> u64 {
        self.regressions
    }
}

/// `100 * (1 - free/total)`, or `0.0` when `total` is zero.
pub fn used_percent(total: u64, free: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (100.0 * (1.0 - free as f64 / total as f64)).clamp(0.0, 100.0)
}

/// Memory and swap figures for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryUsage {
    pub memory_percent: f64,
    pub swap_percent: f64,
    pub memory_total_kib: u64,
    pub memory_available_kib: Option<u64>,
    pub swap_total_kib: u64,
}

impl MemoryUsage {
    /// Computed fresh from every snapshot; totals can change (memory hot-plug,
    /// `swapon`) so nothing is cached between ticks.
    pub fn from_counters(counters: &MemoryCounters) -> Self {
        Self {
            memory_percent: used_percent(counters.mem_total_kib, counters.mem_free_kib),
            swap_percent: used_percent(counters.swap_total_kib, counters.swap_free_kib),
            memory_total_kib: counters.mem_total_kib,
            memory_available_kib: counters.mem_available_kib,
            swap_total_kib: counters.swap_total_kib,
        }
    }
}

/// `(current - previous) / elapsed_secs`, or `None` if the counter went
/// backwards.
pub fn rate_per_sec(previous: u64, current: u64, elapsed_secs: f64) -> Option<f64> {
    let delta = current.checked_sub(previous)?;
    if !(elapsed_secs.is_finite() && elapsed_secs > 0.0) {
        return Some(0.0);
    }
    Some(delta as f64 / elapsed_secs)
}

/// Aggregate receive/transmit throughput in bytes per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkRates {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
}

/// Network throughput summed over every non-excluded interface.
#[derive(Debug, Clone)]
pub struct NetworkCalculator {
    baseline:    Option<BTreeMap<String, InterfaceCounters>>,
    excluded:    Vec<String>,
    regressions: u64,
}

impl Default for NetworkCalculator {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NetworkCalculator {
    /// `excluded` adds to the always-excluded loopback interface.
    pub fn new(excluded: Vec<String>) -> Self {
        Self {
            baseline: None,
            excluded,
            regressions: 0,
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        name == LOOPBACK || self.excluded.iter().any(|e| e == name)
    }

    /// Rates since the previous call.
    ///
    /// Only interfaces present in both snapshots contribute. A counter that
    /// went backwards contributes `0` this tick and becomes the new baseline.
    pub fn update(
        &mut self,
        current: &BTreeMap<String, InterfaceCounters>,
        elapsed_secs: f64,
    ) -> NetworkRates {
        let Some(previous) = self.baseline.replace(current.clone()) else {
            return NetworkRates::default();
        };

        let mut rates = NetworkRates::default();
        for (name, now) in current {
            if self.is_excluded(name) {
                continue;
            }
            let Some(before) = previous.get(name) else {
                continue;
            };

            for (prev, cur, total, direction) in [
                (before.rx_bytes, now.rx_bytes, &mut rates.rx_bytes_per_sec, "rx"),
                (before.tx_bytes, now.tx_bytes, &mut rates.tx_bytes_per_sec, "tx"),
            ] {
                match rate_per_sec(prev, cur, elapsed_secs) {
                    Some(rate) => *total += rate,
                    None => {
                        self.regressions += 1;
                        debug!(
                            "{}",
                            MonitorError::CounterRegression { stream: format!("{name} {direction}") }
                        );
                    }
                }
            }
        }
        rates
    }

    pub fn regressions(&self) -> u64 {
        self.regressions
    }
}
