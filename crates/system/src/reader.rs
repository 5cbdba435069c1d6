//! Raw counter reading from Linux procfs.
//!
//! Parsing is kept in pure `&str` functions so it can be tested against
//! fixture text; [`ProcfsSource`] only adds the file reads.

use mon_core::{
    CpuTicks, InterfaceCounters, MemoryCounters, MonitorError, RawCounterSnapshot, Result,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Anything that can produce a [`RawCounterSnapshot`] on demand.
pub trait CounterSource {
    fn read(&mut self) -> Result<RawCounterSnapshot>;
}

/// Reads `stat`, `meminfo` and `net/dev` under a procfs mount point.
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl ProcfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_file(&self, relative: &str) -> Result<String> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path)
            .map_err(|source| MonitorError::SourceUnavailable { path, source })
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl CounterSource for ProcfsSource {
    fn read(&mut self) -> Result<RawCounterSnapshot> {
        let cpu = parse_cpu_ticks(&self.read_file("stat")?)?;
        let memory = parse_meminfo(&self.read_file("meminfo")?)?;
        let interfaces = parse_net_dev(&self.read_file("net/dev")?);

        Ok(RawCounterSnapshot {
            cpu,
            memory,
            interfaces,
        })
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// The first four counters are mandatory; later ones were added by newer
/// kernels and read as `0` when absent.
pub fn parse_cpu_ticks(stat: &str) -> Result<CpuTicks> {
    let line = stat
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| MonitorError::malformed("stat", "no aggregate cpu line"))?;

    let values = line
        .split_whitespace()
        .skip(1)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| MonitorError::malformed("stat", format!("field '{field}': {e}")))
        })
        .collect::<Result<Vec<u64>>>()?;

    if values.len() < 4 {
        return Err(MonitorError::malformed(
            "stat",
            format!("expected at least 4 cpu fields, found {}", values.len()),
        ));
    }

    let at = |i: usize| values.get(i).copied().unwrap_or(0);
    Ok(CpuTicks {
        user:       at(0),
        nice:       at(1),
        system:     at(2),
        idle:       at(3),
        iowait:     at(4),
        irq:        at(5),
        softirq:    at(6),
        steal:      at(7),
        guest:      at(8),
        guest_nice: at(9),
    })
}

/// Parse `Key: value kB` pairs from `/proc/meminfo`.
pub fn parse_meminfo(meminfo: &str) -> Result<MemoryCounters> {
    let mut mem_total = None;
    let mut mem_free = None;
    let mut mem_available = None;
    let mut swap_total = None;
    let mut swap_free = None;

    for line in meminfo.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal"     => &mut mem_total,
            "MemFree"      => &mut mem_free,
            "MemAvailable" => &mut mem_available,
            "SwapTotal"    => &mut swap_total,
            "SwapFree"     => &mut swap_free,
            _ => continue,
        };
        let raw = rest.split_whitespace().next().unwrap_or("");
        let value = raw
            .parse::<u64>()
            .map_err(|e| MonitorError::malformed("meminfo", format!("{}: '{raw}': {e}", key.trim())))?;
        *slot = Some(value);
    }

    let require = |value: Option<u64>, key: &str| {
        value.ok_or_else(|| MonitorError::malformed("meminfo", format!("missing {key}")))
    };

    Ok(MemoryCounters {
        mem_total_kib:     require(mem_total, "MemTotal")?,
        mem_free_kib:      require(mem_free, "MemFree")?,
        mem_available_kib: mem_available,
        swap_total_kib:    require(swap_total, "SwapTotal")?,
        swap_free_kib:     require(swap_free, "SwapFree")?,
    })
}

/// Parse per-interface byte counters from `/proc/net/dev`.
///
/// Receive bytes is the first counter after the name, transmit bytes the
/// ninth. Lines that don't parse (header rows, an interface vanishing
/// mid-read) are skipped rather than failing the whole read.
pub fn parse_net_dev(net_dev: &str) -> BTreeMap<String, InterfaceCounters> {
    let mut interfaces = BTreeMap::new();

    for line in net_dev.lines() {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let fields: Vec<u64> = match counters
            .split_whitespace()
            .map(str::parse::<u64>)
            .collect()
        {
            Ok(fields) => fields,
            Err(e) => {
                debug!("skipping interface '{name}': {e}");
                continue;
            }
        };

        match (fields.first(), fields.get(8)) {
            (Some(&rx_bytes), Some(&tx_bytes)) => {
                interfaces.insert(name.to_string(), InterfaceCounters { rx_bytes, tx_bytes });
            }
            _ => debug!("skipping interface '{name}': only {} counters", fields.len()),
        }
    }

    interfaces
}
