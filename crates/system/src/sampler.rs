//! Periodic sampling: read counters, derive metrics, record history.
//!
//! [`Sampler`] owns every history buffer and baseline and does one tick of
//! work synchronously. [`Monitor::start`] drives it from a Tokio interval
//! and hands back a [`MonitorHandle`], the only way other code sees the data.

use crate::calc::{CpuCalculator, MemoryUsage, NetworkCalculator};
use crate::history::RingBuffer;
use crate::reader::CounterSource;
use chrono::Local;
use mon_core::{HistorySnapshot, MetricsFrame, MonitorStats};
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Sampler tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerSettings {
    pub interval: Duration,
    pub history_capacity: usize,
    /// Interfaces left out of throughput, in addition to loopback.
    pub exclude_interfaces: Vec<String>,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            history_capacity: 60,
            exclude_interfaces: Vec::new(),
        }
    }
}

/// What happened on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counters were read and every history advanced by one sample.
    Sampled,
    /// The read failed; histories and baseline are unchanged.
    Skipped,
}

/// The five rolling histories, one per tracked stream.
#[derive(Debug, Clone)]
struct Histories {
    cpu:    RingBuffer,
    memory: RingBuffer,
    swap:   RingBuffer,
    net_rx: RingBuffer,
    net_tx: RingBuffer,
}

impl Histories {
    fn new(capacity: usize) -> Self {
        Self {
            cpu:    RingBuffer::new(capacity),
            memory: RingBuffer::new(capacity),
            swap:   RingBuffer::new(capacity),
            net_rx: RingBuffer::new(capacity),
            net_tx: RingBuffer::new(capacity),
        }
    }
}

/// Single-writer owner of all sampling state.
pub struct Sampler<S> {
    source:      S,
    cpu:         CpuCalculator,
    network:     NetworkCalculator,
    histories:   Histories,
    /// When the current baseline snapshot was read.
    baseline_at: Option<Instant>,
    latest:      MetricsFrame,
    stats:       MonitorStats,
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(source: S, settings: &SamplerSettings) -> Self {
        Self {
            source,
            cpu: CpuCalculator::new(),
            network: NetworkCalculator::new(settings.exclude_interfaces.clone()),
            histories: Histories::new(settings.history_capacity),
            baseline_at: None,
            latest: MetricsFrame::default(),
            stats: MonitorStats::default(),
        }
    }

    /// Run one sampling cycle at instant `now`.
    ///
    /// A failed read is logged and counted; the previous baseline stays in
    /// place so the next good read is differenced against it.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        self.stats.ticks += 1;

        let snapshot = match self.source.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.failed_reads += 1;
                warn!("Sample skipped: {e}");
                return TickOutcome::Skipped;
            }
        };

        let elapsed_secs = self
            .baseline_at
            .map(|at| now.saturating_duration_since(at).as_secs_f64())
            .unwrap_or(0.0);
        self.baseline_at = Some(now);

        let cpu_percent = self.cpu.update(&snapshot.cpu);
        let memory = MemoryUsage::from_counters(&snapshot.memory);
        let rates = self.network.update(&snapshot.interfaces, elapsed_secs);

        self.histories.cpu.push(cpu_percent);
        self.histories.memory.push(memory.memory_percent);
        self.histories.swap.push(memory.swap_percent);
        self.histories.net_rx.push(rates.rx_bytes_per_sec);
        self.histories.net_tx.push(rates.tx_bytes_per_sec);

        self.stats.samples += 1;
        self.stats.counter_regressions = self.cpu.regressions() + self.network.regressions();

        self.latest = MetricsFrame {
            cpu_percent,
            memory_percent: memory.memory_percent,
            swap_percent: memory.swap_percent,
            net_rx_bytes_per_sec: rates.rx_bytes_per_sec,
            net_tx_bytes_per_sec: rates.tx_bytes_per_sec,
            memory_total_kib: memory.memory_total_kib,
            memory_available_kib: memory.memory_available_kib,
            swap_total_kib: memory.swap_total_kib,
            sampled_at: Some(Local::now()),
            tick: self.stats.samples,
        };

        debug!(
            cpu = cpu_percent,
            mem = memory.memory_percent,
            rx = rates.rx_bytes_per_sec,
            tx = rates.tx_bytes_per_sec,
            elapsed_secs,
            "sampled"
        );
        TickOutcome::Sampled
    }

    /// Owned copy of every history plus the current scalar values.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            cpu:    self.histories.cpu.snapshot(),
            memory: self.histories.memory.snapshot(),
            swap:   self.histories.swap.snapshot(),
            net_rx: self.histories.net_rx.snapshot(),
            net_tx: self.histories.net_tx.snapshot(),
            latest: self.latest.clone(),
            stats:  self.stats,
        }
    }

    pub fn stats(&self) -> MonitorStats {
        self.stats
    }

    pub fn latest(&self) -> &MetricsFrame {
        &self.latest
    }
}

/// Lifecycle of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Running,
}

/// Shortest tick period a monitor will run with.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A monitor that has been configured but not started.
pub struct Monitor<S> {
    sampler:  Sampler<S>,
    interval: Duration,
    capacity: usize,
}

impl<S> Monitor<S>
where
    S: CounterSource + Send + 'static,
{
    /// A zero interval is raised to [`MIN_INTERVAL`].
    pub fn new(source: S, settings: SamplerSettings) -> Self {
        Self {
            sampler:  Sampler::new(source, &settings),
            interval: settings.interval.max(MIN_INTERVAL),
            capacity: settings.history_capacity.max(1),
        }
    }

    pub fn state(&self) -> MonitorState {
        MonitorState::Idle
    }

    /// Arm the timer on a background Tokio task. The first sample is taken
    /// immediately.
    pub fn start(self) -> MonitorHandle {
        let (history_tx, history_rx) = watch::channel(HistorySnapshot::zeroed(self.capacity));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            "Monitor started ({} ms interval, {} samples of history)",
            self.interval.as_millis(),
            self.capacity
        );
        let task = tokio::spawn(run_loop(self.sampler, self.interval, history_tx, shutdown_rx));

        MonitorHandle {
            history:  history_rx,
            shutdown: Some(shutdown_tx),
            task:     Some(task),
        }
    }
}

async fn run_loop<S: CounterSource>(
    mut sampler: Sampler<S>,
    interval: Duration,
    history: watch::Sender<HistorySnapshot>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            // Fires on `stop()` and when the handle is dropped.
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        sampler.tick(Instant::now());
        // Never blocks: unread updates collapse into the newest one.
        history.send_replace(sampler.snapshot());
    }

    info!("Monitor stopped after {} ticks", sampler.stats().ticks);
}

/// Handle to a running monitor.
///
/// Readers only ever get owned [`HistorySnapshot`] copies. Dropping the
/// handle stops sampling.
pub struct MonitorHandle {
    history:  watch::Receiver<HistorySnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    task:     Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Latest published history.
    pub fn history(&self) -> HistorySnapshot {
        self.history.borrow().clone()
    }

    /// Receiver that wakes whenever a new tick has been published.
    pub fn subscribe(&self) -> watch::Receiver<HistorySnapshot> {
        self.history.clone()
    }

    pub fn state(&self) -> MonitorState {
        match &self.task {
            Some(task) if !task.is_finished() => MonitorState::Running,
            _ => MonitorState::Idle,
        }
    }

    /// Stop sampling. No sample is taken once this returns.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Monitor task ended abnormally: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mon_core::{
        CpuTicks, InterfaceCounters, MemoryCounters, MonitorError, RawCounterSnapshot, Result,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays a fixed list of reads, then fails.
    struct ScriptedSource {
        script: VecDeque<Result<RawCounterSnapshot>>,
        reads:  Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<RawCounterSnapshot>>) -> Self {
            Self {
                script: script.into(),
                reads:  Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CounterSource for ScriptedSource {
        fn read(&mut self) -> Result<RawCounterSnapshot> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(MonitorError::malformed("script", "exhausted")))
        }
    }

    /// Always returns the same snapshot, counting reads.
    struct SteadySource {
        snapshot: RawCounterSnapshot,
        reads:    Arc<AtomicUsize>,
    }

    impl CounterSource for SteadySource {
        fn read(&mut self) -> Result<RawCounterSnapshot> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.clone())
        }
    }

    fn snapshot(user: u64, idle: u64, eth0_rx: u64) -> RawCounterSnapshot {
        RawCounterSnapshot {
            cpu: CpuTicks {
                user,
                idle,
                ..CpuTicks::default()
            },
            memory: MemoryCounters {
                mem_total_kib: 8_000_000,
                mem_free_kib: 2_000_000,
                mem_available_kib: None,
                swap_total_kib: 0,
                swap_free_kib: 0,
            },
            interfaces: [
                ("eth0".to_string(), InterfaceCounters { rx_bytes: eth0_rx, tx_bytes: 0 }),
                ("lo".to_string(), InterfaceCounters { rx_bytes: eth0_rx * 7, tx_bytes: eth0_rx }),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn unavailable() -> MonitorError {
        MonitorError::SourceUnavailable {
            path: "/proc/stat".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
    }

    fn settings(capacity: usize) -> SamplerSettings {
        SamplerSettings {
            interval: Duration::from_millis(10),
            history_capacity: capacity,
            exclude_interfaces: Vec::new(),
        }
    }

    #[test]
    fn first_tick_plots_zero_cpu_and_real_memory() {
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![Ok(snapshot(100, 900, 1_000_000))]),
            &settings(4),
        );
        assert_eq!(sampler.tick(Instant::now()), TickOutcome::Sampled);

        let history = sampler.snapshot();
        assert_eq!(history.cpu, vec![0.0; 4]);
        assert_eq!(history.memory, vec![0.0, 0.0, 0.0, 75.0]);
        assert_eq!(history.swap, vec![0.0; 4]);
        assert_eq!(history.net_rx, vec![0.0; 4]);
        assert_eq!(history.latest.memory_total_kib, 8_000_000);
    }

    #[test]
    fn second_tick_derives_cpu_and_rates() {
        let start = Instant::now();
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![
                Ok(snapshot(100, 900, 1_000_000)),
                Ok(snapshot(150, 950, 1_010_000)),
            ]),
            &settings(3),
        );
        sampler.tick(start);
        sampler.tick(start + Duration::from_secs(1));

        let history = sampler.snapshot();
        assert_eq!(history.cpu, vec![0.0, 0.0, 50.0]);
        assert_eq!(history.net_rx, vec![0.0, 0.0, 10_000.0]);
        assert_eq!(history.latest.cpu_percent, 50.0);
        assert_eq!(history.latest.tick, 2);
    }

    #[test]
    fn elapsed_time_is_measured_not_assumed() {
        let start = Instant::now();
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![
                Ok(snapshot(100, 900, 0)),
                Ok(snapshot(150, 950, 20_000)),
            ]),
            &settings(2),
        );
        sampler.tick(start);
        sampler.tick(start + Duration::from_secs(2));
        assert_eq!(sampler.latest().net_rx_bytes_per_sec, 10_000.0);
    }

    #[test]
    fn failed_read_skips_push_and_keeps_baseline() {
        let start = Instant::now();
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![
                Ok(snapshot(100, 900, 0)),
                Err(unavailable()),
                Ok(snapshot(200, 1000, 20_000)),
            ]),
            &settings(3),
        );
        sampler.tick(start);
        assert_eq!(sampler.tick(start + Duration::from_secs(1)), TickOutcome::Skipped);
        assert_eq!(sampler.snapshot().memory, vec![0.0, 0.0, 75.0]);

        sampler.tick(start + Duration::from_secs(2));
        let history = sampler.snapshot();
        // differenced against the first snapshot, over both seconds
        assert_eq!(history.cpu, vec![0.0, 0.0, 50.0]);
        assert_eq!(history.net_rx, vec![0.0, 0.0, 10_000.0]);

        let stats = sampler.stats();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.samples, 2);
        assert_eq!(stats.failed_reads, 1);
    }

    #[test]
    fn malformed_first_read_leaves_no_baseline() {
        let start = Instant::now();
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![
                Err(MonitorError::malformed("stat", "short line")),
                Ok(snapshot(100, 900, 0)),
            ]),
            &settings(2),
        );
        assert_eq!(sampler.tick(start), TickOutcome::Skipped);
        sampler.tick(start + Duration::from_secs(1));
        assert_eq!(sampler.latest().cpu_percent, 0.0);
        assert_eq!(sampler.latest().tick, 1);
    }

    #[test]
    fn counter_regressions_are_counted() {
        let start = Instant::now();
        let mut sampler = Sampler::new(
            ScriptedSource::new(vec![
                Ok(snapshot(100, 900, 50_000)),
                Ok(snapshot(150, 950, 10)),
            ]),
            &settings(2),
        );
        sampler.tick(start);
        sampler.tick(start + Duration::from_secs(1));
        assert_eq!(sampler.latest().net_rx_bytes_per_sec, 0.0);
        // loopback went backwards too, but it is never differenced
        assert_eq!(sampler.stats().counter_regressions, 1);
    }

    #[tokio::test]
    async fn running_monitor_publishes_history() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot(100, 900, 0)),
            Ok(snapshot(150, 950, 1_000)),
        ]);
        let mut handle = Monitor::new(source, settings(5)).start();
        assert_eq!(handle.state(), MonitorState::Running);

        let mut rx = handle.subscribe();
        while rx.borrow_and_update().stats.samples < 2 {
            rx.changed().await.unwrap();
        }

        let history = handle.history();
        assert_eq!(history.capacity(), 5);
        assert_eq!(history.cpu[4], 50.0);
        assert!(history.net_rx[4] > 0.0);

        handle.stop().await;
        assert_eq!(handle.state(), MonitorState::Idle);
    }

    #[tokio::test]
    async fn no_sample_after_stop() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = SteadySource {
            snapshot: snapshot(1, 1, 1),
            reads: reads.clone(),
        };
        let mut handle = Monitor::new(source, settings(3)).start();

        let mut rx = handle.subscribe();
        rx.changed().await.unwrap();
        handle.stop().await;

        let after_stop = reads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reads.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn outage_keeps_loop_alive() {
        let source = ScriptedSource::new(vec![Err(unavailable()), Err(unavailable())]);
        let mut handle = Monitor::new(source, settings(2)).start();

        let mut rx = handle.subscribe();
        while rx.borrow_and_update().stats.failed_reads < 3 {
            rx.changed().await.unwrap();
        }
        assert_eq!(handle.state(), MonitorState::Running);
        assert_eq!(handle.history().cpu, vec![0.0, 0.0]);
        handle.stop().await;
    }

    #[tokio::test]
    async fn zero_interval_still_samples() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = SteadySource {
            snapshot: snapshot(1, 1, 1),
            reads: reads.clone(),
        };
        let zero = SamplerSettings {
            interval: Duration::ZERO,
            ..settings(2)
        };
        let mut handle = Monitor::new(source, zero).start();

        let mut rx = handle.subscribe();
        while rx.borrow_and_update().stats.samples < 3 {
            rx.changed().await.unwrap();
        }
        assert_eq!(handle.state(), MonitorState::Running);
        handle.stop().await;
        assert!(reads.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn unread_updates_coalesce_without_stalling_sampling() {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = SteadySource {
            snapshot: snapshot(1, 1, 1),
            reads: reads.clone(),
        };
        let mut handle = Monitor::new(source, settings(4)).start();
        // never polled while the sampler runs
        let mut idle_reader = handle.subscribe();

        while reads.load(Ordering::SeqCst) < 5 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(idle_reader.has_changed().unwrap());
        handle.stop().await;

        // every read is published before the loop can observe shutdown
        let total_reads = reads.load(Ordering::SeqCst) as u64;
        let newest = idle_reader.borrow_and_update().clone();
        assert_eq!(newest.stats.samples, total_reads);
        assert_eq!(newest.latest.tick, total_reads);
        assert_eq!(newest.cpu.len(), 4);
    }

    #[test]
    fn unstarted_monitor_is_idle() {
        let monitor = Monitor::new(ScriptedSource::new(Vec::new()), settings(2));
        assert_eq!(monitor.state(), MonitorState::Idle);
    }
}
