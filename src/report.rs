//! One-line textual rendering of a [`HistorySnapshot`].

use mon_core::HistorySnapshot;
use mon_system::units::{format_kib, format_rate};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render the newest `width` percentage samples as a sparkline.
pub fn sparkline(samples: &[f64], width: usize) -> String {
    let start = samples.len().saturating_sub(width);
    samples[start..]
        .iter()
        .map(|v| {
            let idx = (v.clamp(0.0, 100.0) / 100.0 * (BARS.len() - 1) as f64).round() as usize;
            BARS[idx]
        })
        .collect()
}

/// `cpu  42% ▁▂▅ | mem 75% of 7.6 GiB | swap off | ↓10 KB/s ↑0 B/s (peak 2.1 MB/s)`
pub fn text_line(history: &HistorySnapshot) -> String {
    let now = &history.latest;

    let swap = if now.swap_total_kib == 0 {
        "swap off".to_string()
    } else {
        format!("swap {:>3.0}% of {}", now.swap_percent, format_kib(now.swap_total_kib))
    };

    format!(
        "cpu {:>3.0}% {} | mem {:>3.0}% of {} | {} | ↓{} ↑{} (peak {})",
        now.cpu_percent,
        sparkline(&history.cpu, 20),
        now.memory_percent,
        format_kib(now.memory_total_kib),
        swap,
        format_rate(now.net_rx_bytes_per_sec),
        format_rate(now.net_tx_bytes_per_sec),
        format_rate(history.peak_rate()),
    )
}
