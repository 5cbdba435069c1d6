//! mon — headless resource monitor: samples CPU, memory, swap and network
//! once per interval and prints one line per tick.
//!
//! Run with:  `RUST_LOG=info mon`

mod report;

use anyhow::Result;
use mon_config::{default_path, load as load_config, MonConfig, OutputFormat};
use mon_system::{spawn_monitor, SamplerSettings};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging — RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("mon v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(default_path())?;
    let mut handle = spawn_monitor(config.source.procfs_root.clone(), settings_from(&config));
    let mut updates = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break; // sampler task ended
                }
                let history = updates.borrow_and_update().clone();
                match config.output.format {
                    OutputFormat::Text => println!("{}", report::text_line(&history)),
                    OutputFormat::Json => println!("{}", serde_json::to_string(&history.latest)?),
                }
            }
        }
    }

    handle.stop().await;
    tracing::info!("mon stopped");
    Ok(())
}

fn settings_from(config: &MonConfig) -> SamplerSettings {
    SamplerSettings {
        interval:           Duration::from_millis(config.sampler.interval_ms),
        history_capacity:   config.sampler.history_capacity,
        exclude_interfaces: config.source.exclude_interfaces.clone(),
    }
}
