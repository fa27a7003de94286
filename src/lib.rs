use clap::Parser;
use std::path::PathBuf;
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};

pub mod aggregate;
pub mod betterstack;
pub mod classifier;
pub mod config;
pub mod error;
pub mod format;
pub mod http;
pub mod metrics;
pub mod monitor;
pub mod notifier;
pub mod slack;
pub mod state;
pub mod throttle;

#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Config file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Keep running, checking every this many seconds, and serve /alive and /metrics.
    /// Without it a single check is run.
    #[arg(short, long)]
    pub interval: Option<u64>,
}

/// Handle signals
pub fn signal_handler() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, exiting");
                std::process::exit(0);
            }
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, exiting");
                std::process::exit(0);
            }
        }
    });

    Ok(())
}
