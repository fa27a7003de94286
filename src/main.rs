use clap::Parser;
use std::{process::ExitCode, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uptime_status_notifier::{Args, config, http, metrics, notifier::Notifier, signal_handler};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Setup tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse config
    let args = Args::parse();
    let config = config::Config::from_file(&args.config)?;

    let Some(interval) = args.interval else {
        // Single run, meant to be scheduled externally
        let notifier = Notifier::new(config)?;

        return Ok(match notifier.execute().await {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    };

    // Register metrics
    metrics::register_metrics()?;

    // Handle signals
    signal_handler()?;

    // Create and start notifier
    tokio::spawn({
        let config = config.clone();

        async move {
            let result = match Notifier::new(config) {
                Ok(notifier) => notifier.start(Duration::from_secs(interval)).await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                tracing::error!("Notifier stopped: {}", e);
                std::process::exit(1);
            }
        }
    });

    // Start the HTTP server
    match config.http {
        Some(http) => http::create_server(http).await?,
        None => std::future::pending::<()>().await,
    }

    Ok(ExitCode::SUCCESS)
}
