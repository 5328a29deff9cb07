use clap::Parser;
use payhook::{
    Application, Config,
    config::Command,
    telemetry,
    webhooks::{WebhookDispatcher, load_events},
};

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Deliver every event in the events file, then verify each delivered request.
async fn deliver(config: &Config, events_file: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let events_file = events_file.unwrap_or_else(|| config.events_file.clone());
    let events = load_events(&events_file).await?;
    tracing::info!(count = events.len(), url = %config.url, "Delivering payment notifications");

    let dispatcher = WebhookDispatcher::from_config(config)?;
    let results = dispatcher.deliver_and_verify_all(&events).await;

    let mut failed = 0usize;
    for (event, result) in events.iter().zip(&results) {
        match result {
            Ok(_) => tracing::info!(payment_id = %event.payment_id, "Delivered and verified"),
            Err(e) => {
                failed += 1;
                tracing::error!(payment_id = %event.payment_id, error = %e, "Delivery failed");
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} webhook deliveries failed", events.len());
    }
    tracing::info!(count = events.len(), "All webhooks delivered");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = payhook::config::Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry()?;

    tracing::debug!("{:?}", args);

    match args.command.unwrap_or(Command::Deliver { events: None }) {
        Command::Deliver { events } => deliver(&config, events).await,
        Command::Serve => Application::new(config).serve(shutdown_signal()).await,
    }
}
