//! Telemetry initialization: structured logging through `tracing-subscriber`.
//!
//! Filtering follows `RUST_LOG` and defaults to `info`. For example, to see key loading and
//! request construction:
//!
//! ```bash
//! RUST_LOG=payhook=debug payhook deliver
//! ```
//!
//! Delivery and receipt outcomes are also recorded as `metrics` counters
//! (`payhook_webhook_deliveries_total`, `payhook_webhooks_received_total`); install a recorder in
//! the embedding application to export them.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global tracing subscriber with a console (fmt) layer.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");
    Ok(())
}
