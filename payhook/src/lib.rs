//! # payhook: signed payment-notification webhooks
//!
//! `payhook` delivers payment notifications over HTTP and proves their origin with an RSA
//! signature carried in the `x-api-signature` header. The same crate provides the receiving side:
//! an Axum route that rebuilds the signed fields from an incoming request and verifies them
//! against the sender's public key.
//!
//! ## Overview
//!
//! Every outbound notification goes through three steps:
//!
//! 1. **Build**: the event is serialized to JSON, stamped with an HTTP date, and the host and path
//!    are taken from the destination URL.
//! 2. **Sign**: `POST`, host, path, date and body are joined with `\n` into the canonical string
//!    ([`signing::build_canonical_string`]), signed with RSASSA-PKCS1-v1_5 over SHA-256 and
//!    hex-encoded.
//! 3. **Send**: one `POST` with a configurable timeout. Only `200` counts as delivered.
//!
//! The receiver reverses this: it reads `host`, `date` and `x-api-signature` from the headers,
//! takes the raw path and body, and verifies. Optional freshness and replay checks
//! ([`webhooks::policy`]) run after the signature is accepted.
//!
//! ## Keys
//!
//! Private keys are PKCS#1 PEM (`BEGIN RSA PRIVATE KEY`), public keys are SPKI PEM
//! (`BEGIN PUBLIC KEY`). Keys are read through a [`key_loader::KeyLoader`] on every operation and
//! never cached.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use payhook::{Config, webhooks::{WebhookDispatcher, load_events}};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = payhook::config::Args::parse();
//!     let config = Config::load(&args)?;
//!     payhook::telemetry::init_telemetry()?;
//!
//!     let events = load_events(&config.events_file).await?;
//!     let dispatcher = WebhookDispatcher::from_config(&config)?;
//!     for result in dispatcher.deliver_and_verify_all(&events).await {
//!         result?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod config;
pub mod errors;
pub mod key_loader;
pub mod signing;
pub mod telemetry;
pub mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
pub use errors::Error;
use key_loader::{FileKeyLoader, KeyLoader};
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info};
use webhooks::ReplayGuard;

/// State shared by the receiver's handlers.
///
/// - `key_loader`: Source of the public key used to verify requests
/// - `max_clock_skew`: When set, requests whose `date` is further than this from now are rejected
/// - `replay_guard`: When set, signatures already accepted are rejected
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .key_loader(Arc::new(FileKeyLoader::default()))
///     .max_clock_skew(Duration::from_secs(300))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub key_loader: Arc<dyn KeyLoader>,
    pub max_clock_skew: Option<Duration>,
    pub replay_guard: Option<ReplayGuard>,
}

impl AppState {
    pub fn from_config(config: &Config, key_loader: Arc<dyn KeyLoader>) -> Self {
        let receiver = &config.receiver;
        let replay_guard = receiver
            .replay_cache_capacity
            .map(|capacity| ReplayGuard::for_skew(capacity, receiver.max_clock_skew));

        AppState::builder()
            .key_loader(key_loader)
            .maybe_max_clock_skew(receiver.max_clock_skew)
            .maybe_replay_guard(replay_guard)
            .build()
    }
}

/// Build the receiver router: signed webhooks on `hook_path`, plus `/healthz`.
pub fn build_router(state: AppState, hook_path: &str) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route(hook_path, post(api::handlers::webhooks::receive_webhook))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// The inbound receiver: router plus the configuration it was built from.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the router with keys read from the configured files
/// 2. **Serve**: [`Application::serve`] binds to the receiver address and handles requests
/// 3. **Shutdown**: When the shutdown future resolves, in-flight requests finish and serving stops
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> Self {
        let key_loader = Arc::new(FileKeyLoader::from(&config.keys));
        Self::with_key_loader(config, key_loader)
    }

    pub fn with_key_loader(config: Config, key_loader: Arc<dyn KeyLoader>) -> Self {
        debug!("Starting webhook receiver with configuration: {:#?}", config);
        let state = AppState::from_config(&config, key_loader);
        let router = build_router(state, &config.receiver.path);
        Self { router, config }
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Bind to the configured receiver address and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.receiver.bind_address()).await?;
        self.serve_with_listener(listener, shutdown).await
    }

    pub async fn serve_with_listener<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!(
            "Webhook receiver listening on http://{}{}",
            listener.local_addr()?,
            self.config.receiver.path
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Webhook receiver stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::key_loader::InMemoryKeyLoader;
    use crate::signing::keys::fixtures::*;
    use crate::webhooks::WebhookDispatcher;
    use crate::webhooks::events::sample_event;

    fn key_loader() -> Arc<dyn KeyLoader> {
        Arc::new(InMemoryKeyLoader::new(
            Some(PRIVATE_PEM.to_string()),
            Some(PUBLIC_PEM.to_string()),
        ))
    }

    #[test_log::test(tokio::test)]
    async fn test_dispatcher_delivers_to_receiver() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut config = Config {
            url: Url::parse(&format!("http://{addr}/hooks/incoming")).unwrap(),
            ..Default::default()
        };
        config.receiver.replay_cache_capacity = Some(100);
        config.receiver.max_clock_skew = Some(Duration::from_secs(300));

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = Application::with_key_loader(config.clone(), key_loader());
        let server = tokio::spawn(app.serve_with_listener(listener, async {
            let _ = shutdown_rx.await;
        }));

        let dispatcher = WebhookDispatcher::new(&config, key_loader()).unwrap();
        let results = dispatcher
            .deliver_and_verify_all(&[sample_event("p1"), sample_event("p2")])
            .await;
        assert!(results.iter().all(Result::is_ok), "{results:?}");

        shutdown_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn test_receiver_rejects_other_signer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = Config {
            url: Url::parse(&format!("http://{addr}/hooks/incoming")).unwrap(),
            ..Default::default()
        };

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = Application::with_key_loader(config.clone(), key_loader());
        let server = tokio::spawn(app.serve_with_listener(listener, async {
            let _ = shutdown_rx.await;
        }));

        let other_signer = Arc::new(InMemoryKeyLoader::new(
            Some(OTHER_PRIVATE_PEM.to_string()),
            Some(OTHER_PUBLIC_PEM.to_string()),
        ));
        let dispatcher = WebhookDispatcher::new(&config, other_signer).unwrap();
        let err = dispatcher.deliver(&sample_event("p1")).await.unwrap_err();
        assert!(matches!(err, Error::Delivery { status: 401 }));

        shutdown_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_application_test_server_uses_configured_path() {
        let mut config = Config::default();
        config.receiver.path = "/custom/path".to_string();

        let server = Application::with_key_loader(config, key_loader()).into_test_server();

        server.get("/healthz").await.assert_status_ok();
        // Unsigned request reaches the handler and fails on the missing headers
        server.post("/custom/path").await.assert_status_bad_request();
        server.post("/hooks/incoming").await.assert_status_not_found();
    }

    #[test]
    fn test_app_state_from_config() {
        let mut config = Config::default();
        let state = AppState::from_config(&config, key_loader());
        assert!(state.max_clock_skew.is_none());
        assert!(state.replay_guard.is_none());

        config.receiver.max_clock_skew = Some(Duration::from_secs(60));
        config.receiver.replay_cache_capacity = Some(10);
        let state = AppState::from_config(&config, key_loader());
        assert_eq!(state.max_clock_skew, Some(Duration::from_secs(60)));
        assert!(state.replay_guard.is_some());
    }
}
