//! Webhook dispatch: build, sign, send; and the matching inbound verification.
//!
//! ```text
//! dispatcher.deliver(event)
//!   ├─ BUILD: serialize body, stamp HTTP date, derive host/path from the URL
//!   ├─ SIGN:  KeyLoader::private_key() → signing::sign() → x-api-signature
//!   └─ SEND:  single POST with the configured timeout
//!              ├─ 200            → Ok(request)
//!              ├─ other status   → Error::Delivery { status }
//!              └─ network/timeout → Error::Transport
//!
//! verify_request_signature(request)
//!   └─ x-api-signature present? → KeyLoader::public_key() → signing::verify() → Ok | Error::InvalidSignature
//! ```
//!
//! No retries happen here. Every event is independent: its key, request and signature never
//! leave its own future, so batches run concurrently without coordination.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use metrics::counter;
use serde::Serialize;
use tracing::instrument;
use url::Url;

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::key_loader::{FileKeyLoader, KeyLoader};
use crate::signing;
use crate::webhooks::request::{WebhookRequest, http_date};

pub struct WebhookDispatcher {
    url: Url,
    http_client: reqwest::Client,
    key_loader: Arc<dyn KeyLoader>,
    max_concurrent: usize,
}

impl WebhookDispatcher {
    /// Create a dispatcher that reads keys from the configured files.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config, Arc::new(FileKeyLoader::from(&config.keys)))
    }

    pub fn new(config: &Config, key_loader: Arc<dyn KeyLoader>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| Error::Transport { timed_out: false, source })?;

        Ok(Self {
            url: config.url.clone(),
            http_client,
            key_loader,
            max_concurrent: config.max_concurrent_deliveries.max(1),
        })
    }

    /// Deliver one event. Returns the signed request that was accepted by the endpoint.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn deliver<T: Serialize + ?Sized>(&self, event: &T) -> Result<WebhookRequest> {
        let body = serde_json::to_string(event)?;
        let mut request = WebhookRequest::outbound(&self.url, body, http_date(Utc::now()))?;

        self.sign(&mut request).await?;
        self.send(&request).await?;

        Ok(request)
    }

    /// Attach `x-api-signature` to `request`, loading the private key for this call only.
    pub async fn sign(&self, request: &mut WebhookRequest) -> Result<()> {
        let private_key = self.key_loader.private_key().await?;
        let signature = signing::sign(&request.canonical(), &private_key)?;
        request.signature = Some(signature);
        Ok(())
    }

    async fn send(&self, request: &WebhookRequest) -> Result<()> {
        let mut req_builder = self.http_client.post(self.url.clone());
        for (name, value) in request.header_pairs() {
            req_builder = req_builder.header(name, value);
        }
        req_builder = req_builder.body(request.body.clone());

        tracing::debug!(body_len = request.body.len(), "Sending webhook HTTP request");

        let response = match req_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                counter!("payhook_webhook_deliveries_total", "outcome" => "transport_error").increment(1);
                tracing::warn!(error = %e, timed_out = e.is_timeout(), "Webhook transport failed");
                return Err(Error::Transport {
                    timed_out: e.is_timeout(),
                    source: e,
                });
            }
        };

        let status = response.status().as_u16();
        if status != 200 {
            counter!("payhook_webhook_deliveries_total", "outcome" => "failure").increment(1);
            tracing::warn!(status, "Webhook delivery rejected by endpoint");
            return Err(Error::Delivery { status });
        }

        counter!("payhook_webhook_deliveries_total", "outcome" => "success").increment(1);
        tracing::info!(status, "Webhook delivered successfully");
        Ok(())
    }

    /// Deliver every event, at most `max_concurrent_deliveries` at a time.
    ///
    /// Results are in input order; one failure does not stop the others.
    pub async fn deliver_all<T: Serialize + Sync>(&self, events: &[T]) -> Vec<Result<WebhookRequest>> {
        futures::stream::iter(events)
            .map(|event| self.deliver(event))
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Deliver each event and check the delivered request against the public key.
    pub async fn deliver_and_verify_all<T: Serialize + Sync>(&self, events: &[T]) -> Vec<Result<WebhookRequest>> {
        futures::stream::iter(events)
            .map(|event| async move {
                let request = self.deliver(event).await?;
                self.verify(&request).await?;
                Ok(request)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await
    }

    /// Verify a request with this dispatcher's key loader.
    pub async fn verify(&self, request: &WebhookRequest) -> Result<()> {
        verify_request_signature(request, self.key_loader.as_ref()).await
    }
}

/// Verify the signature of a received webhook request.
///
/// The public key is loaded for this call only. [`Error::InvalidSignature`] is returned unchanged.
#[instrument(skip_all, fields(host = %request.host, path = %request.path))]
pub async fn verify_request_signature(request: &WebhookRequest, key_loader: &dyn KeyLoader) -> Result<()> {
    let signature = request.signature()?;
    let public_key = key_loader.public_key().await?;
    signing::verify(&request.canonical(), &public_key, signature)
}
