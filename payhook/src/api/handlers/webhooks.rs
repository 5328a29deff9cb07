//! HTTP handler for inbound signed webhooks.

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    response::Json,
};
use bytes::Bytes;
use chrono::Utc;
use metrics::counter;
use tracing::instrument;

use crate::{
    AppState,
    api::models::webhooks::WebhookAccepted,
    errors::{Error, Result},
    webhooks::{PaymentEvent, WebhookRequest, check_freshness, verify_request_signature},
};

/// Receive a signed payment notification.
///
/// The request is rebuilt from the `host` and `date` headers (falling back to the URI authority
/// for HTTP/2), the raw path and the raw body, then checked in order: signature, freshness (if
/// configured), replay (if configured), body shape. The body is only parsed after the signature
/// has been verified.
#[instrument(skip_all, fields(path = %uri.path()))]
pub async fn receive_webhook(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAccepted>> {
    let event = match accept(&state, &uri, &headers, &body).await {
        Ok(event) => event,
        Err(e) => {
            counter!(
                "payhook_webhooks_received_total",
                "outcome" => "rejected",
                "reason" => rejection_reason(&e)
            )
            .increment(1);
            return Err(e);
        }
    };

    counter!("payhook_webhooks_received_total", "outcome" => "accepted").increment(1);
    tracing::info!(
        payment_id = %event.payment_id,
        status = %event.status,
        "Accepted payment notification"
    );

    Ok(Json(WebhookAccepted::new(event.payment_id, event.status)))
}

async fn accept(state: &AppState, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Result<PaymentEvent> {
    let body = String::from_utf8_lossy(body).into_owned();
    let request = WebhookRequest::inbound(headers, uri, body)?;

    verify_request_signature(&request, state.key_loader.as_ref()).await?;

    if let Some(max_skew) = state.max_clock_skew {
        check_freshness(&request.date, Utc::now(), max_skew)?;
    }

    if let Some(guard) = &state.replay_guard {
        guard.check_and_record(request.signature()?).await?;
    }

    Ok(serde_json::from_str(&request.body)?)
}

/// Metric label for a rejected request.
fn rejection_reason(err: &Error) -> &'static str {
    match err {
        Error::InvalidSignature => "invalid_signature",
        Error::MalformedSignature { .. } => "malformed_signature",
        Error::MissingHeader { .. } => "missing_header",
        Error::StaleRequest { .. } => "stale",
        Error::ReplayDetected => "replay",
        Error::Serialization(_) => "invalid_body",
        _ => "internal",
    }
}
