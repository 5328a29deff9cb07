//! Signed webhook request model, shared by the sending and receiving sides.

use axum::http::{HeaderMap, Uri};
use chrono::{DateTime, Utc};
use url::Url;

use crate::errors::{Error, Result};
use crate::signing::CanonicalRequest;

/// Header carrying the hex signature.
pub const SIGNATURE_HEADER: &str = "x-api-signature";
pub const HOST_HEADER: &str = "host";
pub const DATE_HEADER: &str = "date";
pub const CONTENT_TYPE_HEADER: &str = "content-type";
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Webhooks are always POSTed.
pub const METHOD: &str = "POST";

/// Format `at` as an HTTP date, e.g. `Mon, 01 Jan 2024 00:00:00 GMT`.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A webhook request with the fields that take part in signing.
///
/// Built once per delivery attempt (or per received request), signed or verified, then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    /// Hostname without port, as sent in the `host` header
    pub host: String,
    /// Raw URL path, never percent-decoded
    pub path: String,
    /// HTTP date set when the request was built
    pub date: String,
    pub content_type: String,
    /// Hex signature; `None` until signed
    pub signature: Option<String>,
    /// JSON body exactly as sent on the wire
    pub body: String,
}

impl WebhookRequest {
    /// Build an unsigned outbound request for `url`.
    pub fn outbound(url: &Url, body: String, date: String) -> Result<Self> {
        let host = url.host_str().ok_or_else(|| Error::InvalidUrl {
            url: url.to_string(),
            reason: "URL has no host".to_string(),
        })?;

        Ok(Self {
            host: host.to_string(),
            path: url.path().to_string(),
            date,
            content_type: CONTENT_TYPE_JSON.to_string(),
            signature: None,
            body,
        })
    }

    /// Rebuild a received request from its headers, URI and raw body.
    ///
    /// `host` comes from the `host` header, or from the URI authority when the header is absent
    /// (HTTP/2). The signature header is optional here; [`WebhookRequest::signature`] reports it
    /// missing.
    pub fn inbound(headers: &HeaderMap, uri: &Uri, body: String) -> Result<Self> {
        let host = match header_value(headers, HOST_HEADER) {
            Ok(host) => host,
            Err(e) => uri.authority().map(|authority| authority.host()).ok_or(e)?,
        };
        let date = header_value(headers, DATE_HEADER)?;
        let content_type = headers
            .get(CONTENT_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(CONTENT_TYPE_JSON);
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()).map(str::to_string);

        Ok(Self {
            host: strip_port(host).to_string(),
            path: uri.path().to_string(),
            date: date.to_string(),
            content_type: content_type.to_string(),
            signature,
            body,
        })
    }

    /// Fields covered by the signature.
    pub fn canonical(&self) -> CanonicalRequest<'_> {
        CanonicalRequest::new(METHOD, &*self.host, &*self.path, &*self.date, Some(&*self.body))
    }

    pub fn signature(&self) -> Result<&str> {
        self.signature.as_deref().ok_or(Error::MissingHeader { name: SIGNATURE_HEADER })
    }

    /// Headers to put on the wire. The signature header is only present once signed.
    pub fn header_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut headers = vec![
            (HOST_HEADER, self.host.as_str()),
            (DATE_HEADER, self.date.as_str()),
            (CONTENT_TYPE_HEADER, self.content_type.as_str()),
        ];
        if let Some(signature) = &self.signature {
            headers.push((SIGNATURE_HEADER, signature.as_str()));
        }
        headers
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::MissingHeader { name })
}

/// `example.com:8080` -> `example.com`, `[::1]:8080` -> `[::1]`
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
        _ => host,
    }
}
