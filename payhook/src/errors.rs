use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

use crate::signing::keys::KeyRole;

#[derive(ThisError, Debug)]
pub enum Error {
    /// PEM text could not be decoded into a key of the expected role
    #[error("Invalid {role} key: {reason}")]
    KeyFormat { role: KeyRole, reason: String },

    /// A key handle was used for the wrong operation (e.g. a private key passed to verify)
    #[error("Expected a {expected} key but got a {found} key")]
    KeyRole { expected: KeyRole, found: KeyRole },

    /// Key file does not exist
    #[error("No key file found at {}", .path.display())]
    KeyNotFound { path: PathBuf },

    /// Key file exists but could not be read
    #[error("Error reading key file {}", .path.display())]
    KeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The signature primitive rejected the key or input
    #[error("Failed to sign request: {0}")]
    Signing(String),

    /// Signature is well-formed but does not match the request
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature header could not be decoded at all
    #[error("Malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// A header required for verification is absent
    #[error("Missing required header: {name}")]
    MissingHeader { name: &'static str },

    /// Destination URL cannot be used to derive host and path
    #[error("Invalid webhook URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Webhook body could not be serialized, or a received body is not a valid event
    #[error("Webhook body JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote endpoint answered with a status other than 200
    #[error("Failed to deliver webhook: {status}")]
    Delivery { status: u16 },

    /// Connection failure or timeout before any response was received
    #[error("Webhook transport failed: {source}")]
    Transport {
        timed_out: bool,
        #[source]
        source: reqwest::Error,
    },

    /// Request date is outside the accepted clock-skew window
    #[error("Request date {date} is outside the accepted window")]
    StaleRequest { date: String },

    /// The same signed request was already accepted
    #[error("Replay detected: signature already seen")]
    ReplayDetected,

    /// Events file does not exist
    #[error("JSON file not found: {}", .path.display())]
    EventsNotFound { path: PathBuf },

    /// Events file is not a valid list of payment events
    #[error("Invalid JSON in file: {}", .path.display())]
    InvalidEvents {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Events file exists but could not be read
    #[error("Error reading events file {}", .path.display())]
    EventsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// True only for a signature mismatch, as opposed to malformed input.
    pub fn is_invalid_signature(&self) -> bool {
        matches!(self, Error::InvalidSignature)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidSignature | Error::StaleRequest { .. } | Error::ReplayDetected => StatusCode::UNAUTHORIZED,
            Error::MalformedSignature { .. } | Error::MissingHeader { .. } | Error::InvalidUrl { .. } => StatusCode::BAD_REQUEST,
            Error::Serialization(_) | Error::InvalidEvents { .. } => StatusCode::BAD_REQUEST,
            Error::Delivery { .. } | Error::Transport { .. } => StatusCode::BAD_GATEWAY,
            Error::KeyFormat { .. }
            | Error::KeyRole { .. }
            | Error::KeyNotFound { .. }
            | Error::KeyRead { .. }
            | Error::Signing(_)
            | Error::EventsNotFound { .. }
            | Error::EventsRead { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a caller-safe message, without leaking key paths or crypto details
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidSignature => "Invalid signature".to_string(),
            Error::StaleRequest { .. } => "Request date outside accepted window".to_string(),
            Error::ReplayDetected => "Request already processed".to_string(),
            Error::MalformedSignature { .. } => "Malformed signature".to_string(),
            Error::MissingHeader { name } => format!("Missing required header: {name}"),
            Error::Serialization(_) | Error::InvalidEvents { .. } => "Invalid request body".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::InvalidSignature | Error::StaleRequest { .. } | Error::ReplayDetected => {
                tracing::warn!("Rejected webhook: {}", self);
            }
            Error::MalformedSignature { .. } | Error::MissingHeader { .. } | Error::Serialization(_) => {
                tracing::info!("Malformed webhook request: {}", self);
            }
            _ => {
                tracing::error!("Webhook receiver error: {:#}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for signing, delivery and verification results
pub type Result<T> = std::result::Result<T, Error>;
