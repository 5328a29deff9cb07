//! Payment notification payloads.
//!
//! Field names are camelCase on the wire. Shape is enforced by deserialization; business rules
//! on the contents are the event producer's concern.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Error, Result};

/// Lifecycle status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Initiated,
    Suspended,
    Processing,
    Completed,
    Rejected,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initiated => write!(f, "INITIATED"),
            Self::Suspended => write!(f, "SUSPENDED"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceType {
    IncomingPayment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventVersion {
    #[serde(rename = "v1")]
    V1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmlDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Internal,
    Sepa,
    SepaInstant,
    Swift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Beneficiary {
    pub name: String,
    pub account_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    pub name: String,
    pub account_number: String,
    pub currency: String,
}

/// Payment details carried inside the notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub payment_id: String,
    pub status: PaymentStatus,
    pub service_type: ServiceType,
    pub amount: f64,
    pub currency: String,
    pub beneficiary: Beneficiary,
    pub payer: Payer,
    pub payment_type: PaymentType,
}

/// Incoming-payment notification body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    /// Unique payment identification value
    pub payment_id: String,
    pub status: PaymentStatus,
    pub service_type: ServiceType,
    pub version: EventVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aml_decision: Option<AmlDecision>,
    /// Party ID of the incoming payment beneficiary
    pub holder_party_id: Uuid,
    pub payment_data: PaymentData,
}

/// Read a JSON array of payment events.
pub async fn load_events(path: &Path) -> Result<Vec<PaymentEvent>> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::EventsNotFound { path: path.to_path_buf() },
        _ => Error::EventsRead {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    serde_json::from_str(&contents).map_err(|e| Error::InvalidEvents {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
pub(crate) fn sample_event(payment_id: &str) -> PaymentEvent {
    PaymentEvent {
        payment_id: payment_id.to_string(),
        status: PaymentStatus::Completed,
        service_type: ServiceType::IncomingPayment,
        version: EventVersion::V1,
        aml_decision: None,
        holder_party_id: Uuid::nil(),
        payment_data: PaymentData {
            payment_id: payment_id.to_string(),
            status: PaymentStatus::Completed,
            service_type: ServiceType::IncomingPayment,
            amount: 12.5,
            currency: "EUR".to_string(),
            beneficiary: Beneficiary {
                name: "Jane Doe".to_string(),
                account_number: "LV80BANK0000435195001".to_string(),
                country: Some("LV".to_string()),
            },
            payer: Payer {
                name: "John Roe".to_string(),
                account_number: "DE89370400440532013000".to_string(),
                currency: "EUR".to_string(),
            },
            payment_type: PaymentType::SepaInstant,
        },
    }
}
