//! Response models for the webhook receiver.

use serde::{Deserialize, Serialize};

use crate::webhooks::PaymentStatus;

/// Returned with `200 OK` once a notification passed every check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAccepted {
    pub status: String,
    pub payment_id: String,
    pub payment_status: PaymentStatus,
}

impl WebhookAccepted {
    pub fn new(payment_id: String, payment_status: PaymentStatus) -> Self {
        Self {
            status: "accepted".to_string(),
            payment_id,
            payment_status,
        }
    }
}
