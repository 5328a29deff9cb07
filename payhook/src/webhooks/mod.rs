//! Signed payment-notification webhooks.
//!
//! - [`events`]: Payment event payloads and the events file loader
//! - [`request`]: Request model shared by sender and receiver, header names, HTTP dates
//! - [`dispatcher`]: Build/sign/send for outbound events and signature verification for inbound ones
//! - [`policy`]: Freshness and replay checks applied by the receiver

pub mod dispatcher;
pub mod events;
pub mod policy;
pub mod request;

pub use dispatcher::{WebhookDispatcher, verify_request_signature};
pub use events::{PaymentEvent, PaymentStatus, load_events};
pub use policy::{ReplayGuard, check_freshness};
pub use request::{SIGNATURE_HEADER, WebhookRequest, http_date};
