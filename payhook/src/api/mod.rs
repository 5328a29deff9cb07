//! HTTP surface of the inbound receiver.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response bodies
//!
//! The receiver exposes a single configurable `POST` route (default `/hooks/incoming`) that
//! accepts signed payment notifications, plus `/healthz`.

pub mod handlers;
pub mod models;
