//! HTTP request handlers.

pub mod webhooks;
