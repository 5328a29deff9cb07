//! API response models.

pub mod webhooks;
