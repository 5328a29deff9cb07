//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `PAYHOOK_CONFIG`
//! environment variable.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`, optional)
//! 2. **Environment variables** - Variables prefixed with `PAYHOOK_` override YAML values
//! 3. **WEBHOOK_URL** - Special case: overrides `url` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `PAYHOOK_KEYS__PRIVATE=/etc/payhook/private.pem` sets the `keys.private` field.
//!
//! ## Example
//!
//! ```yaml
//! url: https://example.com/hooks/incoming
//! timeout_ms: 1000
//! keys:
//!   private: ./keys/private.pem
//!   public: ./keys/public.pem
//! events_file: webhooks.json
//! receiver:
//!   port: 3000
//!   path: /hooks/incoming
//!   max_clock_skew: 5m
//!   replay_cache_capacity: 10000
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::key_loader::{DEFAULT_PRIVATE_KEY_PATH, DEFAULT_PUBLIC_KEY_PATH};

/// CLI args: config file location plus the command to run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "PAYHOOK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without running a command.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign and deliver every event in the events file, then verify each delivered request
    Deliver {
        /// Overrides `events_file` from the configuration
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Run the inbound receiver that verifies signed webhooks
    Serve,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Destination URL for outbound webhooks. Host and path of this URL are signed.
    pub url: Url,
    /// Deadline for a single delivery exchange, in milliseconds
    pub timeout_ms: u64,
    /// PEM key locations
    pub keys: KeyPaths,
    /// JSON array of payment events used by the `deliver` command
    pub events_file: PathBuf,
    /// Upper bound on events delivered at the same time
    pub max_concurrent_deliveries: usize,
    /// Inbound receiver settings
    pub receiver: ReceiverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: Url::parse("http://localhost:3000/hooks/incoming").expect("default webhook URL is valid"),
            timeout_ms: 1000,
            keys: KeyPaths::default(),
            events_file: PathBuf::from("webhooks.json"),
            max_concurrent_deliveries: 4,
            receiver: ReceiverConfig::default(),
        }
    }
}

/// Where the signing and verification keys live.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct KeyPaths {
    /// PKCS#1 PEM private key used to sign outbound requests
    pub private: PathBuf,
    /// SPKI PEM public key used to verify inbound requests
    pub public: PathBuf,
}

impl Default for KeyPaths {
    fn default() -> Self {
        Self {
            private: PathBuf::from(DEFAULT_PRIVATE_KEY_PATH),
            public: PathBuf::from(DEFAULT_PUBLIC_KEY_PATH),
        }
    }
}

/// Inbound receiver configuration.
///
/// `max_clock_skew` and `replay_cache_capacity` enable the freshness and replay checks that run
/// after signature verification. Both are off unless set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiverConfig {
    /// HTTP server host to bind to
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Path that accepts signed webhooks
    pub path: String,
    /// Reject requests whose `date` header is further than this from now
    #[serde(with = "humantime_serde")]
    pub max_clock_skew: Option<Duration>,
    /// Remember this many recent signatures and reject repeats
    pub replay_cache_capacity: Option<u64>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            path: "/hooks/incoming".to_string(),
            max_clock_skew: None,
            replay_cache_capacity: None,
        }
    }
}

impl ReceiverConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            // (PAYHOOK_CONFIG names the file itself and is consumed by clap)
            .merge(Env::prefixed("PAYHOOK_").ignore(&["config"]).split("__"))
            // Plain WEBHOOK_URL is accepted as the destination
            .merge(Env::raw().only(&["WEBHOOK_URL"]).map(|_| "url".into()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(format!(
                "Config validation: url must use http or https, got '{}'",
                self.url.scheme()
            ));
        }

        if self.url.host_str().is_none() {
            return Err(format!("Config validation: url '{}' has no host", self.url));
        }

        if self.timeout_ms == 0 {
            return Err("Config validation: timeout_ms must be greater than 0".to_string());
        }

        if self.max_concurrent_deliveries == 0 {
            return Err("Config validation: max_concurrent_deliveries must be at least 1".to_string());
        }

        if !self.receiver.path.starts_with('/') {
            return Err(format!(
                "Config validation: receiver.path must start with '/', got '{}'",
                self.receiver.path
            ));
        }

        if self.receiver.replay_cache_capacity == Some(0) {
            return Err("Config validation: receiver.replay_cache_capacity must be at least 1 when set".to_string());
        }

        Ok(())
    }
}
