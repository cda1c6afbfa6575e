use serde::Deserialize;
use std::env;
use std::time::Duration;
use stride_core::{PricingConfig, RetryPolicy};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string; `None` selects the in-memory store
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    #[serde(default = "default_membership_discount")]
    pub membership_discount_cents: i64,
    pub pending_ttl_seconds: u64,
}

fn default_membership_discount() -> i64 { 500 }

/// One year; nothing stays pending for longer than that
pub const MAX_PENDING_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

impl BookingRules {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn pricing(&self) -> PricingConfig {
        PricingConfig {
            membership_discount_cents: self.membership_discount_cents,
        }
    }

    /// Capped at `MAX_PENDING_TTL_SECONDS`
    pub fn pending_ttl(&self) -> chrono::Duration {
        let seconds = i64::try_from(self.pending_ttl_seconds)
            .unwrap_or(MAX_PENDING_TTL_SECONDS)
            .min(MAX_PENDING_TTL_SECONDS);
        chrono::Duration::seconds(seconds)
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `STRIDE_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("STRIDE").separator("__"));

        builder.build()?.try_deserialize()
    }
}
