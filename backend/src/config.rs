//! Configuration management for the inventory service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (config/development.toml, config/production.toml)
//! 3. Environment variable overrides with INVENTORY_ prefix

use std::time::Duration;

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Distributed cache tier
    #[serde(default)]
    pub redis: RedisConfig,

    /// Two-tier cache settings
    pub cache: CacheConfig,

    /// Outbound event delivery
    pub events: EventsConfig,

    /// Reservation defaults
    pub reservations: ReservationConfig,

    /// Background sweeps
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    /// Redis URL; the distributed tier is disabled when absent
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub l1_enabled: bool,
    pub l1_max_items: usize,
    pub l1_ttl_secs: u64,
    /// Prefix applied to every distributed-tier key
    pub key_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventsConfig {
    /// Webhook receiving published events; log-only when absent
    pub endpoint: Option<String>,

    /// HMAC key for the signature header
    pub signing_secret: Option<String>,

    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReservationConfig {
    /// Lifetime of a reservation when the caller does not give one
    pub default_ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JobsConfig {
    pub enabled: bool,
    pub reservation_sweep_secs: u64,
    pub alert_scan_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("INVENTORY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8088)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("cache.l1_enabled", true)?
            .set_default("cache.l1_max_items", 5000)?
            .set_default("cache.l1_ttl_secs", 30)?
            .set_default("cache.key_prefix", "inventory:")?
            .set_default("events.queue_capacity", 1024)?
            .set_default("events.max_attempts", 5)?
            .set_default("events.initial_backoff_ms", 200)?
            .set_default("reservations.default_ttl_secs", 900)?
            .set_default("jobs.enabled", true)?
            .set_default("jobs.reservation_sweep_secs", 60)?
            .set_default("jobs.alert_scan_secs", 300)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INVENTORY_ prefix)
            .add_source(
                Environment::with_prefix("INVENTORY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl CacheConfig {
    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_ttl_secs)
    }
}

impl EventsConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8088,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_enabled: true,
            l1_max_items: 5000,
            l1_ttl_secs: 30,
            key_prefix: "inventory:".to_string(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            signing_secret: None,
            queue_capacity: 1024,
            max_attempts: 5,
            initial_backoff_ms: 200,
        }
    }
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 900,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reservation_sweep_secs: 60,
            alert_scan_secs: 300,
        }
    }
}
