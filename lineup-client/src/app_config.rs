use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    pub checkout: CheckoutRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Checkout tunables the embedding page layer reads alongside the adapters.
#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutRules {
    /// Fallback hold lifetime when the server sends neither an absolute
    /// expiry nor a TTL hint.
    #[serde(default = "default_hold_ttl")]
    pub default_hold_ttl_seconds: u64,
    /// Upper bound on the host payment-dialog wait.
    #[serde(default = "default_dialog_deadline")]
    pub dialog_deadline_seconds: u64,
    /// Smallest purchasable certificate denomination, in minor units.
    pub certificate_min_minor: i64,
}

fn default_request_timeout() -> u64 {
    15
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

fn default_hold_ttl() -> u64 {
    900
}

fn default_dialog_deadline() -> u64 {
    180
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default"))
            // Add in the current environment file (optional)
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file that isn't checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Environment overrides, e.g. LINEUP_API__BASE_URL
            .add_source(config::Environment::with_prefix("LINEUP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
