use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR: &str = "config";
const DEFAULT_API_BASE_URL: &str = "https://starbucks-backend1.onrender.com";
const DEFAULT_UPI_PAYEE_ID: &str = "vaghelaparth2005-2@oksbi";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_PAYMENT_NOTE: &str = "Starbucks Order";
const DEFAULT_COUNTRY_CODE: &str = "+91";
const DEFAULT_CONFIRMATION_DELAY_MS: u64 = 2000;
const DEFAULT_NAVIGATION_DELAY_MS: u64 = 2000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Checkout configuration with validation.
///
/// Values are layered from built-in defaults, an optional `config/` file set
/// and `BREWPAY__`-prefixed environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CheckoutConfig {
    /// Base URL of the remote commerce service (profile, cart, order)
    #[serde(default = "default_api_base_url")]
    #[validate(url)]
    pub api_base_url: String,

    /// UPI payee identifier rendered into the QR payment string
    #[serde(default = "default_upi_payee_id")]
    #[validate(length(min = 3))]
    pub upi_payee_id: String,

    /// ISO currency code for the QR payment string
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,

    /// Transaction note rendered into the QR payment string
    #[serde(default = "default_payment_note")]
    pub payment_note: String,

    /// Fixed dialing prefix for the contact phone number
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Delay between the simulated QR payment confirmation and order placement
    #[serde(default = "default_confirmation_delay_ms")]
    #[validate(range(min = 1))]
    pub confirmation_delay_ms: u64,

    /// Delay between QR order placement success and navigation away
    #[serde(default = "default_navigation_delay_ms")]
    #[validate(range(min = 1))]
    pub navigation_delay_ms: u64,

    /// Timeout applied to every outbound HTTP request
    #[serde(default = "default_request_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub request_timeout_secs: u64,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            upi_payee_id: default_upi_payee_id(),
            currency: default_currency(),
            payment_note: default_payment_note(),
            country_code: default_country_code(),
            confirmation_delay_ms: default_confirmation_delay_ms(),
            navigation_delay_ms: default_navigation_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_upi_payee_id() -> String {
    DEFAULT_UPI_PAYEE_ID.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_payment_note() -> String {
    DEFAULT_PAYMENT_NOTE.to_string()
}

fn default_country_code() -> String {
    DEFAULT_COUNTRY_CODE.to_string()
}

fn default_confirmation_delay_ms() -> u64 {
    DEFAULT_CONFIRMATION_DELAY_MS
}

fn default_navigation_delay_ms() -> u64 {
    DEFAULT_NAVIGATION_DELAY_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Loads the checkout configuration from files and the environment.
pub fn load_config() -> Result<CheckoutConfig, ConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("BREWPAY").separator("__"))
        .build()?;

    let cfg: CheckoutConfig = config.try_deserialize()?;

    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("Configuration validation failed: {}", e)))?;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = CheckoutConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.confirmation_delay_ms, 2000);
        assert_eq!(cfg.navigation_delay_ms, 2000);
        assert_eq!(cfg.country_code, "+91");
        assert_eq!(cfg.currency, "INR");
    }
}
