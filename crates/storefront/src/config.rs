//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CART_API_BASE_URL` - Base URL of the remote cart API (e.g., `https://api.example.com/v1`)
//!
//! ## Optional
//! - `CART_API_TOKEN` - Bearer token for the cart API (validated for strength)
//! - `CART_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `CART_STORE_PATH` - Local state file (default: `.storefront-cart/state.json`)
//! - `CART_CURRENCY` - Currency for cart totals (default: USD)
//! - `CART_FALLBACK_UNIT_PRICE` - Unit price for lines without one (default: 0.00)
//! - `CART_VARIANT_FALLBACK` - Use the product ID as variant ID when a product
//!   has no variants (default: true)
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product lookup cache TTL (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use storefront_cart_core::{CurrencyCode, Price};

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PRODUCT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_STORE_PATH: &str = ".storefront-cart/state.json";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Cart component configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Remote cart API configuration
    pub api: CartApiConfig,
    /// Path of the local state file
    pub store_path: PathBuf,
    /// Unit price applied to lines that carry none
    pub fallback_unit_price: Price,
    /// Whether a product without variants may be added using its own ID
    pub variant_fallback: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Remote cart API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct CartApiConfig {
    /// Base URL all routes are resolved against
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// TTL for cached product lookups
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for CartApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl CartApiConfig {
    /// Configuration for a base URL with default timeout and cache TTL.
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            product_cache_ttl: Duration::from_secs(DEFAULT_PRODUCT_CACHE_TTL_SECS),
        }
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&get_required_env("CART_API_BASE_URL")?)?;
        let token = get_optional_env("CART_API_TOKEN")
            .map(|value| {
                validate_secret_strength(&value, "CART_API_TOKEN")?;
                Ok::<_, ConfigError>(SecretString::from(value))
            })
            .transpose()?;
        let timeout = Duration::from_secs(parse_env_or_default(
            "CART_API_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        let product_cache_ttl = Duration::from_secs(parse_env_or_default(
            "CART_PRODUCT_CACHE_TTL_SECS",
            DEFAULT_PRODUCT_CACHE_TTL_SECS,
        )?);

        if timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_API_TIMEOUT_SECS".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            token,
            timeout,
            product_cache_ttl,
        })
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = CartApiConfig::from_env()?;
        let store_path = PathBuf::from(get_env_or_default("CART_STORE_PATH", DEFAULT_STORE_PATH));

        let currency = get_env_or_default("CART_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("CART_CURRENCY".to_string(), e.to_string()))?;
        let fallback_amount = get_env_or_default("CART_FALLBACK_UNIT_PRICE", "0.00")
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CART_FALLBACK_UNIT_PRICE".to_string(), e.to_string())
            })?;
        if fallback_amount.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_FALLBACK_UNIT_PRICE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let variant_fallback = parse_bool(
            "CART_VARIANT_FALLBACK",
            &get_env_or_default("CART_VARIANT_FALLBACK", "true"),
        )?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api,
            store_path,
            fallback_unit_price: Price::new(fallback_amount, currency),
            variant_fallback,
            sentry_dsn,
        })
    }

    /// Configuration for tests and embedding: defaults everywhere except the
    /// API base URL and store path.
    #[must_use]
    pub fn with_defaults(base_url: Url, store_path: PathBuf) -> Self {
        Self {
            api: CartApiConfig::new(base_url),
            store_path,
            fallback_unit_price: Price::zero(CurrencyCode::default()),
            variant_fallback: true,
            sentry_dsn: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a numeric environment variable with a default value.
fn parse_env_or_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    match get_optional_env(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got '{other}'"),
        )),
    }
}

/// Parse the API base URL, normalizing it to end with a slash so that
/// relative routes join under it instead of replacing its last segment.
fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidEnvVar("CART_API_BASE_URL".to_string(), msg);

    let mut url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-token-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://api.shop.test/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.shop.test/v1/");
        assert_eq!(
            url.join("carts/abc").unwrap().as_str(),
            "https://api.shop.test/v1/carts/abc"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://files.shop.test").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("K", "TRUE").unwrap());
        assert!(parse_bool("K", "1").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let mut config = CartApiConfig::new(Url::parse("https://api.shop.test/").unwrap());
        config.token = Some(SecretString::from("super_secret_cart_token".to_string()));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.shop.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_cart_token"));
    }

    #[test]
    fn test_with_defaults() {
        let config = CartConfig::with_defaults(
            Url::parse("http://127.0.0.1:9000/").unwrap(),
            PathBuf::from("/tmp/cart.json"),
        );
        assert!(config.variant_fallback);
        assert_eq!(config.api.timeout, Duration::from_secs(10));
        assert_eq!(config.fallback_unit_price, Price::zero(CurrencyCode::USD));
    }
}
