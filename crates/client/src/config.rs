//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_URL` - Base URL of the REST backend (e.g. `https://cms.example.com/api`)
//!
//! ## Optional
//! - `STOREFRONT_DATA_DIR` - Directory for durable storage (default: .storefront)
//! - `STOREFRONT_PAGE_SIZE` - Products per catalog page (default: 12)
//! - `STOREFRONT_CACHE_TTL_SECS` - Unused cache entries expire after this long (default: 60)
//! - `STOREFRONT_CACHE_CAPACITY` - Maximum cached queries (default: 500)
//! - `STOREFRONT_TOKEN_TTL_DAYS` - Expiry applied to stored auth tokens (default: 7)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - HTTP transport timeout (default: 30)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Longest accepted auth token lifetime.
const MAX_TOKEN_TTL_DAYS: i64 = 3650;
/// Longest accepted cache idle lifetime.
const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;
/// Longest accepted HTTP transport timeout.
const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to
    pub api_url: Url,
    /// Directory holding the durable storage file
    pub data_dir: PathBuf,
    /// Products per catalog page
    pub page_size: u32,
    /// Query cache settings
    pub cache: CacheConfig,
    /// Lifetime of a stored auth token
    pub token_ttl: chrono::Duration,
    /// HTTP transport timeout
    pub request_timeout: Duration,
}

/// Query cache settings.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of cached queries
    pub capacity: u64,
    /// Idle lifetime of a cached query
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            ttl: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the API URL.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            data_dir: PathBuf::from(".storefront"),
            page_size: 12,
            cache: CacheConfig::default(),
            token_ttl: chrono::Duration::days(7),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("STOREFRONT_API_URL")?;
        let api_url = Url::parse(&api_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOREFRONT_API_URL".to_string(), e.to_string())
        })?;
        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_API_URL".to_string(),
                format!("unsupported scheme '{}'", api_url.scheme()),
            ));
        }

        let data_dir = PathBuf::from(get_env_or_default("STOREFRONT_DATA_DIR", ".storefront"));
        let page_size: u32 = get_parsed_env("STOREFRONT_PAGE_SIZE", 12)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_PAGE_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let cache = CacheConfig {
            capacity: get_parsed_env("STOREFRONT_CACHE_CAPACITY", 500)?,
            ttl: cache_ttl(get_parsed_env("STOREFRONT_CACHE_TTL_SECS", 60)?)?,
        };
        let token_ttl = token_ttl(get_parsed_env("STOREFRONT_TOKEN_TTL_DAYS", 7)?)?;
        let request_timeout =
            request_timeout(get_parsed_env("STOREFRONT_REQUEST_TIMEOUT_SECS", 30)?)?;

        Ok(Self {
            api_url,
            data_dir,
            page_size,
            cache,
            token_ttl,
            request_timeout,
        })
    }

    /// Path of the durable storage file.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn out_of_range(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidEnvVar(key.to_string(), message)
}

/// Token lifetime in days, `1..=MAX_TOKEN_TTL_DAYS`.
fn token_ttl(days: i64) -> Result<chrono::Duration, ConfigError> {
    const KEY: &str = "STOREFRONT_TOKEN_TTL_DAYS";
    if !(1..=MAX_TOKEN_TTL_DAYS).contains(&days) {
        return Err(out_of_range(
            KEY,
            format!("must be between 1 and {MAX_TOKEN_TTL_DAYS} days, got {days}"),
        ));
    }
    chrono::Duration::try_days(days)
        .ok_or_else(|| out_of_range(KEY, format!("{days} days is out of range")))
}

/// Cache idle lifetime in seconds, at most `MAX_CACHE_TTL_SECS`.
fn cache_ttl(secs: u64) -> Result<Duration, ConfigError> {
    if secs > MAX_CACHE_TTL_SECS {
        return Err(out_of_range(
            "STOREFRONT_CACHE_TTL_SECS",
            format!("must be at most {MAX_CACHE_TTL_SECS} seconds, got {secs}"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Transport timeout in seconds, `1..=MAX_REQUEST_TIMEOUT_SECS`.
fn request_timeout(secs: u64) -> Result<Duration, ConfigError> {
    if !(1..=MAX_REQUEST_TIMEOUT_SECS).contains(&secs) {
        return Err(out_of_range(
            "STOREFRONT_REQUEST_TIMEOUT_SECS",
            format!("must be between 1 and {MAX_REQUEST_TIMEOUT_SECS} seconds, got {secs}"),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(Url::parse("http://localhost:1337/api").unwrap());
        assert_eq!(config.page_size, 12);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.token_ttl, chrono::Duration::days(7));
        assert_eq!(
            config.storage_path(),
            PathBuf::from(".storefront/storage.json")
        );
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u32>("TEST_VAR", " 24 ").unwrap(), 24);
        let err = parse_value::<u32>("TEST_VAR", "lots").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "TEST_VAR"));
    }

    #[test]
    fn test_token_ttl_range() {
        assert_eq!(token_ttl(7).unwrap(), chrono::Duration::days(7));
        assert_eq!(
            token_ttl(MAX_TOKEN_TTL_DAYS).unwrap(),
            chrono::Duration::days(MAX_TOKEN_TTL_DAYS)
        );
        for days in [0, -1, MAX_TOKEN_TTL_DAYS + 1, 100_000_000, i64::MAX] {
            let err = token_ttl(days).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "STOREFRONT_TOKEN_TTL_DAYS"),
                "{days} days accepted"
            );
        }
    }

    #[test]
    fn test_cache_ttl_is_bounded() {
        assert_eq!(cache_ttl(60).unwrap(), Duration::from_secs(60));
        assert!(cache_ttl(0).is_ok());
        assert!(cache_ttl(MAX_CACHE_TTL_SECS + 1).is_err());
        assert!(cache_ttl(u64::MAX).is_err());
    }

    #[test]
    fn test_request_timeout_range() {
        assert_eq!(request_timeout(30).unwrap(), Duration::from_secs(30));
        assert!(request_timeout(0).is_err());
        assert!(request_timeout(u64::MAX).is_err());
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = get_required_env("STOREFRONT_TEST_DEFINITELY_UNSET").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variable: STOREFRONT_TEST_DEFINITELY_UNSET"
        );
    }
}
