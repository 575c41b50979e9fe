//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `CHECKOUT_HOST` - Bind address (default: 127.0.0.1)
//! - `CHECKOUT_PORT` - Listen port (default: 3000)
//! - `CHECKOUT_BASE_URL` - Public URL (default: <http://localhost:3000>).
//!   An `https` URL turns on secure session cookies.
//! - `CHECKOUT_PARENT_PORTAL_URL` - External parent portal
//!   (default: <https://parent.gofast.com>)
//! - `CHECKOUT_PAYMENT_LATENCY_MS` - Simulated payment processing time (default: 1500)
//! - `CHECKOUT_EMAIL_DELAY_MS` - Delay before the welcome email preview appears (default: 2000)
//! - `CHECKOUT_SESSION_CAPACITY` - Most sessions kept in memory at once (default: 10000)
//! - `CHECKOUT_SESSION_IDLE_SECS` - Idle time after which a session is dropped (default: 7200)
//! - `CHECKOUT_RATE_LIMIT` - Rate limit payment submissions per client IP (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default parent portal the confirmation screen links out to.
pub const DEFAULT_PARENT_PORTAL_URL: &str = "https://parent.gofast.com";

/// Default simulated payment latency.
pub const DEFAULT_PAYMENT_LATENCY: Duration = Duration::from_millis(1500);

/// Default delay before the welcome email preview is revealed.
pub const DEFAULT_EMAIL_DELAY: Duration = Duration::from_millis(2000);

/// Default number of sessions held in memory.
pub const DEFAULT_SESSION_CAPACITY: u64 = 10_000;

/// Default idle time before a session is dropped.
pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout application configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the checkout
    pub base_url: String,
    /// External parent portal URL
    pub parent_portal_url: Url,
    /// Simulated timings
    pub timing: TimingConfig,
    /// Most sessions held in memory; the least recently used are evicted
    pub session_capacity: u64,
    /// Sessions untouched for this long are dropped
    pub session_idle_timeout: Duration,
    /// Whether payment submissions are rate limited
    pub rate_limit: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate
    pub sentry_traces_sample_rate: f32,
}

/// Simulated latencies for the demo payment flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// How long a payment "processes" before succeeding
    pub payment_latency: Duration,
    /// How long after the confirmation screen mounts the email preview appears
    pub email_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            payment_latency: DEFAULT_PAYMENT_LATENCY,
            email_delay: DEFAULT_EMAIL_DELAY,
        }
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("CHECKOUT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("CHECKOUT_PORT", "3000")?;
        let base_url = get_env_or_default("CHECKOUT_BASE_URL", "http://localhost:3000");
        let parent_portal_url =
            parse_env_or_default::<Url>("CHECKOUT_PARENT_PORTAL_URL", DEFAULT_PARENT_PORTAL_URL)?;
        validate_external_url(&parent_portal_url, "CHECKOUT_PARENT_PORTAL_URL")?;

        let timing = TimingConfig {
            payment_latency: get_millis("CHECKOUT_PAYMENT_LATENCY_MS", DEFAULT_PAYMENT_LATENCY)?,
            email_delay: get_millis("CHECKOUT_EMAIL_DELAY_MS", DEFAULT_EMAIL_DELAY)?,
        };
        let session_capacity = get_optional_env("CHECKOUT_SESSION_CAPACITY")
            .map_or(Ok(DEFAULT_SESSION_CAPACITY), |value| {
                parse_value::<u64>("CHECKOUT_SESSION_CAPACITY", &value)
            })?;
        let session_idle_timeout =
            get_secs("CHECKOUT_SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_TIMEOUT)?;
        let rate_limit = parse_env_or_default::<bool>("CHECKOUT_RATE_LIMIT", "true")?;

        Ok(Self {
            host,
            port,
            base_url,
            parent_portal_url,
            timing,
            session_capacity,
            session_idle_timeout,
            rate_limit,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default::<f32>(
                "SENTRY_TRACES_SAMPLE_RATE",
                "0.0",
            )?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl Default for CheckoutConfig {
    /// Local development defaults (no environment lookups).
    fn default() -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            parent_portal_url: Url::parse(DEFAULT_PARENT_PORTAL_URL)
                .expect("DEFAULT_PARENT_PORTAL_URL is a valid URL"),
            timing: TimingConfig::default(),
            session_capacity: DEFAULT_SESSION_CAPACITY,
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
            rate_limit: true,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Read a millisecond duration.
fn get_millis(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| {
        parse_value::<u64>(key, &value).map(Duration::from_millis)
    })
}

/// Read a duration in whole seconds.
fn get_secs(key: &str, default: Duration) -> Result<Duration, ConfigError> {
    get_optional_env(key).map_or(Ok(default), |value| {
        parse_value::<u64>(key, &value).map(Duration::from_secs)
    })
}

/// The parent portal must be an absolute http(s) URL.
fn validate_external_url(url: &Url, var_name: &str) -> Result<(), ConfigError> {
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be an absolute http(s) URL (got {url})"),
        ));
    }
    Ok(())
}
