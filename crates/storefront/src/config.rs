//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CLEMENTINE_GATEWAY_URL` - Base URL of the hosted table store
//! - `CLEMENTINE_GATEWAY_API_KEY` - Service key for the table store
//!   (validated against placeholder patterns and an entropy floor)
//!
//! ## Optional
//! - `CLEMENTINE_STORAGE_DIR` - Durable client-state directory
//!   (default: `.clementine`)
//! - `CLEMENTINE_ADMIN_SESSION_TTL_HOURS` - Admin session expiry horizon
//!   (default: 24)

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Duration;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Hosted table-store configuration
    pub gateway: GatewayConfig,
    /// Directory for durable client state (sessions, favorites)
    pub storage_dir: PathBuf,
    /// Admin session expiry horizon in hours
    pub admin_session_ttl_hours: i64,
}

/// Hosted table-store configuration.
///
/// Implements `Debug` manually to redact the service key.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Base URL of the table store (e.g. <https://tables.example.com/>)
    pub base_url: Url,
    /// Service key sent with every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid,
    /// or if the service key fails validation (placeholder detection,
    /// entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gateway = GatewayConfig::from_env()?;

        let storage_dir =
            PathBuf::from(get_env_or_default("CLEMENTINE_STORAGE_DIR", ".clementine"));

        let admin_session_ttl_hours =
            get_env_or_default("CLEMENTINE_ADMIN_SESSION_TTL_HOURS", "24")
                .parse::<i64>()
                .map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "CLEMENTINE_ADMIN_SESSION_TTL_HOURS".to_string(),
                        e.to_string(),
                    )
                })?;
        if admin_session_ttl_hours < 1 {
            return Err(ConfigError::InvalidEnvVar(
                "CLEMENTINE_ADMIN_SESSION_TTL_HOURS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            gateway,
            storage_dir,
            admin_session_ttl_hours,
        })
    }

    /// The admin session expiry horizon as a duration.
    #[must_use]
    pub fn admin_session_ttl(&self) -> Duration {
        Duration::hours(self.admin_session_ttl_hours)
    }
}

impl GatewayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("CLEMENTINE_GATEWAY_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("CLEMENTINE_GATEWAY_URL".to_string(), e.to_string())
        })?;

        Ok(Self {
            base_url,
            api_key: get_validated_secret("CLEMENTINE_GATEWAY_API_KEY")?,
        })
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real service keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the real service key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
