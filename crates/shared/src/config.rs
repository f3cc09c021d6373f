//! Application configuration management.

use std::fmt;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Raw object storage settings, as read from files and the environment.
///
/// Values are not validated here; `stowage_core::storage::StorageConfig`
/// turns them into a checked configuration at startup.
#[derive(Clone, Deserialize)]
pub struct StorageSettings {
    /// Backend identifier (`s3` or `r2`).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Custom endpoint URL. Required for `r2`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Backend region code.
    #[serde(default = "default_region")]
    pub region: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key_id: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Target bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Override for derived public URLs (e.g. a CDN or custom domain).
    #[serde(default)]
    pub public_url: Option<String>,
}

fn default_provider() -> String {
    "s3".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            endpoint: None,
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket: String::new(),
            public_url: None,
        }
    }
}

// Credentials must never reach logs.
impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("provider", &self.provider)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &redact(&self.access_key_id))
            .field("secret_access_key", &redact(&self.secret_access_key))
            .field("bucket", &self.bucket)
            .field("public_url", &self.public_url)
            .finish()
    }
}

/// Placeholder shown instead of a secret value.
#[must_use]
pub fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Default `EnvFilter` directive, used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_filter() -> String {
    "stowage=info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `STOWAGE__*` environment variables (e.g. `STOWAGE__STORAGE__BUCKET`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("STOWAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
