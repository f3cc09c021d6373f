//! Storage configuration types.

use std::fmt;

use stowage_shared::StorageSettings;
use stowage_shared::config::redact;
use url::Url;

use super::error::StorageError;
use super::factory::ProviderKind;

/// Validated storage configuration.
///
/// Built once at startup and never mutated afterwards. Credentials are
/// redacted from the `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Selected backend.
    pub provider: ProviderKind,
    /// Custom endpoint URL (mandatory for R2).
    pub endpoint: Option<String>,
    /// Backend region code.
    pub region: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Target bucket name.
    pub bucket: String,
    /// Override for derived public URLs.
    pub public_url: Option<String>,
}

impl StorageConfig {
    /// Default region when none is configured.
    pub const DEFAULT_REGION: &'static str = "us-east-1";

    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(
        provider: ProviderKind,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            endpoint: None,
            region: Self::DEFAULT_REGION.to_string(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            bucket: bucket.into(),
            public_url: None,
        }
    }

    /// Set the custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the public URL override.
    #[must_use]
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// Build a validated config from raw settings.
    ///
    /// Empty optional strings are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider, a missing
    /// mandatory field, or a malformed URL.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider: ProviderKind = settings.provider.parse()?;

        let config = Self {
            provider,
            endpoint: non_empty(settings.endpoint.as_deref()),
            region: if settings.region.trim().is_empty() {
                Self::DEFAULT_REGION.to_string()
            } else {
                settings.region.trim().to_string()
            },
            access_key_id: settings.access_key_id.clone(),
            secret_access_key: settings.secret_access_key.clone(),
            bucket: settings.bucket.trim().to_string(),
            public_url: non_empty(settings.public_url.as_deref()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check mandatory fields and URL shapes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingField`] or [`StorageError::Configuration`].
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.bucket.is_empty() {
            return Err(StorageError::MissingField { field: "bucket" });
        }
        if self.access_key_id.is_empty() {
            return Err(StorageError::MissingField {
                field: "access_key_id",
            });
        }
        if self.secret_access_key.is_empty() {
            return Err(StorageError::MissingField {
                field: "secret_access_key",
            });
        }
        if self.provider.requires_endpoint() && self.endpoint.is_none() {
            return Err(StorageError::MissingField { field: "endpoint" });
        }
        if let Some(endpoint) = &self.endpoint {
            check_http_url("endpoint", endpoint)?;
        }
        if let Some(public_url) = &self.public_url {
            check_http_url("public_url", public_url)?;
        }
        Ok(())
    }

    /// Endpoint with trailing slashes removed.
    #[must_use]
    pub fn endpoint_base(&self) -> Option<&str> {
        self.endpoint.as_deref().map(|e| e.trim_end_matches('/'))
    }

    /// Endpoint the client talks to: the configured one, else the AWS
    /// regional endpoint.
    #[must_use]
    pub fn client_endpoint(&self) -> String {
        self.endpoint_base().map_or_else(
            || format!("https://s3.{}.amazonaws.com", self.region),
            String::from,
        )
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
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

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn check_http_url(field: &str, value: &str) -> Result<(), StorageError> {
    let url = Url::parse(value)
        .map_err(|e| StorageError::configuration(format!("{field} '{value}' is not a URL: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        _ => Err(StorageError::configuration(format!(
            "{field} '{value}' must be an absolute http(s) URL"
        ))),
    }
}
