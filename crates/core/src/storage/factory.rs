//! Backend selection.
//!
//! This is the only place that inspects provider identity; everything
//! downstream sees `dyn StorageProvider`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stowage_shared::StorageSettings;

use super::backends::{r2, s3};
use super::config::StorageConfig;
use super::error::StorageError;
use super::provider::StorageProvider;

/// Known storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// AWS S3 (default).
    S3,
    /// Cloudflare R2 or another S3-compatible service behind a custom endpoint.
    R2,
}

impl ProviderKind {
    /// Every known backend.
    pub const ALL: [Self; 2] = [Self::S3, Self::R2];

    /// Configuration identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::R2 => "r2",
        }
    }

    /// Whether the backend cannot be reached without a custom endpoint.
    #[must_use]
    pub const fn requires_endpoint(self) -> bool {
        match self {
            Self::S3 => false,
            Self::R2 => true,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StorageError::UnknownProvider {
                provider: s.to_string(),
            })
    }
}

/// Instantiate the backend named by `config.provider`.
///
/// # Errors
///
/// Returns a configuration error if the config is incomplete or the client
/// cannot be built.
pub fn create_provider(config: StorageConfig) -> Result<Arc<dyn StorageProvider>, StorageError> {
    config.validate()?;

    let provider = match config.provider {
        ProviderKind::S3 => s3::provider(config)?,
        ProviderKind::R2 => r2::provider(config)?,
    };

    Ok(Arc::new(provider))
}

/// Validate raw settings and instantiate the selected backend.
///
/// # Errors
///
/// Returns [`StorageError::UnknownProvider`] for an unrecognised identifier,
/// or any error from [`create_provider`].
pub fn select(settings: &StorageSettings) -> Result<Arc<dyn StorageProvider>, StorageError> {
    create_provider(StorageConfig::from_settings(settings)?)
}
