//! Alternate S3-compatible backend reached through a custom endpoint
//! (Cloudflare R2 and similar services).

use opendal::{Operator, services};

use crate::storage::config::StorageConfig;
use crate::storage::error::StorageError;
use crate::storage::keys::join_url;
use crate::storage::s3_compat::{BackendHooks, S3CompatibleProvider};

/// Hooks for R2-style backends.
pub const HOOKS: BackendHooks = BackendHooks {
    name: "r2",
    create_client,
    derive_public_url,
};

/// Build an R2 provider from configuration.
///
/// # Errors
///
/// Returns [`StorageError::MissingField`] without an endpoint, or a
/// configuration error if the client cannot be built.
pub fn provider(config: StorageConfig) -> Result<S3CompatibleProvider, StorageError> {
    S3CompatibleProvider::new(config, HOOKS)
}

fn create_client(config: &StorageConfig) -> Result<Operator, StorageError> {
    let endpoint = config
        .endpoint_base()
        .ok_or(StorageError::MissingField { field: "endpoint" })?;

    let builder = services::S3::default()
        .endpoint(endpoint)
        .bucket(&config.bucket)
        .region(&config.region)
        .access_key_id(&config.access_key_id)
        .secret_access_key(&config.secret_access_key)
        .disable_config_load()
        .disable_ec2_metadata();

    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .finish())
}

/// Path style on the custom endpoint: `<endpoint>/<bucket>/<key>`.
fn derive_public_url(config: &StorageConfig, key: &str) -> String {
    match config.endpoint_base() {
        Some(endpoint) => join_url(&format!("{endpoint}/{}", config.bucket), key),
        None => format!("{}/{key}", config.bucket),
    }
}
