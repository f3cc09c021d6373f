//! Default cloud backend: AWS S3.

use opendal::{Operator, services};

use crate::storage::config::StorageConfig;
use crate::storage::error::StorageError;
use crate::storage::keys::join_url;
use crate::storage::s3_compat::{BackendHooks, S3CompatibleProvider};

/// Hooks for AWS S3.
pub const HOOKS: BackendHooks = BackendHooks {
    name: "s3",
    create_client,
    derive_public_url,
};

/// Build an S3 provider from configuration.
///
/// # Errors
///
/// Returns a configuration error if the client cannot be built.
pub fn provider(config: StorageConfig) -> Result<S3CompatibleProvider, StorageError> {
    S3CompatibleProvider::new(config, HOOKS)
}

/// Regional endpoint, unless a custom one (e.g. MinIO) is configured.
fn create_client(config: &StorageConfig) -> Result<Operator, StorageError> {
    let endpoint = config.client_endpoint();

    let builder = services::S3::default()
        .endpoint(&endpoint)
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

/// `https://<bucket>.s3.<region>.amazonaws.com/<key>`
fn derive_public_url(config: &StorageConfig, key: &str) -> String {
    join_url(
        &format!("https://{}.s3.{}.amazonaws.com", config.bucket, config.region),
        key,
    )
}
