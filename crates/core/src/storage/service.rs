//! Storage facade consumed by application code.

use std::sync::Arc;

use async_trait::async_trait;
use stowage_shared::StorageSettings;

use super::config::StorageConfig;
use super::error::StorageError;
use super::factory::{create_provider, select};
use super::provider::StorageProvider;
use super::types::{
    GetObjectResult, ListPage, ListRequest, PresignedUrl, PresignedUrlRequest, UploadRequest,
    UploadResult,
};

/// Storage service handed to application code.
///
/// Holds the backend resolved at startup and forwards every call to it
/// unchanged. Cloning is cheap and shares the backend.
#[derive(Clone)]
pub struct StorageService {
    provider: Arc<dyn StorageProvider>,
}

impl StorageService {
    /// Wrap an already-resolved provider.
    #[must_use]
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self { provider }
    }

    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        create_provider(config).map(Self::new)
    }

    /// Create a new storage service from raw settings.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown provider or incomplete settings.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        select(settings).map(Self::new)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

#[async_trait]
impl StorageProvider for StorageService {
    fn name(&self) -> &'static str {
        self.provider.name()
    }

    fn bucket(&self) -> &str {
        self.provider.bucket()
    }

    async fn upload(&self, req: UploadRequest) -> Result<UploadResult, StorageError> {
        self.provider.upload(req).await
    }

    async fn get(&self, key: &str) -> Result<GetObjectResult, StorageError> {
        self.provider.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.provider.delete(key).await
    }

    async fn list(&self, req: ListRequest) -> Result<ListPage, StorageError> {
        self.provider.list(req).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.provider.exists(key).await
    }

    async fn presigned_url(&self, req: PresignedUrlRequest) -> Result<PresignedUrl, StorageError> {
        self.provider.presigned_url(req).await
    }

    async fn presigned_upload_url(
        &self,
        req: PresignedUrlRequest,
    ) -> Result<PresignedUrl, StorageError> {
        self.provider.presigned_upload_url(req).await
    }

    fn public_url(&self, key: &str) -> String {
        self.provider.public_url(key)
    }
}
