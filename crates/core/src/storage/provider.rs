//! The storage contract every backend satisfies.

use async_trait::async_trait;

use super::error::StorageError;
use super::types::{
    GetObjectResult, ListPage, ListRequest, PresignedUrl, PresignedUrlRequest, UploadRequest,
    UploadResult,
};

/// Capability set of an object-storage backend.
///
/// Implementations are safe for unlimited concurrent use once constructed.
/// No method retries; a failure surfaces on the first attempt.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Backend identifier (`s3`, `r2`).
    fn name(&self) -> &'static str;

    /// Target bucket name.
    fn bucket(&self) -> &str;

    /// Upload an object, overwriting any existing object at the same key.
    async fn upload(&self, req: UploadRequest) -> Result<UploadResult, StorageError>;

    /// Fetch an object's content and metadata.
    ///
    /// Fails with [`StorageError::NotFound`] when the key does not exist.
    async fn get(&self, key: &str) -> Result<GetObjectResult, StorageError>;

    /// Delete an object. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Fetch one page of objects, lexicographically ordered by key.
    async fn list(&self, req: ListRequest) -> Result<ListPage, StorageError>;

    /// Check whether an object exists using a metadata-only request.
    ///
    /// Absence yields `Ok(false)`; every other failure is an error.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Sign a time-limited download URL. No request reaches the backend.
    async fn presigned_url(&self, req: PresignedUrlRequest) -> Result<PresignedUrl, StorageError>;

    /// Sign a time-limited upload URL, optionally bound to a content type.
    async fn presigned_upload_url(
        &self,
        req: PresignedUrlRequest,
    ) -> Result<PresignedUrl, StorageError>;

    /// Canonical unsigned URL of an object. Pure; performs no I/O.
    fn public_url(&self, key: &str) -> String;
}
