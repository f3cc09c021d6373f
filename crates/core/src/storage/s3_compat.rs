//! S3-protocol implementation shared by every backend.
//!
//! Backends only differ in how the OpenDAL operator is built and how public
//! URLs look; both are supplied as [`BackendHooks`]. Everything else (verbs,
//! existence probing, pagination, presigning) lives here.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use opendal::raw::PresignedRequest;
use opendal::{ErrorKind, Metadata, Operator};
use reqsign::{AwsCredential, AwsV4Signer};
use tracing::{debug, info, warn};

use super::config::StorageConfig;
use super::error::StorageError;
use super::keys::{decode_cursor, encode_cursor, join_url, validate_key};
use super::provider::StorageProvider;
use super::types::{
    GetObjectResult, ListPage, ListRequest, ObjectAcl, ObjectBody, ObjectDescriptor, PresignedUrl,
    PresignedUrlRequest, UploadBody, UploadRequest, UploadResult,
};

/// Builds the low-level client for a backend.
pub type CreateClient = fn(&StorageConfig) -> Result<Operator, StorageError>;

/// Derives the conventional public URL of a key when no override is set.
pub type DerivePublicUrl = fn(&StorageConfig, &str) -> String;

/// Backend-specific construction and URL hooks.
#[derive(Debug, Clone, Copy)]
pub struct BackendHooks {
    /// Backend identifier.
    pub name: &'static str,
    /// Client construction.
    pub create_client: CreateClient,
    /// Public URL convention.
    pub derive_public_url: DerivePublicUrl,
}

/// Storage provider speaking the S3 protocol through an OpenDAL operator.
pub struct S3CompatibleProvider {
    operator: Operator,
    config: StorageConfig,
    hooks: BackendHooks,
}

impl S3CompatibleProvider {
    /// Build the client through the backend hooks.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client cannot be constructed.
    pub fn new(config: StorageConfig, hooks: BackendHooks) -> Result<Self, StorageError> {
        let operator = (hooks.create_client)(&config)?;

        info!(
            provider = hooks.name,
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "storage backend initialised"
        );

        Ok(Self::with_client(config, hooks, operator))
    }

    /// Use an already-built client instead of `hooks.create_client`.
    #[must_use]
    pub fn with_client(config: StorageConfig, hooks: BackendHooks, operator: Operator) -> Self {
        Self {
            operator,
            config,
            hooks,
        }
    }

    /// The configuration this provider was built from.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Map a client error, logging anything other than absence.
    fn fail(&self, op: &'static str, key: &str, err: opendal::Error) -> StorageError {
        let mapped = StorageError::from_client(err, key);
        if !mapped.is_not_found() {
            warn!(
                provider = self.hooks.name,
                bucket = %self.config.bucket,
                key,
                op,
                error = %mapped,
                "storage operation failed"
            );
        }
        mapped
    }

    async fn write_bytes(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: Option<&str>,
        metadata: HashMap<String, String>,
    ) -> Result<Metadata, opendal::Error> {
        let mut write = self.operator.write_with(key, bytes);
        if let Some(ct) = content_type {
            write = write.content_type(ct);
        }
        if !metadata.is_empty() {
            write = write.user_metadata(metadata);
        }
        write.await
    }

    async fn write_stream(
        &self,
        key: &str,
        mut stream: BoxStream<'static, Result<Bytes, std::io::Error>>,
        content_type: Option<&str>,
        metadata: HashMap<String, String>,
    ) -> Result<Metadata, opendal::Error> {
        let mut open = self.operator.writer_with(key);
        if let Some(ct) = content_type {
            open = open.content_type(ct);
        }
        if !metadata.is_empty() {
            open = open.user_metadata(metadata);
        }
        let mut writer = open.await?;

        while let Some(chunk) = stream.next().await {
            let written = match chunk {
                Ok(bytes) => writer.write(bytes).await,
                Err(e) => Err(opendal::Error::new(
                    ErrorKind::Unexpected,
                    "upload body stream failed",
                )
                .set_source(e)),
            };
            if let Err(e) = written {
                // Nothing becomes visible under the key after an abort.
                if let Err(abort) = writer.abort().await {
                    warn!(key, error = %abort, "failed to abort partial upload");
                }
                return Err(e);
            }
        }

        writer.close().await
    }
}

#[async_trait]
impl StorageProvider for S3CompatibleProvider {
    fn name(&self) -> &'static str {
        self.hooks.name
    }

    fn bucket(&self) -> &str {
        &self.config.bucket
    }

    async fn upload(&self, req: UploadRequest) -> Result<UploadResult, StorageError> {
        validate_key(&req.key)?;

        // The client has no per-object ACL verb; visibility follows the bucket.
        if let Some(acl @ ObjectAcl::PublicRead) = req.acl {
            return Err(StorageError::Unsupported(format!(
                "per-object access control '{}'",
                acl.as_str()
            )));
        }

        let capability = self.operator.info().full_capability();
        if req.content_type.is_some() && !capability.write_with_content_type {
            return Err(StorageError::Unsupported(
                "content type on upload".to_string(),
            ));
        }
        if !req.metadata.is_empty() && !capability.write_with_user_metadata {
            return Err(StorageError::Unsupported(
                "user metadata on upload".to_string(),
            ));
        }

        let UploadRequest {
            key,
            body,
            content_type,
            metadata,
            ..
        } = req;

        debug!(bucket = %self.config.bucket, key = %key, body = ?body, "uploading object");

        let written = match body {
            UploadBody::Bytes(bytes) => {
                self.write_bytes(&key, bytes, content_type.as_deref(), metadata)
                    .await
            }
            UploadBody::Stream(stream) => {
                self.write_stream(&key, stream, content_type.as_deref(), metadata)
                    .await
            }
        }
        .map_err(|e| self.fail("upload", &key, e))?;

        Ok(UploadResult {
            url: self.public_url(&key),
            etag: written.etag().map(String::from),
            key,
        })
    }

    async fn get(&self, key: &str) -> Result<GetObjectResult, StorageError> {
        validate_key(key)?;
        debug!(bucket = %self.config.bucket, key, "fetching object");

        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| self.fail("get", key, e))?;

        let mut open = self.operator.reader_with(key);
        // Pin the body to the version we just described.
        if self.operator.info().full_capability().read_with_if_match
            && let Some(etag) = meta.etag()
        {
            open = open.if_match(etag);
        }
        let reader = open.await.map_err(|e| self.fail("get", key, e))?;
        let stream = reader
            .into_bytes_stream(..)
            .await
            .map_err(|e| self.fail("get", key, e))?;

        Ok(GetObjectResult {
            body: ObjectBody::new(stream.map_err(|e| StorageError::backend(e.to_string()))),
            content_type: meta.content_type().map(String::from),
            content_length: meta.content_length(),
            metadata: meta.user_metadata().cloned().unwrap_or_default(),
            etag: meta.etag().map(String::from),
            last_modified: last_modified(&meta),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        debug!(bucket = %self.config.bucket, key, "deleting object");

        match self.operator.delete(key).await {
            Ok(()) => Ok(()),
            // Absent keys are already deleted.
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.fail("delete", key, e)),
        }
    }

    async fn list(&self, req: ListRequest) -> Result<ListPage, StorageError> {
        let page_size = req.page_size()?;
        let resume_after = req.cursor.as_deref().map(decode_cursor).transpose()?;
        let prefix = req.prefix.unwrap_or_default();

        debug!(
            bucket = %self.config.bucket,
            prefix = %prefix,
            page_size,
            resumed = resume_after.is_some(),
            "listing objects"
        );

        let capability = self.operator.info().full_capability();
        let native_start_after = capability.list_with_start_after;

        let mut open = self.operator.lister_with(&prefix).recursive(true);
        if capability.list_with_limit {
            // One extra entry tells us whether another page exists.
            open = open.limit(page_size + 1);
        }
        if native_start_after && let Some(after) = &resume_after {
            open = open.start_after(after);
        }
        let mut lister = open.await.map_err(|e| self.fail("list", &prefix, e))?;

        let mut objects = Vec::with_capacity(page_size);
        let mut truncated = false;
        while let Some(entry) = lister
            .try_next()
            .await
            .map_err(|e| self.fail("list", &prefix, e))?
        {
            let meta = entry.metadata();
            if !meta.is_file() {
                continue;
            }
            if !native_start_after
                && let Some(after) = &resume_after
                && entry.path() <= after.as_str()
            {
                continue;
            }
            if objects.len() == page_size {
                truncated = true;
                break;
            }
            objects.push(ObjectDescriptor {
                key: entry.path().to_string(),
                size: meta.content_length(),
                last_modified: last_modified(meta),
            });
        }

        let cursor = if truncated {
            objects.last().map(|last| encode_cursor(&last.key))
        } else {
            None
        };

        Ok(ListPage {
            objects,
            cursor,
            truncated,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;

        match self.operator.stat(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.fail("exists", key, e)),
        }
    }

    async fn presigned_url(&self, req: PresignedUrlRequest) -> Result<PresignedUrl, StorageError> {
        validate_key(&req.key)?;
        req.validate_ttl()?;
        if req.content_type.is_some() {
            return Err(StorageError::invalid_request(
                "content type constraints apply to upload URLs only",
            ));
        }

        let signed = self
            .operator
            .presign_read(&req.key, req.ttl)
            .await
            .map_err(|e| self.fail("presign_read", &req.key, e))?;

        Ok(presigned(&signed, req.ttl))
    }

    async fn presigned_upload_url(
        &self,
        req: PresignedUrlRequest,
    ) -> Result<PresignedUrl, StorageError> {
        validate_key(&req.key)?;
        req.validate_ttl()?;

        let Some(content_type) = req.content_type.as_deref() else {
            let signed = self
                .operator
                .presign_write(&req.key, req.ttl)
                .await
                .map_err(|e| self.fail("presign_write", &req.key, e))?;
            return Ok(presigned(&signed, req.ttl));
        };

        // The client signs writes without their options, so a URL bound to a
        // content type is signed here with the same credentials.
        if !self.operator.info().full_capability().presign_write {
            return Err(StorageError::Unsupported(
                "presigned upload URLs".to_string(),
            ));
        }
        debug!(
            bucket = %self.config.bucket,
            key = %req.key,
            content_type,
            "signing content-type bound upload"
        );
        sign_upload(&self.config, &req.key, content_type, req.ttl)
    }

    fn public_url(&self, key: &str) -> String {
        match &self.config.public_url {
            Some(base) => join_url(base, key),
            None => (self.hooks.derive_public_url)(&self.config, key),
        }
    }
}

fn presigned(signed: &PresignedRequest, ttl: Duration) -> PresignedUrl {
    let headers = signed
        .header()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    PresignedUrl {
        url: signed.uri().to_string(),
        method: signed.method().to_string(),
        headers,
        expires_at: expires_at(ttl),
    }
}

/// Query-sign a path-style `PUT` whose `Content-Type` is part of the
/// signature.
fn sign_upload(
    config: &StorageConfig,
    key: &str,
    content_type: &str,
    ttl: Duration,
) -> Result<PresignedUrl, StorageError> {
    let url = join_url(
        &format!("{}/{}", config.client_endpoint(), config.bucket),
        key,
    );
    let mut request = http::Request::builder()
        .method(http::Method::PUT)
        .uri(url.as_str())
        .header(http::header::CONTENT_TYPE, content_type)
        .body(())
        .map_err(|e| StorageError::invalid_request(format!("cannot sign upload of '{key}': {e}")))?;

    let credential = AwsCredential {
        access_key_id: config.access_key_id.clone(),
        secret_access_key: config.secret_access_key.clone(),
        ..AwsCredential::default()
    };
    AwsV4Signer::new("s3", &config.region)
        .sign_query(&mut request, ttl, &credential)
        .map_err(|e| StorageError::backend(format!("signing upload of '{key}' failed: {e}")))?;
    let (parts, ()) = request.into_parts();

    // Host comes from the URL itself.
    let headers = parts
        .headers
        .iter()
        .filter(|(name, _)| name.as_str() != "host")
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    Ok(PresignedUrl {
        url: parts.uri.to_string(),
        method: parts.method.to_string(),
        headers,
        expires_at: expires_at(ttl),
    })
}

fn expires_at(ttl: Duration) -> DateTime<Utc> {
    let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Utc::now()
        .checked_add_signed(TimeDelta::try_seconds(ttl_secs).unwrap_or(TimeDelta::MAX))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn last_modified(meta: &Metadata) -> Option<DateTime<Utc>> {
    let ts = meta.last_modified()?.into_inner();
    DateTime::from_timestamp(ts.as_second(), u32::try_from(ts.subsec_nanosecond()).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opendal::EntryMode;
    use opendal::raw::Timestamp;

    #[test]
    fn test_last_modified_keeps_subsecond_precision() {
        let ts: Timestamp = "2024-05-01T10:00:00.250Z"
            .parse()
            .expect("timestamp should parse");
        let meta = Metadata::new(EntryMode::FILE).with_last_modified(ts);

        let converted = last_modified(&meta).expect("timestamp is set");
        assert_eq!(converted.to_rfc3339(), "2024-05-01T10:00:00.250+00:00");
    }

    #[test]
    fn test_last_modified_absent() {
        assert!(last_modified(&Metadata::new(EntryMode::FILE)).is_none());
    }

    #[test]
    fn test_expires_at_saturates() {
        let far = expires_at(Duration::from_secs(u64::MAX));
        assert!(far > Utc::now());
    }
}
