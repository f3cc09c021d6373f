//! Request and result types for storage operations.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Access-control hint attached to an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectAcl {
    /// Only the bucket owner may read (bucket default).
    Private,
    /// Anyone may read the object.
    PublicRead,
}

impl ObjectAcl {
    /// Canned ACL name as used by S3.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::PublicRead => "public-read",
        }
    }
}

impl FromStr for ObjectAcl {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "public-read" => Ok(Self::PublicRead),
            other => Err(StorageError::invalid_request(format!(
                "unknown access-control hint '{other}'"
            ))),
        }
    }
}

/// Body of an upload: an in-memory buffer or a byte stream.
pub enum UploadBody {
    /// Whole object in memory.
    Bytes(Bytes),
    /// Object produced chunk by chunk.
    Stream(BoxStream<'static, Result<Bytes, std::io::Error>>),
}

impl UploadBody {
    /// Wrap a byte stream.
    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static,
    {
        Self::Stream(stream.boxed())
    }
}

impl fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for UploadBody {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value)
    }
}

impl From<Vec<u8>> for UploadBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<String> for UploadBody {
    fn from(value: String) -> Self {
        Self::Bytes(Bytes::from(value))
    }
}

impl From<&'static str> for UploadBody {
    fn from(value: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(value.as_bytes()))
    }
}

impl From<&'static [u8]> for UploadBody {
    fn from(value: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(value))
    }
}

/// Request to upload an object.
#[derive(Debug)]
pub struct UploadRequest {
    /// Object key, unique within the bucket.
    pub key: String,
    /// Object content.
    pub body: UploadBody,
    /// Content type (MIME type).
    pub content_type: Option<String>,
    /// User metadata stored with the object.
    pub metadata: HashMap<String, String>,
    /// Access-control hint.
    pub acl: Option<ObjectAcl>,
}

impl UploadRequest {
    /// Create an upload request with no content type, metadata, or ACL.
    pub fn new(key: impl Into<String>, body: impl Into<UploadBody>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
            content_type: None,
            metadata: HashMap::new(),
            acl: None,
        }
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add one user metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the access-control hint.
    #[must_use]
    pub fn with_acl(mut self, acl: ObjectAcl) -> Self {
        self.acl = Some(acl);
        self
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Object key.
    pub key: String,
    /// Public URL of the object.
    pub url: String,
    /// Backend-assigned integrity tag.
    pub etag: Option<String>,
}

/// Streamed object content returned by `get`.
pub struct ObjectBody {
    inner: BoxStream<'static, Result<Bytes, StorageError>>,
}

impl ObjectBody {
    /// Wrap a stream of chunks.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, StorageError>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the underlying stream.
    pub async fn collect_bytes(mut self) -> Result<Bytes, StorageError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl Stream for ObjectBody {
    type Item = Result<Bytes, StorageError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObjectBody(..)")
    }
}

/// Result of fetching an object.
#[derive(Debug)]
pub struct GetObjectResult {
    /// Object content.
    pub body: ObjectBody,
    /// Content type, if the backend recorded one.
    pub content_type: Option<String>,
    /// Content length in bytes.
    pub content_length: u64,
    /// User metadata stored with the object.
    pub metadata: HashMap<String, String>,
    /// Backend-assigned integrity tag.
    pub etag: Option<String>,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One object in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDescriptor {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Parameters for one listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Only keys starting with this prefix.
    pub prefix: Option<String>,
    /// Upper bound on objects per page.
    pub max_keys: Option<usize>,
    /// Cursor from the previous page, passed back verbatim.
    pub cursor: Option<String>,
}

impl ListRequest {
    /// S3's page size when none is requested; also the upper bound.
    pub const DEFAULT_MAX_KEYS: usize = 1000;

    /// List everything under a prefix.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Set the page size bound.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Resume from a previous page's cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Page size to request, clamped to `1..=DEFAULT_MAX_KEYS`.
    ///
    /// # Errors
    ///
    /// Returns an error when `max_keys` is zero.
    pub fn page_size(&self) -> Result<usize, StorageError> {
        match self.max_keys {
            None => Ok(Self::DEFAULT_MAX_KEYS),
            Some(0) => Err(StorageError::invalid_request("max_keys must be at least 1")),
            Some(n) => Ok(n.min(Self::DEFAULT_MAX_KEYS)),
        }
    }
}

/// One page of a listing.
///
/// `cursor` is present exactly when `truncated` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListPage {
    /// Objects on this page, in backend order.
    pub objects: Vec<ObjectDescriptor>,
    /// Cursor for the next page.
    pub cursor: Option<String>,
    /// Whether more objects follow.
    pub truncated: bool,
}

/// Request for a presigned URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrlRequest {
    /// Object key.
    pub key: String,
    /// URL lifetime.
    pub ttl: Duration,
    /// Content type the upload must carry (upload URLs only).
    pub content_type: Option<String>,
}

impl PresignedUrlRequest {
    /// Default URL lifetime: 1 hour.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
    /// Longest lifetime SigV4 query signing accepts: 7 days.
    pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

    /// Create a request with the default lifetime.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ttl: Self::DEFAULT_TTL,
            content_type: None,
        }
    }

    /// Set the URL lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the URL lifetime in seconds.
    #[must_use]
    pub fn with_ttl_secs(self, secs: u64) -> Self {
        self.with_ttl(Duration::from_secs(secs))
    }

    /// Restrict an upload URL to one content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Check the lifetime bounds.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero TTL or one longer than [`Self::MAX_TTL`].
    pub fn validate_ttl(&self) -> Result<(), StorageError> {
        if self.ttl.is_zero() {
            return Err(StorageError::invalid_request("ttl must be positive"));
        }
        if self.ttl > Self::MAX_TTL {
            return Err(StorageError::invalid_request(format!(
                "ttl of {}s exceeds maximum of {}s",
                self.ttl.as_secs(),
                Self::MAX_TTL.as_secs()
            )));
        }
        Ok(())
    }
}

/// Presigned URL for upload or download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresignedUrl {
    /// The presigned URL.
    pub url: String,
    /// HTTP method to use (PUT for upload, GET for download).
    pub method: String,
    /// Headers the request must carry for the signature to match.
    pub headers: HashMap<String, String>,
    /// When the URL expires.
    pub expires_at: DateTime<Utc>,
}
