//! Backend-agnostic object storage using Apache OpenDAL.
//!
//! Application code depends on [`StorageService`]; which vendor sits behind it
//! is decided once at startup from configuration:
//! - `s3`: AWS S3 on its regional endpoint (or any custom endpoint)
//! - `r2`: Cloudflare R2 and other S3-compatible services behind a custom endpoint
//!
//! # Architecture
//!
//! ```text
//! StorageSettings ──► factory::select ──► S3CompatibleProvider + BackendHooks
//!                                                   │        (s3 | r2)
//!                                                   ▼
//!                                  StorageService (dyn StorageProvider)
//!
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Apache OpenDAL                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │ upload  → write_with       │ presigned_url        → presign_read │
//! │ get     → stat + reader    │ presigned_upload_url → presign_write│
//! │ delete  → delete           │ exists               → stat (HEAD)  │
//! │ list    → lister_with      │ public_url           → (no I/O)     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backends;
mod config;
mod error;
mod factory;
mod keys;
mod policy;
mod provider;
mod s3_compat;
mod service;
mod types;


pub use config::StorageConfig;
pub use error::StorageError;
pub use factory::{ProviderKind, create_provider, select};
pub use keys::{MAX_KEY_LEN, object_key, sanitize_filename, validate_key};
pub use policy::{PolicyViolation, UploadPolicy};
pub use provider::StorageProvider;
pub use s3_compat::{BackendHooks, CreateClient, DerivePublicUrl, S3CompatibleProvider};
pub use service::StorageService;
pub use types::{
    GetObjectResult, ListPage, ListRequest, ObjectAcl, ObjectBody, ObjectDescriptor, PresignedUrl,
    PresignedUrlRequest, UploadBody, UploadRequest, UploadResult,
};
