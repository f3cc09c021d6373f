//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Provider identifier matches no known backend.
    #[error("unknown storage provider: {provider}")]
    UnknownProvider {
        /// The identifier that was supplied.
        provider: String,
    },

    /// A mandatory configuration field is missing or empty.
    #[error("storage configuration is missing required field '{field}'")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// The backend or transport rejected the operation.
    #[error("storage backend error ({kind}): {message}")]
    Backend {
        /// Client-reported error kind.
        kind: opendal::ErrorKind,
        /// Error message from the client.
        message: String,
    },

    /// The client cannot express the requested operation.
    #[error("operation not supported by storage backend: {0}")]
    Unsupported(String),

    /// Invalid storage key format.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Malformed request parameters (TTL, page size, cursor).
    #[error("invalid storage request: {0}")]
    InvalidRequest(String),
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a backend error that did not originate in the client.
    #[must_use]
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend {
            kind: opendal::ErrorKind::Unexpected,
            message: msg.into(),
        }
    }

    /// Classify a client error raised while operating on `key`.
    ///
    /// Only an explicit not-found signal becomes [`StorageError::NotFound`].
    /// Permission errors are never read as absence.
    #[must_use]
    pub fn from_client(err: opendal::Error, key: &str) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::not_found(key),
            _ => Self::from(err),
        }
    }

    /// Whether this error signals an absent object.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether this error was raised while resolving configuration.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider { .. } | Self::MissingField { .. } | Self::Configuration(_)
        )
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::Unsupported(err.to_string()),
            kind => Self::Backend {
                kind,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_client_not_found_uses_key() {
        let err = opendal::Error::new(opendal::ErrorKind::NotFound, "head returned 404");
        let mapped = StorageError::from_client(err, "avatars/me.png");
        assert!(mapped.is_not_found());
        assert_eq!(mapped.to_string(), "object not found: avatars/me.png");
    }

    #[test]
    fn test_permission_denied_is_not_absence() {
        let err = opendal::Error::new(opendal::ErrorKind::PermissionDenied, "403 Forbidden");
        let mapped = StorageError::from_client(err, "avatars/me.png");
        assert!(!mapped.is_not_found());
        assert!(matches!(
            mapped,
            StorageError::Backend {
                kind: opendal::ErrorKind::PermissionDenied,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_maps_to_unsupported() {
        let err = opendal::Error::new(opendal::ErrorKind::Unsupported, "presign");
        assert!(matches!(
            StorageError::from(err),
            StorageError::Unsupported(_)
        ));
    }

    #[test]
    fn test_other_client_kinds_map_to_backend() {
        for kind in [
            opendal::ErrorKind::Unexpected,
            opendal::ErrorKind::RateLimited,
            opendal::ErrorKind::PermissionDenied,
            opendal::ErrorKind::ConfigInvalid,
        ] {
            let mapped = StorageError::from(opendal::Error::new(kind, "boom"));
            assert!(
                matches!(mapped, StorageError::Backend { kind: k, .. } if k == kind),
                "{kind:?} mapped to {mapped:?}"
            );
        }
    }

    #[test]
    fn test_configuration_classification() {
        assert!(
            StorageError::UnknownProvider {
                provider: "bogus".into()
            }
            .is_configuration()
        );
        assert!(StorageError::MissingField { field: "endpoint" }.is_configuration());
        assert!(StorageError::configuration("bad url").is_configuration());
        assert!(!StorageError::not_found("k").is_configuration());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            StorageError::UnknownProvider {
                provider: "bogus".into()
            }
            .to_string(),
            "unknown storage provider: bogus"
        );
        assert_eq!(
            StorageError::MissingField { field: "bucket" }.to_string(),
            "storage configuration is missing required field 'bucket'"
        );
        assert_eq!(
            StorageError::InvalidKey("empty".into()).to_string(),
            "invalid storage key: empty"
        );
    }
}
