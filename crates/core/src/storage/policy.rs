//! Upload acceptance rules applied by consumers before calling `upload`.

use thiserror::Error;

/// Reasons an upload is refused by an [`UploadPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// MIME type not allowed.
    #[error("MIME type '{mime_type}' is not allowed")]
    InvalidMimeType {
        /// The invalid MIME type.
        mime_type: String,
    },
}

/// Size and MIME type limits for uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Maximum file size in bytes.
    pub max_size: u64,
    /// Allowed MIME types. Empty means any type.
    pub allowed_content_types: Vec<String>,
}

impl UploadPolicy {
    /// Default max file size: 10MB.
    pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

    /// Accept any content type up to `max_size` bytes.
    #[must_use]
    pub fn new(max_size: u64) -> Self {
        Self {
            max_size,
            allowed_content_types: Vec::new(),
        }
    }

    /// Common web image formats up to `max_size` bytes.
    #[must_use]
    pub fn images(max_size: u64) -> Self {
        Self::new(max_size).with_allowed_content_types([
            "image/png",
            "image/jpeg",
            "image/gif",
            "image/webp",
        ])
    }

    /// Restrict uploads to the given MIME types.
    #[must_use]
    pub fn with_allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Check if a MIME type is allowed. Parameters such as `; charset=` are ignored.
    #[must_use]
    pub fn is_content_type_allowed(&self, content_type: &str) -> bool {
        if self.allowed_content_types.is_empty() {
            return true;
        }
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        self.allowed_content_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }

    /// Validate an upload against the policy.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, size before type.
    pub fn check(&self, content_type: &str, size: u64) -> Result<(), PolicyViolation> {
        if size > self.max_size {
            return Err(PolicyViolation::FileTooLarge {
                size,
                max: self.max_size,
            });
        }

        if !self.is_content_type_allowed(content_type) {
            return Err(PolicyViolation::InvalidMimeType {
                mime_type: content_type.to_string(),
            });
        }

        Ok(())
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_SIZE)
    }
}
