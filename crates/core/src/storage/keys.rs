//! Object key validation and key/URL helpers.

use url::Url;
use uuid::Uuid;

use super::error::StorageError;

/// Maximum key length accepted by S3-compatible backends, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

/// Validate an object key before it is sent to the backend.
///
/// Keys must be non-empty and at most [`MAX_KEY_LEN`] bytes. They must not
/// start or end with `/` or whitespace, and must not contain empty, `.` or
/// `..` segments. The client normalises such keys into a different object or
/// a directory, so two distinct keys would share one object.
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] describing the first violation.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidKey(format!(
            "key is {} bytes, maximum is {MAX_KEY_LEN}",
            key.len()
        )));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key must not start with '/': {key}"
        )));
    }
    if key.ends_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "key must not end with '/': {key}"
        )));
    }
    if key.trim() != key {
        return Err(StorageError::InvalidKey(format!(
            "key must not start or end with whitespace: {key:?}"
        )));
    }
    if key.split('/').any(str::is_empty) {
        return Err(StorageError::InvalidKey(format!(
            "key must not contain empty segments: {key}"
        )));
    }
    if key.split('/').any(|seg| seg == "." || seg == "..") {
        return Err(StorageError::InvalidKey(format!(
            "key must not contain '.' or '..' segments: {key}"
        )));
    }
    Ok(())
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
/// A name made only of dots is replaced so it cannot form a `.`/`..` segment.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "file".to_string()
    } else {
        sanitized
    }
}

/// Build a collision-free key: `{prefix}/{id}/{sanitized_filename}`.
///
/// Empty prefixes are skipped; surrounding slashes on the prefix are trimmed.
#[must_use]
pub fn object_key(prefix: &str, id: Uuid, filename: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let filename = sanitize_filename(filename);
    if prefix.is_empty() {
        format!("{id}/{filename}")
    } else {
        format!("{prefix}/{id}/{filename}")
    }
}

/// Append a key to a base URL, percent-encoding each key segment.
pub(crate) fn join_url(base: &str, key: &str) -> String {
    match Url::parse(base) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().extend(key.split('/'));
            }
            url.to_string()
        }
        _ => format!("{}/{key}", base.trim_end_matches('/')),
    }
}

/// Encode the last key of a page as an opaque continuation cursor.
pub(crate) fn encode_cursor(last_key: &str) -> String {
    base64_url::encode(last_key)
}

/// Decode a continuation cursor back into the key to resume after.
pub(crate) fn decode_cursor(cursor: &str) -> Result<String, StorageError> {
    let raw = base64_url::decode(cursor)
        .map_err(|_| StorageError::invalid_request("malformed continuation cursor"))?;
    let key = String::from_utf8(raw)
        .map_err(|_| StorageError::invalid_request("malformed continuation cursor"))?;
    if key.is_empty() {
        return Err(StorageError::invalid_request("empty continuation cursor"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("avatars/me.png")]
    #[case("a")]
    #[case("reports/2024/q1 summary.pdf")]
    #[case("dots.in.name/x..y")]
    #[case("a/ b /c")]
    fn test_validate_key_accepts(#[case] key: &str) {
        assert!(validate_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("/leading")]
    #[case("trailing/")]
    #[case("a/../b")]
    #[case("./a")]
    #[case("a//b")]
    #[case(" a.txt")]
    #[case("a.txt\n")]
    #[case("\t")]
    fn test_validate_key_rejects(#[case] key: &str) {
        assert!(matches!(
            validate_key(key),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_validate_key_length_limit() {
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN)).is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_LEN + 1)).is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("invoice.pdf"), "invoice.pdf");
        assert_eq!(sanitize_filename("my file (1).pdf"), "my_file__1_.pdf");
        assert_eq!(sanitize_filename("test@#$%.doc"), "test____.doc");
        assert_eq!(sanitize_filename("日本語.pdf"), "___.pdf");
        assert_eq!(sanitize_filename(".."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_object_key_layout() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").expect("valid uuid");
        assert_eq!(
            object_key("/avatars/", id, "me.png"),
            "avatars/550e8400-e29b-41d4-a716-446655440000/me.png"
        );
        assert_eq!(
            object_key("", id, "me.png"),
            "550e8400-e29b-41d4-a716-446655440000/me.png"
        );
    }

    #[rstest]
    #[case("https://cdn.example.com", "a/b.png", "https://cdn.example.com/a/b.png")]
    #[case("https://cdn.example.com/", "a/b.png", "https://cdn.example.com/a/b.png")]
    #[case(
        "https://cdn.example.com/assets",
        "a/b.png",
        "https://cdn.example.com/assets/a/b.png"
    )]
    #[case(
        "https://cdn.example.com",
        "docs/q1 summary.pdf",
        "https://cdn.example.com/docs/q1%20summary.pdf"
    )]
    #[case("https://cdn.example.com", "x?y#z", "https://cdn.example.com/x%3Fy%23z")]
    fn test_join_url(#[case] base: &str, #[case] key: &str, #[case] expected: &str) {
        assert_eq!(join_url(base, key), expected);
    }

    #[test]
    fn test_cursor_is_opaque_and_reversible() {
        let cursor = encode_cursor("a/2");
        assert_ne!(cursor, "a/2");
        assert_eq!(decode_cursor(&cursor).expect("valid cursor"), "a/2");
    }

    #[test]
    fn test_malformed_cursor_rejected() {
        assert!(matches!(
            decode_cursor("!!not base64!!"),
            Err(StorageError::InvalidRequest(_))
        ));
        assert!(matches!(
            decode_cursor(""),
            Err(StorageError::InvalidRequest(_))
        ));
    }
}
