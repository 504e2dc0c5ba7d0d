//! Self-contained embeddable data references.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// A `data:` URL holding base64-encoded content, usable directly as an
/// image or audio source without a separate fetch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct DataUrl(String);

impl DataUrl {
    /// Encode raw bytes under the given MIME type.
    #[must_use]
    pub fn encode(content_type: &str, bytes: &[u8]) -> Self {
        Self(format!(
            "data:{content_type};base64,{}",
            STANDARD.encode(bytes)
        ))
    }

    /// Wrap a reference restored from storage without re-validating it.
    /// Histories written by older clients may hold other URL forms.
    #[must_use]
    pub const fn from_raw(raw: String) -> Self {
        Self(raw)
    }

    /// Borrow the reference string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract the reference string.
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_payload() {
        let url = DataUrl::encode("text/plain", b"hello");
        assert_eq!(url.as_str(), "data:text/plain;base64,aGVsbG8=");
    }

    #[test]
    fn test_encode_empty_payload() {
        let url = DataUrl::encode("audio/webm", b"");
        assert_eq!(url.as_str(), "data:audio/webm;base64,");
    }

    #[test]
    fn test_from_raw_keeps_legacy_values() {
        let url = DataUrl::from_raw("blob:abc123".to_string());
        assert_eq!(url.as_str(), "blob:abc123");
    }
}
