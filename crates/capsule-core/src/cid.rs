//! # Content Identifiers
//!
//! A content id is the opaque address a storage provider returns for an
//! uploaded payload. The stack never interprets its internal structure; it
//! only requires a non-empty token that can be embedded in a gateway URL.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Minimum length for a `Qm`-prefixed token to be treated as a CIDv0.
const CID_V0_MIN_LEN: usize = 21;

/// Any token at least this long is treated as a content id (covers CIDv0 at
/// 46 characters and base32 CIDv1 at 59).
const CID_MIN_LEN: usize = 46;

/// Opaque address of uploaded content.
///
/// Construction accepts only ASCII alphanumeric tokens, so a content id can be
/// placed in a URL path segment without escaping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(String);

impl ContentId {
    /// Validate and wrap a content id. Surrounding whitespace is trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidContentId {
                value: raw,
                reason: "empty",
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidContentId {
                value: raw,
                reason: "must be ASCII alphanumeric",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the underlying token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContentId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ContentId> for String {
    fn from(cid: ContentId) -> Self {
        cid.0
    }
}

impl AsRef<str> for ContentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Heuristic used when classifying a bare descriptor string.
///
/// A `Qm` prefix with enough length, or any token of full CID length, counts.
/// Tokens containing path separators or whitespace never do.
pub fn looks_like_cid(s: &str) -> bool {
    if s.is_empty() || s.contains('/') || s.chars().any(char::is_whitespace) {
        return false;
    }
    (s.starts_with("Qm") && s.len() >= CID_V0_MIN_LEN) || s.len() >= CID_MIN_LEN
}
