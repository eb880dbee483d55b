//! # Descriptor Resolution
//!
//! Manifests written by older clients describe files in several shapes: a bare
//! logical path, a bare content id, a gateway URL, a `{path, cid}` record,
//! records nested inside records, or lists of any of these. [`resolve`] turns
//! any of them into a [`ResolvedReference`].
//!
//! Resolution is total. Unrecognized input yields an empty reference, never
//! an error, so every historical manifest stays readable.
//!
//! ## Precedence
//!
//! - A bare string is a URL if it carries a scheme or a `/ipfs/` segment, a
//!   logical path if it contains a `/`, a content id if it passes
//!   [`looks_like_cid`], and otherwise a logical path.
//! - A list is resolved element by element in order.
//! - A keyed record is searched in the order of [`KEY_PRIORITY`].
//!
//! The first non-empty result decides each field. Later candidates only fill
//! fields that are still missing, so a record like `{path, cid}` yields both.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::cid::{looks_like_cid, ContentId};

/// Keys searched on a keyed descriptor, highest priority first.
pub const KEY_PRIORITY: [&str; 5] = ["url", "path", "filename", "cid", "hash"];

/// Gateway path segment that precedes a content id in retrieval URLs.
const GATEWAY_SEGMENT: &str = "/ipfs/";

/// Native content-addressed URL scheme.
const IPFS_SCHEME: &str = "ipfs://";

/// A file descriptor in any of its historical shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// A bare string.
    Raw(String),
    /// An ordered sequence, earlier entries take priority.
    List(Vec<Descriptor>),
    /// A keyed record.
    Keyed(BTreeMap<String, Descriptor>),
}

impl Descriptor {
    /// Convert a JSON value. Scalars other than strings (and `null`) have no
    /// descriptor form and are dropped, including inside lists and records.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Raw(s.clone())),
            Value::Array(items) => Some(Self::List(items.iter().filter_map(Self::from_value).collect())),
            Value::Object(map) => Some(Self::Keyed(
                map.iter()
                    .filter_map(|(k, v)| Self::from_value(v).map(|d| (k.clone(), d)))
                    .collect(),
            )),
            Value::Null | Value::Bool(_) | Value::Number(_) => None,
        }
    }
}

impl From<&str> for Descriptor {
    fn from(s: &str) -> Self {
        Self::Raw(s.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(s: String) -> Self {
        Self::Raw(s)
    }
}

/// Canonical form of a resolved file descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Logical path within the capsule.
    pub path: Option<String>,
    /// Content id of the file itself.
    pub cid: Option<ContentId>,
    /// Absolute retrieval URL.
    pub url: Option<String>,
}

impl ResolvedReference {
    /// True when no field was recovered.
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.cid.is_none() && self.url.is_none()
    }

    fn is_complete(&self) -> bool {
        self.path.is_some() && self.cid.is_some() && self.url.is_some()
    }

    fn fill_from(&mut self, other: ResolvedReference) {
        if self.path.is_none() {
            self.path = other.path;
        }
        if self.cid.is_none() {
            self.cid = other.cid;
        }
        if self.url.is_none() {
            self.url = other.url;
        }
    }
}

/// Resolve a descriptor into its canonical `{path, cid, url}` form.
pub fn resolve(descriptor: &Descriptor) -> ResolvedReference {
    match descriptor {
        Descriptor::Raw(s) => classify(s),
        Descriptor::List(items) => first_then_fill(items.iter()),
        Descriptor::Keyed(map) => {
            first_then_fill(KEY_PRIORITY.iter().filter_map(|key| map.get(*key)))
        }
    }
}

/// Resolve a raw JSON value. Values with no descriptor form resolve empty.
pub fn resolve_value(value: &Value) -> ResolvedReference {
    Descriptor::from_value(value)
        .map(|d| resolve(&d))
        .unwrap_or_default()
}

/// Extract the content id embedded in a gateway or `ipfs://` URL.
pub fn cid_from_url(url: &str) -> Option<ContentId> {
    let rest = match url.find(GATEWAY_SEGMENT) {
        Some(idx) => &url[idx + GATEWAY_SEGMENT.len()..],
        None => url.strip_prefix(IPFS_SCHEME)?,
    };
    let token = rest.split(['/', '?', '#']).next()?;
    ContentId::new(token).ok()
}

fn first_then_fill<'a>(candidates: impl Iterator<Item = &'a Descriptor>) -> ResolvedReference {
    let mut acc = ResolvedReference::default();
    for candidate in candidates {
        let found = resolve(candidate);
        if found.is_empty() {
            continue;
        }
        acc.fill_from(found);
        if acc.is_complete() {
            break;
        }
    }
    acc
}

fn classify(raw: &str) -> ResolvedReference {
    let s = raw.trim();
    if s.is_empty() {
        return ResolvedReference::default();
    }
    if has_scheme(s) || s.contains(GATEWAY_SEGMENT) {
        return ResolvedReference {
            cid: cid_from_url(s),
            url: Some(s.to_string()),
            path: None,
        };
    }
    if !s.contains('/') && looks_like_cid(s) {
        if let Ok(cid) = ContentId::new(s) {
            return ResolvedReference {
                cid: Some(cid),
                ..Default::default()
            };
        }
    }
    ResolvedReference {
        path: Some(s.to_string()),
        ..Default::default()
    }
}

fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}
