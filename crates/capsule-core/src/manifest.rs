//! # Capsule Manifest
//!
//! The manifest is the JSON document that describes a capsule: its title and
//! description, the files in each category, and the content ids that make
//! those files retrievable.
//!
//! ## Schema evolution
//!
//! The schema only ever grows. Category lists may hold bare logical paths,
//! `{path, cid}` records, or older shapes kept as raw JSON. Only records with
//! exactly the `path`, `cid` and `parentCid` keys are read as
//! [`FileReference`]; anything richer stays [`FileEntry::Legacy`] so no key is
//! lost on rewrite. When `fileReferences` is present it is the authoritative
//! path → cid index and bare paths are resolved through it by
//! [`Manifest::normalized`]. Unknown top-level fields survive a
//! read/modify/write cycle.
//!
//! Files of directory-wrapped capsules have no content id of their own; they
//! are addressed as `<directory cid>/<path>`. A successor manifest records the
//! directory as `parentCid` on each such entry (see [`Manifest::anchored`]).
//!
//! Manifests are never mutated once published. An update produces a new
//! manifest whose `previousCid` points back at the one it was derived from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cid::ContentId;
use crate::error::CoreError;
use crate::path::{self, FileCategory};
use crate::reference::{self, ResolvedReference};
use crate::temporal::Timestamp;

/// Link between a logical path and the content id of the file stored there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileReference {
    /// Logical path, e.g. `land-allotment/land-1.pdf`.
    pub path: String,
    /// Content id of the file, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<ContentId>,
    /// Directory the file lives in when it has no content id of its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_cid: Option<ContentId>,
}

impl FileReference {
    /// A reference with a known content id.
    pub fn new(path: impl Into<String>, cid: ContentId) -> Self {
        Self {
            path: path.into(),
            cid: Some(cid),
            parent_cid: None,
        }
    }

    /// A file addressed inside a directory-wrapped capsule.
    pub fn in_directory(path: impl Into<String>, parent: ContentId) -> Self {
        Self {
            path: path.into(),
            cid: None,
            parent_cid: Some(parent),
        }
    }
}

/// Key under which a legacy record carries its directory anchor.
const PARENT_CID_KEY: &str = "parentCid";

/// One entry of a category file list, in any of its historical shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileEntry {
    /// Bare logical path.
    Path(String),
    /// Canonical `{path, cid}` record.
    Reference(FileReference),
    /// Any other shape, kept verbatim.
    Legacy(Value),
}

impl FileEntry {
    /// Resolve this entry into `{path, cid, url}`.
    pub fn resolve(&self) -> ResolvedReference {
        match self {
            Self::Path(p) => reference::resolve(&p.as_str().into()),
            Self::Reference(r) => ResolvedReference {
                path: Some(r.path.clone()),
                cid: r.cid.clone(),
                url: None,
            },
            Self::Legacy(v) => reference::resolve_value(v),
        }
    }

    /// Directory anchor recorded on this entry, if any.
    pub fn parent_cid(&self) -> Option<ContentId> {
        match self {
            Self::Path(_) => None,
            Self::Reference(r) => r.parent_cid.clone(),
            Self::Legacy(v) => v
                .get(PARENT_CID_KEY)
                .and_then(Value::as_str)
                .and_then(|s| ContentId::new(s).ok()),
        }
    }
}

impl From<FileReference> for FileEntry {
    fn from(r: FileReference) -> Self {
        Self::Reference(r)
    }
}

/// A capsule manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub land_allotment_files: Vec<FileEntry>,
    #[serde(default)]
    pub payment_proof_files: Vec<FileEntry>,
    /// Content id of the manifest this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_cid: Option<ContentId>,
    /// Content id of the preliminary manifest uploaded before the files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_cid: Option<ContentId>,
    /// Authoritative path → cid index, when present.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_index"
    )]
    pub file_references: Option<Vec<FileReference>>,
    /// Fields written by other clients, preserved as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// A fresh root manifest with no files.
    pub fn new(title: impl Into<String>, description: Option<String>, now: Timestamp) -> Self {
        let now = now.to_iso8601();
        Self {
            title: title.into(),
            description: Some(description.unwrap_or_default()),
            created_at: now.clone(),
            updated_at: now,
            land_allotment_files: Vec::new(),
            payment_proof_files: Vec::new(),
            previous_cid: None,
            metadata_cid: None,
            file_references: None,
            extra: BTreeMap::new(),
        }
    }

    /// Parse a manifest from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize as pretty-printed JSON, the form uploaded to providers.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// The file list of a category.
    pub fn files(&self, category: FileCategory) -> &[FileEntry] {
        match category {
            FileCategory::LandAllotment => &self.land_allotment_files,
            FileCategory::PaymentProof => &self.payment_proof_files,
        }
    }

    /// Mutable access to the file list of a category.
    pub fn files_mut(&mut self, category: FileCategory) -> &mut Vec<FileEntry> {
        match category {
            FileCategory::LandAllotment => &mut self.land_allotment_files,
            FileCategory::PaymentProof => &mut self.payment_proof_files,
        }
    }

    /// Path → cid index built from `fileReferences`, keyed by normalized
    /// path. The first entry for a path wins.
    pub fn file_index(&self) -> BTreeMap<String, &ContentId> {
        let mut index = BTreeMap::new();
        for r in self.file_references.iter().flatten() {
            if let Some(cid) = &r.cid {
                index.entry(path::normalize(&r.path)).or_insert(cid);
            }
        }
        index
    }

    /// Rewrite both category lists into the canonical `{path, cid}` shape by
    /// resolving every entry through `fileReferences`.
    ///
    /// Manifests without `fileReferences` are returned unchanged. Entries with
    /// no recoverable path are kept as they are.
    pub fn normalized(mut self) -> Self {
        if self.file_references.is_none() {
            return self;
        }
        let index: BTreeMap<String, ContentId> = self
            .file_index()
            .into_iter()
            .map(|(k, v)| (k, v.clone()))
            .collect();
        for category in FileCategory::ALL {
            let entries = std::mem::take(self.files_mut(category));
            *self.files_mut(category) = entries
                .into_iter()
                .map(|entry| canonical_entry(entry, &index))
                .collect();
        }
        self
    }

    /// Resolved references of a category, in list order. Entries with no
    /// recoverable path are skipped.
    pub fn references(&self, category: FileCategory) -> Vec<FileReference> {
        let index = self.file_index();
        self.files(category)
            .iter()
            .filter_map(|entry| {
                let info = entry.resolve();
                let path = info.path?;
                let cid = info
                    .cid
                    .or_else(|| index.get(&path::normalize(&path)).map(|c| (*c).clone()));
                let parent_cid = if cid.is_none() { entry.parent_cid() } else { None };
                Some(FileReference { path, cid, parent_cid })
            })
            .collect()
    }

    /// True if `path` is already used by any category list or the index.
    pub fn contains_path(&self, candidate: &str) -> bool {
        let candidate = path::normalize(candidate);
        let in_lists = FileCategory::ALL.into_iter().any(|c| {
            self.files(c).iter().any(|entry| {
                entry
                    .resolve()
                    .path
                    .is_some_and(|p| path::normalize(&p) == candidate)
            })
        });
        in_lists
            || self
                .file_references
                .iter()
                .flatten()
                .any(|r| path::normalize(&r.path) == candidate)
    }

    /// Public retrieval URL for a file entry.
    ///
    /// URLs embedded in the entry are re-based onto `gateway_base`. A file
    /// whose own content id is known resolves to `<gateway>/<cid>`. Otherwise
    /// the file is looked up inside its directory as
    /// `<gateway>/<parent>/<path>`, where the directory is the entry's own
    /// `parentCid` if it carries one and `parent_cid` otherwise.
    pub fn public_url(
        &self,
        entry: &FileEntry,
        parent_cid: Option<&ContentId>,
        gateway_base: &str,
    ) -> Option<String> {
        let gateway = gateway_base.trim_end_matches('/');
        let info = entry.resolve();

        if let Some(url) = info.url {
            return Some(match url.find("/ipfs/") {
                Some(idx) => format!("{gateway}/{}", &url[idx + "/ipfs/".len()..]),
                None => url,
            });
        }

        let path = info.path.map(|p| path::normalize(&p)).filter(|p| !p.is_empty());
        let own_cid = info.cid.or_else(|| {
            let path = path.as_ref()?;
            self.file_index().get(path).map(|c| (*c).clone())
        });
        if let Some(cid) = own_cid {
            return Some(format!("{gateway}/{cid}"));
        }

        let parent = entry.parent_cid().or_else(|| parent_cid.cloned())?;
        Some(match path {
            Some(p) => format!("{gateway}/{parent}/{p}"),
            None => format!("{gateway}/{parent}"),
        })
    }

    /// Record `directory` as the location of every file that has neither a
    /// content id nor a URL of its own.
    ///
    /// Applied when a successor is derived from a manifest without
    /// `fileReferences`: such a manifest was published inside a directory
    /// whose content id is `directory`, and its bare paths only resolve
    /// relative to it. Entries that already carry an anchor keep it. Legacy
    /// records gain a `parentCid` key and are otherwise left verbatim.
    pub fn anchored(mut self, directory: &ContentId) -> Self {
        for category in FileCategory::ALL {
            for entry in self.files_mut(category).iter_mut() {
                anchor_entry(entry, directory);
            }
        }
        self
    }

    /// Parsed `updatedAt`, if it is a valid timestamp.
    pub fn updated_timestamp(&self) -> Result<Timestamp, CoreError> {
        Timestamp::parse(&self.updated_at)
    }
}

fn canonical_entry(entry: FileEntry, index: &BTreeMap<String, ContentId>) -> FileEntry {
    let lookup = |p: &str| index.get(&path::normalize(p)).cloned();
    match entry {
        FileEntry::Path(p) => {
            let cid = lookup(&p);
            FileEntry::Reference(FileReference {
                path: p,
                cid,
                parent_cid: None,
            })
        }
        FileEntry::Reference(mut r) => {
            if r.cid.is_none() {
                r.cid = lookup(&r.path);
            }
            FileEntry::Reference(r)
        }
        FileEntry::Legacy(v) => {
            let info = reference::resolve_value(&v);
            match info.path {
                // A legacy record with its own cid only needs the index when
                // it is missing one; otherwise it is kept as written.
                Some(p) if info.cid.is_none() && info.url.is_none() => match lookup(&p) {
                    Some(cid) => FileEntry::Reference(FileReference::new(p, cid)),
                    None => FileEntry::Legacy(v),
                },
                _ => FileEntry::Legacy(v),
            }
        }
    }
}

fn anchor_entry(entry: &mut FileEntry, directory: &ContentId) {
    let info = entry.resolve();
    if info.cid.is_some() || info.url.is_some() || entry.parent_cid().is_some() {
        return;
    }
    let Some(path) = info.path else {
        return;
    };
    if matches!(entry, FileEntry::Path(_)) {
        *entry = FileReference::in_directory(path, directory.clone()).into();
        return;
    }
    match entry {
        FileEntry::Reference(r) => r.parent_cid = Some(directory.clone()),
        FileEntry::Legacy(Value::Object(map)) => {
            map.insert(PARENT_CID_KEY.to_string(), Value::String(directory.to_string()));
        }
        FileEntry::Path(_) | FileEntry::Legacy(_) => {}
    }
}

/// Read `fileReferences` without failing the manifest on richer records.
///
/// Records in the canonical shape are taken as they are. Any other record is
/// resolved like a list entry and kept when it yields a path.
fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<Vec<FileReference>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let Some(raw) = Option::<Vec<Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let index = raw
        .into_iter()
        .filter_map(|value| match FileReference::deserialize(&value) {
            Ok(r) => Some(r),
            Err(_) => {
                let info = reference::resolve_value(&value);
                Some(FileReference {
                    path: info.path?,
                    cid: info.cid,
                    parent_cid: None,
                })
            }
        })
        .collect();
    Ok(Some(index))
}
