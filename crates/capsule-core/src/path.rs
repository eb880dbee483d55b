//! # Logical Paths
//!
//! Every file in a capsule is addressed by a logical path of the form
//! `<category-folder>/<file name>`. This module canonicalizes such paths,
//! assigns them to new uploads, and strips the category folder for display.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Extension used when an input file name has none.
const DEFAULT_EXTENSION: &str = "file";

/// The fixed file groups of a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileCategory {
    /// Land allotment documents.
    LandAllotment,
    /// Payment proof documents.
    PaymentProof,
}

impl FileCategory {
    /// All categories, in manifest order.
    pub const ALL: [FileCategory; 2] = [FileCategory::LandAllotment, FileCategory::PaymentProof];

    /// Folder prefix used in logical paths.
    pub fn folder(self) -> &'static str {
        match self {
            Self::LandAllotment => "land-allotment",
            Self::PaymentProof => "payment-proof",
        }
    }

    /// Stem used for positionally assigned file names.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::LandAllotment => "land",
            Self::PaymentProof => "payment",
        }
    }

    /// The category whose folder prefixes `path`, if any.
    pub fn of_path(path: &str) -> Option<Self> {
        let path = normalize(path);
        Self::ALL
            .into_iter()
            .find(|c| path.strip_prefix(c.folder()).is_some_and(|rest| rest.starts_with('/')))
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder())
    }
}

/// Canonicalize a logical path.
///
/// Trims whitespace, converts backslashes, strips leading slashes and
/// collapses repeated separators. May return an empty string.
pub fn normalize(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Like [`normalize`], but rejects paths that are empty afterwards.
pub fn normalize_checked(path: &str) -> Result<String, CoreError> {
    let normalized = normalize(path);
    if normalized.is_empty() {
        return Err(CoreError::InvalidPath(path.to_string()));
    }
    Ok(normalized)
}

/// Strip one leading category folder, for display.
pub fn display_name(path: &str) -> String {
    let path = normalize(path);
    for category in FileCategory::ALL {
        if let Some(rest) = path
            .strip_prefix(category.folder())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return rest.to_string();
        }
    }
    path
}

/// Last segment of a logical path.
pub fn file_name(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

/// Extension of a file name, without the dot.
pub fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// Path assigned to the `index`-th (zero-based) file of a category when a
/// capsule is first built, e.g. `land-allotment/land-1.pdf`.
///
/// The suffix is whatever follows the last dot of the file name, or the whole
/// name when it has no dot, so `receipt` becomes `payment-1.receipt`. Only an
/// empty suffix falls back to `file`.
pub fn assigned_path(category: FileCategory, index: usize, original_name: &str) -> String {
    let normalized = normalize(original_name);
    let name = file_name(&normalized).unwrap_or_default();
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => name,
    };
    let ext = if ext.is_empty() { DEFAULT_EXTENSION } else { ext };
    format!("{}/{}-{}.{}", category.folder(), category.file_stem(), index + 1, ext)
}

/// Path for a file appended to an existing capsule.
///
/// The original file name is kept under the category folder. When `taken`
/// reports a collision, a numeric suffix is inserted before the extension
/// until the path is free.
pub fn appended_path(
    category: FileCategory,
    original_name: &str,
    taken: impl Fn(&str) -> bool,
) -> Result<String, CoreError> {
    let normalized = normalize_checked(original_name)?;
    let name = file_name(&normalized).unwrap_or(&normalized).to_string();
    let candidate = format!("{}/{}", category.folder(), name);
    if !taken(&candidate) {
        return Ok(candidate);
    }

    let (stem, ext) = match extension(&name) {
        Some(ext) => (&name[..name.len() - ext.len() - 1], Some(ext)),
        None => (name.as_str(), None),
    };
    let mut n = 2usize;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{}/{stem}-{n}.{ext}", category.folder()),
            None => format!("{}/{stem}-{n}", category.folder()),
        };
        if !taken(&candidate) {
            return Ok(candidate);
        }
        n += 1;
    }
}
