//! Appending files to a published capsule.
//!
//! The prior manifest is fetched, the new files are uploaded one by one under
//! their category folders, and a new manifest is published with the new
//! references concatenated onto every list and a `previousCid` back-link.
//! Nothing in the prior manifest is removed or rewritten, and the prior
//! content id stays retrievable on its own.
//!
//! There is no protection against two concurrent appends from the same
//! prior version; both succeed and the history forks.

use capsule_core::path::appended_path;
use capsule_core::{ContentId, CoreError, FileCategory, FileEntry, FileReference, Manifest, Timestamp};
use tracing::info;

use crate::builder::{ManifestBuilder, PendingFile, PRELIMINARY_MANIFEST_NAME};
use crate::error::{CapsuleError, UploadStage};
use crate::fetcher::ManifestFetcher;
use crate::upload::{NewFiles, UploadOrchestrator};

/// A new file with its assigned logical path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile<'a> {
    pub category: FileCategory,
    pub path: String,
    pub bytes: &'a [u8],
}

/// Assign a unique logical path to every new file.
///
/// Paths are `<folder>/<file name>`, suffixed on collision with the prior
/// manifest or with files earlier in the same batch.
pub fn plan_append<'a>(prior: &Manifest, files: &'a NewFiles) -> Result<Vec<PlannedFile<'a>>, CoreError> {
    let mut planned: Vec<PlannedFile<'a>> = Vec::with_capacity(files.len());
    for category in FileCategory::ALL {
        for input in files.by_category(category) {
            let path = appended_path(category, &input.name, |candidate| {
                prior.contains_path(candidate) || planned.iter().any(|p| p.path == candidate)
            })?;
            planned.push(PlannedFile {
                category,
                path,
                bytes: &input.bytes,
            });
        }
    }
    Ok(planned)
}

/// Build the successor of `prior` from freshly uploaded references.
///
/// `uploaded` pairs each reference with its category, in upload order. A
/// prior manifest without `fileReferences` was published inside a directory,
/// so its cid-less entries are anchored to `prior_cid` before the new index
/// is started.
pub fn merge_manifest(
    prior: &Manifest,
    prior_cid: &ContentId,
    uploaded: Vec<(FileCategory, FileReference)>,
    now: Timestamp,
) -> Manifest {
    let mut next = prior.clone();
    if next.file_references.is_none() {
        next = next.anchored(prior_cid);
    }
    let mut index = next.file_references.take().unwrap_or_default();
    for (category, reference) in uploaded {
        next.files_mut(category).push(FileEntry::Reference(reference.clone()));
        index.push(reference);
    }
    next.file_references = Some(index);
    next.updated_at = now.to_iso8601();
    next.previous_cid = Some(prior_cid.clone());
    next
}

/// Fetch, upload, merge, publish.
#[derive(Debug, Clone, Copy)]
pub struct AppendOrchestrator<'c> {
    uploader: &'c UploadOrchestrator,
    fetcher: &'c ManifestFetcher,
}

impl<'c> AppendOrchestrator<'c> {
    pub fn new(uploader: &'c UploadOrchestrator, fetcher: &'c ManifestFetcher) -> Self {
        Self { uploader, fetcher }
    }

    /// Append `files` to the capsule published at `previous` and return the
    /// content id of the new manifest.
    pub async fn append(&self, previous: &ContentId, files: &NewFiles) -> Result<ContentId, CapsuleError> {
        self.uploader.ensure_providers()?;
        if files.is_empty() {
            return Err(CapsuleError::InvalidInput("no files to append".into()));
        }

        let prior = self.fetcher.fetch(previous).await?;
        let planned = plan_append(&prior, files)?;
        let pending: Vec<PendingFile<'_>> = planned
            .iter()
            .map(|p| PendingFile {
                path: &p.path,
                bytes: p.bytes,
            })
            .collect();
        let (prior, planned, pending) = (&prior, planned.as_slice(), pending.as_slice());

        let cid = self
            .uploader
            .with_fallback("append", |provider| async move {
                let builder = ManifestBuilder::new(provider.as_ref());
                let references = builder.upload_files(pending).await?;
                let uploaded = planned
                    .iter()
                    .map(|p| p.category)
                    .zip(references)
                    .collect();
                let next = merge_manifest(prior, previous, uploaded, Timestamp::now());
                builder
                    .upload_manifest(&next, PRELIMINARY_MANIFEST_NAME, UploadStage::FinalMetadata)
                    .await
            })
            .await?;

        info!(previous = %previous, cid = %cid, files = files.len(), "capsule manifest appended");
        Ok(cid)
    }
}
