//! Manifest build against a single provider.
//!
//! 1. Upload the preliminary manifest (bare paths, no file cids).
//! 2. Upload each file, one at a time and in input order, collecting
//!    `{path, cid}`. The first failing file aborts the build and is named in
//!    the error.
//! 3. Upload the final manifest: the preliminary fields plus `metadataCid`
//!    and `fileReferences`.
//!
//! Content ids produced here are only assumed reachable through the same
//! provider, so a failed build is never resumed elsewhere.

use capsule_core::{ContentId, FileReference, Manifest};
use tracing::debug;

use crate::error::{ProviderError, UploadAttemptError, UploadStage};
use crate::provider::StorageProvider;

/// Name under which the preliminary manifest is uploaded.
pub const PRELIMINARY_MANIFEST_NAME: &str = "metadata.json";
/// Name under which the final manifest is uploaded.
pub const FINAL_MANIFEST_NAME: &str = "final-metadata.json";

/// A file waiting to be uploaded under its logical path.
#[derive(Debug, Clone, Copy)]
pub struct PendingFile<'a> {
    pub path: &'a str,
    pub bytes: &'a [u8],
}

/// Runs manifest builds against one provider.
#[derive(Debug, Clone, Copy)]
pub struct ManifestBuilder<'p> {
    provider: &'p dyn StorageProvider,
}

impl<'p> ManifestBuilder<'p> {
    pub fn new(provider: &'p dyn StorageProvider) -> Self {
        Self { provider }
    }

    /// Run the full build and return the content id of the final manifest.
    pub async fn build(
        &self,
        files: &[PendingFile<'_>],
        preliminary: &Manifest,
    ) -> Result<ContentId, UploadAttemptError> {
        let metadata_cid = self
            .upload_manifest(preliminary, PRELIMINARY_MANIFEST_NAME, UploadStage::PreliminaryMetadata)
            .await?;

        let references = self.upload_files(files).await?;

        let mut final_manifest = preliminary.clone();
        final_manifest.metadata_cid = Some(metadata_cid);
        final_manifest.file_references = Some(references);

        self.upload_manifest(&final_manifest, FINAL_MANIFEST_NAME, UploadStage::FinalMetadata)
            .await
    }

    /// Upload files sequentially, stopping at the first failure.
    pub async fn upload_files(
        &self,
        files: &[PendingFile<'_>],
    ) -> Result<Vec<FileReference>, UploadAttemptError> {
        let mut references = Vec::with_capacity(files.len());
        for (i, file) in files.iter().enumerate() {
            debug!(
                provider = %self.provider.kind(),
                path = %file.path,
                "uploading file {}/{}",
                i + 1,
                files.len()
            );
            let cid = self
                .provider
                .upload_single_file(file.bytes, file.path)
                .await
                .map_err(|source| self.attempt_error(UploadStage::File { path: file.path.to_string() }, source))?;
            references.push(FileReference::new(file.path, cid));
        }
        Ok(references)
    }

    /// Serialize and upload a manifest document.
    pub async fn upload_manifest(
        &self,
        manifest: &Manifest,
        name: &str,
        stage: UploadStage,
    ) -> Result<ContentId, UploadAttemptError> {
        let bytes = manifest.to_json_bytes().map_err(|e| {
            let source = ProviderError::new(self.provider.kind(), None, format!("manifest serialization failed: {e}"));
            self.attempt_error(stage.clone(), source)
        })?;
        self.provider
            .upload_single_file(&bytes, name)
            .await
            .map_err(|source| self.attempt_error(stage, source))
    }

    fn attempt_error(&self, stage: UploadStage, source: ProviderError) -> UploadAttemptError {
        UploadAttemptError {
            provider: self.provider.kind(),
            stage,
            source,
        }
    }
}
