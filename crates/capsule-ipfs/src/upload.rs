//! Upload orchestration with provider fallback.
//!
//! Providers are tried strictly one after another in priority order. Each
//! attempt runs a complete build; when it fails the next provider starts
//! from scratch, since content ids pinned by one provider are not assumed to
//! be reachable through another provider's gateway. If every provider fails
//! the caller receives one labelled cause per attempt.

use std::future::Future;
use std::sync::Arc;

use capsule_core::path::assigned_path;
use capsule_core::{ContentId, FileCategory, FileEntry, Manifest, Timestamp};
use tracing::{info, warn};

use crate::builder::{ManifestBuilder, PendingFile};
use crate::config::ConfigError;
use crate::error::{AggregateUploadError, CapsuleError, UploadAttemptError};
use crate::provider::StorageProvider;

/// A file supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Original file name; only its extension or final segment is kept.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Files to add, grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewFiles {
    pub land_allotment_files: Vec<InputFile>,
    pub payment_proof_files: Vec<InputFile>,
}

impl NewFiles {
    pub fn by_category(&self, category: FileCategory) -> &[InputFile] {
        match category {
            FileCategory::LandAllotment => &self.land_allotment_files,
            FileCategory::PaymentProof => &self.payment_proof_files,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.land_allotment_files.is_empty() && self.payment_proof_files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.land_allotment_files.len() + self.payment_proof_files.len()
    }
}

/// A capsule to publish for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCapsule {
    pub title: String,
    pub description: Option<String>,
    pub files: NewFiles,
}

impl NewCapsule {
    /// Assign logical paths and build the preliminary manifest.
    ///
    /// Paths are positional per category (`land-allotment/land-1.pdf`, ...).
    /// Land allotment files come first in upload order.
    pub fn prepare(&self, now: Timestamp) -> (Vec<(String, &[u8])>, Manifest) {
        let mut manifest = Manifest::new(self.title.clone(), self.description.clone(), now);
        let mut files = Vec::with_capacity(self.files.len());
        for category in FileCategory::ALL {
            for (i, input) in self.files.by_category(category).iter().enumerate() {
                let path = assigned_path(category, i, &input.name);
                manifest.files_mut(category).push(FileEntry::Path(path.clone()));
                files.push((path, input.bytes.as_slice()));
            }
        }
        (files, manifest)
    }
}

/// Runs uploads against the configured providers, primary first.
#[derive(Debug, Clone, Default)]
pub struct UploadOrchestrator {
    providers: Vec<Arc<dyn StorageProvider>>,
}

impl UploadOrchestrator {
    pub fn new(providers: Vec<Arc<dyn StorageProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn StorageProvider>] {
        &self.providers
    }

    /// Publish a new capsule and return the content id of its manifest.
    pub async fn upload_manifest(&self, capsule: &NewCapsule) -> Result<ContentId, CapsuleError> {
        self.ensure_providers()?;
        if capsule.files.is_empty() {
            return Err(CapsuleError::InvalidInput(
                "a capsule needs at least one land allotment or payment proof file".into(),
            ));
        }

        let (owned, preliminary) = capsule.prepare(Timestamp::now());
        let files: Vec<PendingFile<'_>> = owned
            .iter()
            .map(|(path, bytes)| PendingFile { path, bytes })
            .collect();
        let files = files.as_slice();
        let preliminary = &preliminary;

        let cid = self
            .with_fallback("create", |provider| async move {
                ManifestBuilder::new(provider.as_ref()).build(files, preliminary).await
            })
            .await?;
        info!(cid = %cid, files = files.len(), "capsule manifest published");
        Ok(cid)
    }

    pub(crate) fn ensure_providers(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviderConfigured);
        }
        Ok(())
    }

    /// Run `attempt` against each provider in turn until one succeeds.
    pub(crate) async fn with_fallback<T, F, Fut>(&self, operation: &str, attempt: F) -> Result<T, CapsuleError>
    where
        F: Fn(Arc<dyn StorageProvider>) -> Fut,
        Fut: Future<Output = Result<T, UploadAttemptError>>,
    {
        self.ensure_providers()?;

        let mut attempts = Vec::new();
        for provider in &self.providers {
            let kind = provider.kind();
            info!(provider = %kind, operation, "starting upload attempt");
            match attempt(Arc::clone(provider)).await {
                Ok(value) => {
                    info!(provider = %kind, operation, "upload attempt succeeded");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(provider = %kind, operation, stage = %e.stage, error = %e.source, "upload attempt failed");
                    attempts.push(e);
                }
            }
        }

        Err(AggregateUploadError { attempts }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> Timestamp {
        Timestamp::parse("2026-01-15T12:00:00Z").unwrap()
    }

    #[test]
    fn prepare_assigns_positional_paths_and_bare_entries() {
        let capsule = NewCapsule {
            title: "Plot 7".into(),
            description: None,
            files: NewFiles {
                land_allotment_files: vec![InputFile::new("deed.pdf", b"d".to_vec()), InputFile::new("map.png", b"m".to_vec())],
                payment_proof_files: vec![InputFile::new("receipt", b"r".to_vec())],
            },
        };
        let (files, manifest) = capsule.prepare(ts());

        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec!["land-allotment/land-1.pdf", "land-allotment/land-2.png", "payment-proof/payment-1.receipt"]
        );
        assert_eq!(files[1].1, b"m");
        assert_eq!(manifest.land_allotment_files[0], FileEntry::Path("land-allotment/land-1.pdf".into()));
        assert_eq!(manifest.description.as_deref(), Some(""));
        assert_eq!(manifest.created_at, manifest.updated_at);
        assert!(manifest.file_references.is_none());
        assert!(manifest.previous_cid.is_none());
    }

    #[tokio::test]
    async fn no_providers_is_a_config_error() {
        let orchestrator = UploadOrchestrator::default();
        let capsule = NewCapsule {
            title: "t".into(),
            files: NewFiles {
                land_allotment_files: vec![InputFile::new("a.pdf", b"a".to_vec())],
                ..Default::default()
            },
            ..Default::default()
        };
        let err = orchestrator.upload_manifest(&capsule).await.unwrap_err();
        assert!(matches!(err, CapsuleError::Config(ConfigError::NoProviderConfigured)));
    }
}
