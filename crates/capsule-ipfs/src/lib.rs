//! # capsule-ipfs -- Typed async client for capsule manifests on IPFS
//!
//! Publishes capsules (a title, a description and two groups of files) as
//! content-addressed manifests, fetches them back through public gateways,
//! and appends files by publishing linked successor manifests.
//!
//! ## Architecture
//!
//! - **Providers** ([`pinata`], [`nft_storage`]) upload one payload and return
//!   its content id. They sit behind the [`StorageProvider`] trait.
//! - **Builder** ([`builder`]) runs a full manifest build against one
//!   provider.
//! - **Orchestrators** ([`upload`], [`append`]) try providers in priority
//!   order, restarting from scratch on each switch.
//! - **Fetcher** ([`fetcher`]) walks the gateway candidate list until a
//!   manifest parses.
//! - **Service** ([`service`]) ties the client to a [`CapsuleRegistry`] that
//!   maps record ids to the current content id.
//!
//! All network calls go through the `reqwest::Client` built in
//! [`CapsuleClient::new`].

pub mod append;
pub mod builder;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod nft_storage;
pub mod pinata;
pub mod provider;
pub mod registry;
pub mod service;
pub mod upload;

pub use append::AppendOrchestrator;
pub use config::{ConfigError, IpfsConfig, ProviderStatus};
pub use error::{
    AggregateUploadError, CapsuleError, GatewayMiss, MissReason, NotFoundError, ProviderError, UploadAttemptError,
    UploadStage,
};
pub use fetcher::{FetchObserver, ManifestFetcher, TracingObserver};
pub use provider::{ProviderKind, StorageProvider};
pub use registry::{AccountId, CapsuleRegistry, InMemoryRegistry, RecordId, RegistryError, RegistryRecord};
pub use service::{CapsuleService, ServiceError};
pub use upload::{InputFile, NewCapsule, NewFiles, UploadOrchestrator};

use std::sync::Arc;
use std::time::Duration;

use capsule_core::{ContentId, Manifest};

/// Top-level client. Holds the provider chain and the gateway fetcher.
#[derive(Debug, Clone)]
pub struct CapsuleClient {
    uploader: UploadOrchestrator,
    fetcher: ManifestFetcher,
}

impl CapsuleClient {
    /// Create a client from configuration.
    ///
    /// Only providers with a credential are instantiated. A configuration
    /// without any provider still yields a client that can fetch; uploads
    /// fail with [`ConfigError::NoProviderConfigured`]. A zero timeout is
    /// rejected with [`ConfigError::InvalidTimeout`].
    pub fn new(config: IpfsConfig) -> Result<Self, CapsuleError> {
        if config.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            }
            .into());
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(CapsuleError::ClientInit)?;

        let providers = config
            .configured_providers()
            .into_iter()
            .map(|kind| -> Arc<dyn StorageProvider> {
                match kind {
                    ProviderKind::Pinata => Arc::new(pinata::PinataProvider::new(
                        http.clone(),
                        config.pinata_api_url.clone(),
                        config.pinata_jwt.clone(),
                    )),
                    ProviderKind::NftStorage => Arc::new(nft_storage::NftStorageProvider::new(
                        http.clone(),
                        config.nft_storage_api_url.clone(),
                        config.nft_storage_key.clone(),
                    )),
                }
            })
            .collect();

        Ok(Self {
            uploader: UploadOrchestrator::new(providers),
            fetcher: ManifestFetcher::new(http, config.gateway_urls),
        })
    }

    /// Assemble a client from already-built parts.
    pub fn from_parts(providers: Vec<Arc<dyn StorageProvider>>, fetcher: ManifestFetcher) -> Self {
        Self {
            uploader: UploadOrchestrator::new(providers),
            fetcher,
        }
    }

    pub fn uploader(&self) -> &UploadOrchestrator {
        &self.uploader
    }

    pub fn fetcher(&self) -> &ManifestFetcher {
        &self.fetcher
    }

    /// Publish a new capsule. See [`UploadOrchestrator::upload_manifest`].
    pub async fn upload_manifest(&self, capsule: &NewCapsule) -> Result<ContentId, CapsuleError> {
        self.uploader.upload_manifest(capsule).await
    }

    /// Fetch and normalize a manifest.
    pub async fn fetch_manifest(&self, cid: &ContentId) -> Result<Manifest, CapsuleError> {
        self.fetcher.fetch(cid).await
    }

    /// Append files to the capsule at `previous`. See [`AppendOrchestrator`].
    pub async fn append(&self, previous: &ContentId, files: &NewFiles) -> Result<ContentId, CapsuleError> {
        AppendOrchestrator::new(&self.uploader, &self.fetcher)
            .append(previous, files)
            .await
    }

    /// Walk the `previousCid` chain starting at `head`, newest first.
    ///
    /// Stops at the root manifest or after `limit` versions. Any version that
    /// cannot be fetched fails the whole walk.
    pub async fn history(&self, head: &ContentId, limit: usize) -> Result<Vec<(ContentId, Manifest)>, CapsuleError> {
        let mut versions = Vec::new();
        let mut next = Some(head.clone());
        while let Some(cid) = next {
            if versions.len() >= limit {
                break;
            }
            let manifest = self.fetcher.fetch(&cid).await?;
            next = manifest.previous_cid.clone();
            versions.push((cid, manifest));
        }
        Ok(versions)
    }
}
