//! # Storage Provider Interface
//!
//! A storage provider accepts a single payload and answers with the content
//! id under which it is pinned. Implementations make exactly one network call
//! per upload, keep no state between calls, and never retry internally:
//! fallback between providers is the orchestrator's job.

use std::fmt;

use async_trait::async_trait;
use capsule_core::ContentId;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// The pinning services this crate can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Pinata pinning API. Primary provider.
    Pinata,
    /// NFT.Storage upload API. Secondary provider.
    NftStorage,
}

impl ProviderKind {
    /// All providers in priority order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Pinata, ProviderKind::NftStorage];

    /// Environment variable holding this provider's credential.
    pub fn credential_var(self) -> &'static str {
        match self {
            Self::Pinata => "PINATA_JWT",
            Self::NftStorage => "NFT_STORAGE_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pinata => write!(f, "Pinata"),
            Self::NftStorage => write!(f, "NFT.Storage"),
        }
    }
}

/// Uploads single payloads to one storage backend.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc` and selected at runtime.
#[async_trait]
pub trait StorageProvider: Send + Sync + fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> ProviderKind;

    /// Upload one payload under `name` and return its content id.
    async fn upload_single_file(&self, payload: &[u8], name: &str) -> Result<ContentId, ProviderError>;
}
