//! Capsule service: the client plus the record registry.
//!
//! Writes are restricted to registry admins and checked before any upload.
//! A successful create registers the new content id; a successful append
//! moves the record to the successor manifest. If the registry call fails
//! after a successful upload the manifest stays pinned but unreferenced.

use capsule_core::{ContentId, Manifest};
use tracing::{info, warn};

use crate::error::CapsuleError;
use crate::registry::{AccountId, CapsuleRegistry, RecordId, RegistryError};
use crate::upload::{NewCapsule, NewFiles};
use crate::CapsuleClient;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The acting account is not a registry admin.
    #[error("account {0} is not authorized to modify capsules")]
    Unauthorized(AccountId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Capsule(#[from] CapsuleError),
}

/// Creates, extends, and reads registered capsules.
#[derive(Debug)]
pub struct CapsuleService<R> {
    client: CapsuleClient,
    registry: R,
}

impl<R: CapsuleRegistry> CapsuleService<R> {
    pub fn new(client: CapsuleClient, registry: R) -> Self {
        Self { client, registry }
    }

    pub fn client(&self) -> &CapsuleClient {
        &self.client
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Publish a capsule and register it.
    pub async fn create_capsule(
        &self,
        account: &AccountId,
        capsule: &NewCapsule,
    ) -> Result<(RecordId, ContentId), ServiceError> {
        self.authorize(account).await?;
        let cid = self.client.upload_manifest(capsule).await?;
        let record = self.registry.create_record(&cid).await?;
        info!(record = %record, cid = %cid, "capsule registered");
        Ok((record, cid))
    }

    /// Append files to a registered capsule and point the record at the
    /// new manifest.
    pub async fn append_to_capsule(
        &self,
        account: &AccountId,
        record: RecordId,
        files: &NewFiles,
    ) -> Result<ContentId, ServiceError> {
        self.authorize(account).await?;
        let current = self.registry.get_record(record).await?.content_id;
        let cid = self.client.append(&current, files).await?;
        self.registry.update_record(record, &cid).await?;
        info!(record = %record, previous = %current, cid = %cid, "capsule record updated");
        Ok(cid)
    }

    /// Current content id and manifest of a record.
    pub async fn load_capsule(&self, record: RecordId) -> Result<(ContentId, Manifest), ServiceError> {
        let cid = self.registry.get_record(record).await?.content_id;
        let manifest = self.client.fetch_manifest(&cid).await?;
        Ok((cid, manifest))
    }

    /// Versions of a record, newest first, at most `limit` of them.
    pub async fn capsule_history(
        &self,
        record: RecordId,
        limit: usize,
    ) -> Result<Vec<(ContentId, Manifest)>, ServiceError> {
        let head = self.registry.get_record(record).await?.content_id;
        Ok(self.client.history(&head, limit).await?)
    }

    async fn authorize(&self, account: &AccountId) -> Result<(), ServiceError> {
        if self.registry.is_admin(account).await? {
            return Ok(());
        }
        warn!(account = %account, "rejected capsule write from non-admin account");
        Err(ServiceError::Unauthorized(account.clone()))
    }
}
