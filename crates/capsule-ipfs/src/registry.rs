//! # Registry Collaborator
//!
//! The registry maps a stable record id to the content id of a capsule's
//! current manifest and decides who may write. It lives outside this crate
//! (typically on chain); [`CapsuleRegistry`] is the seam, and
//! [`InMemoryRegistry`] implements it for tests and local use.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use async_trait::async_trait;
use capsule_core::ContentId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Stable identifier of a capsule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Account (wallet address or user id) acting on the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the registry stores for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub content_id: ContentId,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry record {0} not found")]
    NotFound(RecordId),
    /// The backing store rejected or failed the call.
    #[error("registry backend error: {0}")]
    Backend(String),
}

/// Capability set of the record registry.
#[async_trait]
pub trait CapsuleRegistry: Send + Sync {
    /// Register a new record pointing at `content_id`.
    async fn create_record(&self, content_id: &ContentId) -> Result<RecordId, RegistryError>;

    /// Point an existing record at a new content id.
    async fn update_record(&self, record: RecordId, content_id: &ContentId) -> Result<(), RegistryError>;

    async fn get_record(&self, record: RecordId) -> Result<RegistryRecord, RegistryError>;

    async fn is_admin(&self, account: &AccountId) -> Result<bool, RegistryError>;
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    records: BTreeMap<RecordId, RegistryRecord>,
    admins: BTreeSet<AccountId>,
}

/// Process-local registry. Record ids start at 1.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry where `admins` may write.
    pub fn with_admins(admins: impl IntoIterator<Item = AccountId>) -> Self {
        let registry = Self::new();
        registry.state.lock().admins.extend(admins);
        registry
    }

    pub fn add_admin(&self, account: AccountId) {
        self.state.lock().admins.insert(account);
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CapsuleRegistry for InMemoryRegistry {
    async fn create_record(&self, content_id: &ContentId) -> Result<RecordId, RegistryError> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = RecordId(state.next_id);
        state.records.insert(
            id,
            RegistryRecord {
                content_id: content_id.clone(),
            },
        );
        Ok(id)
    }

    async fn update_record(&self, record: RecordId, content_id: &ContentId) -> Result<(), RegistryError> {
        let mut state = self.state.lock();
        let entry = state.records.get_mut(&record).ok_or(RegistryError::NotFound(record))?;
        entry.content_id = content_id.clone();
        Ok(())
    }

    async fn get_record(&self, record: RecordId) -> Result<RegistryRecord, RegistryError> {
        self.state
            .lock()
            .records
            .get(&record)
            .cloned()
            .ok_or(RegistryError::NotFound(record))
    }

    async fn is_admin(&self, account: &AccountId) -> Result<bool, RegistryError> {
        Ok(self.state.lock().admins.contains(account))
    }
}
