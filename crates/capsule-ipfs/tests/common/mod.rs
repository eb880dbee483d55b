//! Shared fixtures for capsule-ipfs integration tests.
//!
//! `MemoryProvider` pins payloads into a shared [`Store`] under a content id
//! derived from the payload digest, and [`GatewayResponder`] serves that
//! store through a wiremock gateway at `/ipfs/<cid>`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use capsule_core::ContentId;
use capsule_ipfs::{FetchObserver, GatewayMiss, ManifestFetcher, ProviderError, ProviderKind, StorageProvider};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use url::Url;
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Pinned payloads by content id, shared between providers and gateways.
pub type Store = Arc<Mutex<HashMap<String, Vec<u8>>>>;

pub fn new_store() -> Store {
    Arc::new(Mutex::new(HashMap::new()))
}

/// CIDv0-shaped id derived from the payload digest.
pub fn fake_cid(payload: &[u8]) -> ContentId {
    let digest = Sha256::digest(payload);
    let hex: String = digest.iter().take(22).map(|b| format!("{b:02x}")).collect();
    ContentId::new(format!("Qm{hex}")).expect("hex digest is alphanumeric")
}

/// Provider that pins into a [`Store`] and records every upload name.
#[derive(Debug)]
pub struct MemoryProvider {
    kind: ProviderKind,
    store: Store,
    fail_on: Option<String>,
    pub uploads: Mutex<Vec<(String, ContentId)>>,
}

impl MemoryProvider {
    pub fn new(kind: ProviderKind, store: Store) -> Self {
        Self {
            kind,
            store,
            fail_on: None,
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Same, but rejects the upload named `name` with HTTP 500.
    pub fn failing_on(kind: ProviderKind, store: Store, name: &str) -> Self {
        Self {
            fail_on: Some(name.to_string()),
            ..Self::new(kind, store)
        }
    }

    pub fn uploaded_cids(&self) -> Vec<ContentId> {
        self.uploads.lock().iter().map(|(_, cid)| cid.clone()).collect()
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().iter().map(|(name, _)| name.clone()).collect()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn upload_single_file(&self, payload: &[u8], name: &str) -> Result<ContentId, ProviderError> {
        if self.fail_on.as_deref() == Some(name) {
            return Err(ProviderError::new(self.kind, Some(500), format!("rejected {name}")));
        }
        // Namespace the digest by provider so the same bytes get distinct
        // ids on each backend.
        let mut keyed = self.kind.to_string().into_bytes();
        keyed.extend_from_slice(payload);
        let cid = fake_cid(&keyed);
        self.store.lock().insert(cid.to_string(), payload.to_vec());
        self.uploads.lock().push((name.to_string(), cid.clone()));
        Ok(cid)
    }
}

/// Provider that always fails and counts how often it was called.
#[derive(Debug)]
pub struct FailingProvider {
    kind: ProviderKind,
    pub calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProvider for FailingProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn upload_single_file(&self, _payload: &[u8], _name: &str) -> Result<ContentId, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::new(self.kind, Some(503), "service unavailable"))
    }
}

/// Serves pinned payloads at `/ipfs/<cid>`; anything else is a 404.
pub struct GatewayResponder {
    store: Store,
}

impl Respond for GatewayResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let cid = request.url.path().trim_start_matches("/ipfs/");
        match self.store.lock().get(cid) {
            Some(bytes) => ResponseTemplate::new(200).set_body_bytes(bytes.clone()),
            None => ResponseTemplate::new(404),
        }
    }
}

/// Start a gateway backed by `store`.
pub async fn start_gateway(store: &Store) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipfs/"))
        .respond_with(GatewayResponder { store: Arc::clone(store) })
        .mount(&server)
        .await;
    server
}

/// Gateway base for a mock server.
pub fn gateway_base(server: &MockServer) -> Url {
    Url::parse(&format!("{}/ipfs", server.uri())).expect("mock server uri")
}

pub fn fetcher_for(servers: &[&MockServer]) -> ManifestFetcher {
    ManifestFetcher::new(reqwest::Client::new(), servers.iter().map(|s| gateway_base(s)).collect())
}

/// Observer that records every candidate outcome.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub misses: Mutex<Vec<GatewayMiss>>,
    pub hits: Mutex<Vec<String>>,
}

impl FetchObserver for RecordingObserver {
    fn on_miss(&self, _cid: &ContentId, miss: &GatewayMiss) {
        self.misses.lock().push(miss.clone());
    }

    fn on_hit(&self, _cid: &ContentId, url: &str) {
        self.hits.lock().push(url.to_string());
    }
}
