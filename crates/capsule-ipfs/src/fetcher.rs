//! Manifest retrieval across gateways.
//!
//! For every configured gateway base two URL shapes are tried, in order:
//! the content id itself (manifests uploaded as a single file) and
//! `<cid>/metadata.json` (manifests wrapped in a directory). Candidates are
//! tried strictly in sequence. A transport failure, non-success status, or
//! unparseable body is a miss and the next candidate is tried. Only when
//! every candidate has missed is [`NotFoundError`] returned.
//!
//! Misses and hits are reported to an injected [`FetchObserver`]. The default
//! observer emits `tracing` events.

use std::sync::Arc;

use capsule_core::{ContentId, Manifest};
use tracing::{debug, warn};
use url::Url;

use crate::config::ConfigError;
use crate::error::{CapsuleError, GatewayMiss, MissReason, NotFoundError};

/// Entry name of the manifest inside a directory-wrapped capsule.
pub const DIRECTORY_MANIFEST_NAME: &str = "metadata.json";

/// Receives the outcome of every gateway candidate.
pub trait FetchObserver: Send + Sync + std::fmt::Debug {
    /// A candidate did not produce a manifest.
    fn on_miss(&self, cid: &ContentId, miss: &GatewayMiss);
    /// A candidate produced a manifest; no further candidates are tried.
    fn on_hit(&self, cid: &ContentId, url: &str);
}

/// Observer that logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_miss(&self, cid: &ContentId, miss: &GatewayMiss) {
        warn!(cid = %cid, url = %miss.url, reason = %miss.reason, "gateway candidate missed");
    }

    fn on_hit(&self, cid: &ContentId, url: &str) {
        debug!(cid = %cid, url = %url, "manifest fetched");
    }
}

/// Fetches manifests from an ordered list of gateways.
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    http: reqwest::Client,
    gateways: Vec<Url>,
    observer: Arc<dyn FetchObserver>,
}

impl ManifestFetcher {
    pub fn new(http: reqwest::Client, gateways: Vec<Url>) -> Self {
        Self {
            http,
            gateways,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Replace the observer that receives candidate outcomes.
    pub fn with_observer(mut self, observer: Arc<dyn FetchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Candidate URLs for `cid`, in the order they are tried.
    pub fn candidates(&self, cid: &ContentId) -> Vec<String> {
        self.gateways
            .iter()
            .flat_map(|gateway| {
                let base = gateway.as_str().trim_end_matches('/');
                [
                    format!("{base}/{cid}"),
                    format!("{base}/{cid}/{DIRECTORY_MANIFEST_NAME}"),
                ]
            })
            .collect()
    }

    /// Fetch a manifest and normalize its file lists through
    /// `fileReferences`.
    pub async fn fetch(&self, cid: &ContentId) -> Result<Manifest, CapsuleError> {
        self.fetch_raw(cid).await.map(Manifest::normalized)
    }

    /// Fetch a manifest exactly as stored.
    pub async fn fetch_raw(&self, cid: &ContentId) -> Result<Manifest, CapsuleError> {
        if self.gateways.is_empty() {
            return Err(ConfigError::NoGatewayConfigured.into());
        }

        let mut misses = Vec::new();
        for url in self.candidates(cid) {
            match self.try_candidate(&url).await {
                Ok(manifest) => {
                    self.observer.on_hit(cid, &url);
                    return Ok(manifest);
                }
                Err(reason) => {
                    let miss = GatewayMiss { url, reason };
                    self.observer.on_miss(cid, &miss);
                    misses.push(miss);
                }
            }
        }

        Err(NotFoundError {
            cid: cid.clone(),
            misses,
        }
        .into())
    }

    async fn try_candidate(&self, url: &str) -> Result<Manifest, MissReason> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MissReason::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MissReason::Status(resp.status().as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| MissReason::Transport(e.to_string()))?;

        Manifest::from_json_slice(&body).map_err(|e| MissReason::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_cover_both_shapes_per_gateway_in_order() {
        let fetcher = ManifestFetcher::new(
            reqwest::Client::new(),
            vec![
                Url::parse("https://gw-a.example/ipfs/").unwrap(),
                Url::parse("https://gw-b.example/ipfs").unwrap(),
            ],
        );
        let cid = ContentId::new("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").unwrap();
        assert_eq!(
            fetcher.candidates(&cid),
            vec![
                format!("https://gw-a.example/ipfs/{cid}"),
                format!("https://gw-a.example/ipfs/{cid}/metadata.json"),
                format!("https://gw-b.example/ipfs/{cid}"),
                format!("https://gw-b.example/ipfs/{cid}/metadata.json"),
            ]
        );
    }
}
