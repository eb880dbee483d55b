//! Typed adapter for the NFT.Storage upload API (secondary provider).
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/upload` | Store one payload, raw body |
//!
//! Responses are wrapped as `{"ok": true, "value": {"cid": ...}}` or
//! `{"ok": false, "error": {"message": ...}}`. A body with `ok: false` is a
//! failure even when the HTTP status is 2xx.

use async_trait::async_trait;
use capsule_core::ContentId;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::ProviderError;
use crate::provider::{ProviderKind, StorageProvider};

const UPLOAD_PATH: &str = "upload";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<UploadValue>,
    #[serde(default)]
    error: Option<UploadFailure>,
}

#[derive(Debug, Deserialize)]
struct UploadValue {
    #[serde(default)]
    cid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadFailure {
    #[serde(default)]
    message: Option<String>,
}

/// NFT.Storage-backed [`StorageProvider`].
#[derive(Debug, Clone)]
pub struct NftStorageProvider {
    http: reqwest::Client,
    api_url: url::Url,
    key: Option<Zeroizing<String>>,
}

impl NftStorageProvider {
    pub fn new(http: reqwest::Client, api_url: url::Url, key: Option<Zeroizing<String>>) -> Self {
        Self { http, api_url, key }
    }

    fn error(&self, status: Option<u16>, message: impl Into<String>) -> ProviderError {
        ProviderError::new(ProviderKind::NftStorage, status, message)
    }

    fn authorization(&self) -> Result<HeaderValue, ProviderError> {
        let key = self
            .key
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.error(None, "API key missing: set NFT_STORAGE_KEY"))?;
        HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| self.error(None, "API key contains characters not allowed in a header"))
    }
}

#[async_trait]
impl StorageProvider for NftStorageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::NftStorage
    }

    async fn upload_single_file(&self, payload: &[u8], name: &str) -> Result<ContentId, ProviderError> {
        let auth = self.authorization()?;
        let url = format!("{}/{UPLOAD_PATH}", self.api_url.as_str().trim_end_matches('/'));

        let mut request = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(payload.to_vec());
        // Names outside the header charset are simply not sent.
        if let Ok(value) = HeaderValue::from_str(name) {
            request = request.header("X-Name", value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| self.error(None, format!("POST {url}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| self.error(Some(status.as_u16()), format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(self.error(Some(status.as_u16()), body));
        }

        let parsed: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            self.error(Some(status.as_u16()), format!("malformed response body ({e}): {body}"))
        })?;

        if !parsed.ok {
            let message = parsed
                .error
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("upload rejected: {body}"));
            return Err(self.error(Some(status.as_u16()), message));
        }

        let cid = parsed
            .value
            .and_then(|v| v.cid)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| self.error(Some(status.as_u16()), format!("response missing value.cid: {body}")))?;

        ContentId::new(cid).map_err(|e| self.error(Some(status.as_u16()), e.to_string()))
    }
}
