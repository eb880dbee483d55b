//! Typed adapter for the Pinata pinning API (primary provider).
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/pinning/pinFileToIPFS` | Pin one file, multipart form |
//!
//! The form carries the payload as `file`, plus `pinataMetadata`
//! (`{"name": ...}`) and `pinataOptions` (`{"cidVersion": 0}`). The content id
//! comes back in the `IpfsHash` field.

use async_trait::async_trait;
use capsule_core::ContentId;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::error::ProviderError;
use crate::provider::{ProviderKind, StorageProvider};

const PIN_FILE_PATH: &str = "pinning/pinFileToIPFS";

/// Response body of `pinFileToIPFS`. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct PinFileResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Pinata-backed [`StorageProvider`].
#[derive(Debug, Clone)]
pub struct PinataProvider {
    http: reqwest::Client,
    api_url: url::Url,
    jwt: Option<Zeroizing<String>>,
}

impl PinataProvider {
    pub fn new(http: reqwest::Client, api_url: url::Url, jwt: Option<Zeroizing<String>>) -> Self {
        Self { http, api_url, jwt }
    }

    fn error(&self, status: Option<u16>, message: impl Into<String>) -> ProviderError {
        ProviderError::new(ProviderKind::Pinata, status, message)
    }

    fn authorization(&self) -> Result<HeaderValue, ProviderError> {
        let jwt = self
            .jwt
            .as_deref()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.error(None, "JWT missing: set PINATA_JWT"))?;
        HeaderValue::from_str(&format!("Bearer {jwt}"))
            .map_err(|_| self.error(None, "JWT contains characters not allowed in a header"))
    }
}

#[async_trait]
impl StorageProvider for PinataProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pinata
    }

    async fn upload_single_file(&self, payload: &[u8], name: &str) -> Result<ContentId, ProviderError> {
        let auth = self.authorization()?;
        let url = format!("{}/{PIN_FILE_PATH}", self.api_url.as_str().trim_end_matches('/'));

        let form = Form::new()
            .part("file", Part::bytes(payload.to_vec()).file_name(name.to_string()))
            .text("pinataMetadata", serde_json::json!({ "name": name }).to_string())
            .text("pinataOptions", serde_json::json!({ "cidVersion": 0 }).to_string());

        let resp = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .multipart(form)
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

        let parsed: PinFileResponse = serde_json::from_str(&body).map_err(|e| {
            self.error(Some(status.as_u16()), format!("malformed response body ({e}): {body}"))
        })?;

        let hash = parsed
            .ipfs_hash
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| self.error(Some(status.as_u16()), format!("response missing IpfsHash: {body}")))?;

        ContentId::new(hash).map_err(|e| self.error(Some(status.as_u16()), e.to_string()))
    }
}
