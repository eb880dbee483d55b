//! IPFS client configuration.
//!
//! Holds the provider credentials and the gateway bases used for retrieval.
//! The configuration is an explicit value handed to [`crate::CapsuleClient`];
//! nothing below this module reads the environment.

use url::Url;
use zeroize::Zeroizing;

use crate::provider::ProviderKind;

/// Default gateway bases, tried in order.
pub const DEFAULT_GATEWAYS: [&str; 3] = [
    "https://gateway.pinata.cloud/ipfs",
    "https://ipfs.io/ipfs",
    "https://nftstorage.link/ipfs",
];

const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";
const DEFAULT_NFT_STORAGE_API_URL: &str = "https://api.nft.storage";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for talking to pinning providers and gateways.
///
/// Custom `Debug` implementation redacts both credentials.
#[derive(Clone)]
pub struct IpfsConfig {
    /// Pinata JWT (primary provider). `None` disables Pinata.
    pub pinata_jwt: Option<Zeroizing<String>>,
    /// NFT.Storage API key (secondary provider). `None` disables NFT.Storage.
    pub nft_storage_key: Option<Zeroizing<String>>,
    /// Base URL of the Pinata API.
    pub pinata_api_url: Url,
    /// Base URL of the NFT.Storage API.
    pub nft_storage_api_url: Url,
    /// Gateway bases; a content id is appended as the next path segment.
    pub gateway_urls: Vec<Url>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for IpfsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |c: &Option<Zeroizing<String>>| if c.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("IpfsConfig")
            .field("pinata_jwt", &redact(&self.pinata_jwt))
            .field("nft_storage_key", &redact(&self.nft_storage_key))
            .field("pinata_api_url", &self.pinata_api_url)
            .field("nft_storage_api_url", &self.nft_storage_api_url)
            .field("gateway_urls", &self.gateway_urls)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Whether a provider can be used, with a hint for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub provider: ProviderKind,
    pub configured: bool,
    pub message: String,
}

impl IpfsConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PINATA_JWT` (optional)
    /// - `NFT_STORAGE_KEY` (optional)
    /// - `IPFS_GATEWAY_URLS` (comma-separated, default: [`DEFAULT_GATEWAYS`])
    /// - `PINATA_API_URL` (default: `https://api.pinata.cloud`)
    /// - `NFT_STORAGE_API_URL` (default: `https://api.nft.storage`)
    /// - `IPFS_TIMEOUT_SECS` (whole seconds, at least 1, default: 30)
    ///
    /// Missing credentials are not an error here. Having no provider at all
    /// is reported when the first upload is attempted.
    pub fn from_env() -> Result<Self, ConfigError> {
        let gateway_urls = match std::env::var("IPFS_GATEWAY_URLS") {
            Ok(raw) if !raw.trim().is_empty() => parse_url_list("IPFS_GATEWAY_URLS", &raw)?,
            _ => default_gateways()?,
        };

        Ok(Self {
            pinata_jwt: credential(std::env::var(ProviderKind::Pinata.credential_var()).ok()),
            nft_storage_key: credential(
                std::env::var(ProviderKind::NftStorage.credential_var()).ok(),
            ),
            pinata_api_url: env_url("PINATA_API_URL", DEFAULT_PINATA_API_URL)?,
            nft_storage_api_url: env_url("NFT_STORAGE_API_URL", DEFAULT_NFT_STORAGE_API_URL)?,
            gateway_urls,
            timeout_secs: parse_timeout(std::env::var("IPFS_TIMEOUT_SECS").ok())?,
        })
    }

    /// Create a configuration pointing at local mock servers (for testing).
    ///
    /// Pinata listens on `base_port`, NFT.Storage on `base_port + 1`, and two
    /// gateways on `base_port + 2` and `base_port + 3`.
    pub fn local_mock(base_port: u16, pinata_jwt: &str, nft_storage_key: &str) -> Result<Self, ConfigError> {
        let make_url = |port: u16, path: &str| -> Result<Url, ConfigError> {
            Url::parse(&format!("http://127.0.0.1:{port}{path}")).map_err(|e| ConfigError::InvalidUrl {
                var: "localhost".to_string(),
                reason: e.to_string(),
            })
        };
        Ok(Self {
            pinata_jwt: credential(Some(pinata_jwt.to_string())),
            nft_storage_key: credential(Some(nft_storage_key.to_string())),
            pinata_api_url: make_url(base_port, "")?,
            nft_storage_api_url: make_url(base_port + 1, "")?,
            gateway_urls: vec![make_url(base_port + 2, "/ipfs")?, make_url(base_port + 3, "/ipfs")?],
            timeout_secs: 5,
        })
    }

    /// Providers with a usable credential, primary first.
    pub fn configured_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.credential_for(*kind).is_some())
            .collect()
    }

    /// Per-provider configuration report, primary first.
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        ProviderKind::ALL
            .into_iter()
            .map(|provider| {
                let configured = self.credential_for(provider).is_some();
                let message = if configured {
                    format!("{provider} credential is configured")
                } else {
                    format!(
                        "{provider} is disabled: set {} to enable it",
                        provider.credential_var()
                    )
                };
                ProviderStatus {
                    provider,
                    configured,
                    message,
                }
            })
            .collect()
    }

    /// The non-blank credential for `kind`, if any.
    pub fn credential_for(&self, kind: ProviderKind) -> Option<&Zeroizing<String>> {
        let credential = match kind {
            ProviderKind::Pinata => self.pinata_jwt.as_ref(),
            ProviderKind::NftStorage => self.nft_storage_key.as_ref(),
        };
        credential.filter(|c| !c.trim().is_empty())
    }
}

/// Wrap a raw credential, treating blank values as absent.
pub fn credential(raw: Option<String>) -> Option<Zeroizing<String>> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Zeroizing::new)
}

fn default_gateways() -> Result<Vec<Url>, ConfigError> {
    DEFAULT_GATEWAYS
        .iter()
        .map(|raw| {
            Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
                var: "DEFAULT_GATEWAYS".to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}

fn parse_url_list(var: &str, raw: &str) -> Result<Vec<Url>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Url::parse(s).map_err(|e| ConfigError::InvalidUrl {
                var: var.to_string(),
                reason: format!("{s:?}: {e}"),
            })
        })
        .collect()
}

/// Request timeout from its raw variable. Absent or blank means the default;
/// zero would fail every request, so it is rejected with anything non-numeric.
pub fn parse_timeout(raw: Option<String>) -> Result<u64, ConfigError> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(DEFAULT_TIMEOUT_SECS);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidTimeout {
            value: raw,
            reason: "must be at least 1 second".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidTimeout {
            value: raw,
            reason: e.to_string(),
        }),
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        var: var.to_string(),
        reason: e.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no storage provider is configured: set PINATA_JWT and/or NFT_STORAGE_KEY")]
    NoProviderConfigured,
    #[error("no retrieval gateway is configured: set IPFS_GATEWAY_URLS")]
    NoGatewayConfigured,
    #[error("invalid URL for {var}: {reason}")]
    InvalidUrl { var: String, reason: String },
    #[error("invalid IPFS_TIMEOUT_SECS {value:?}: {reason}")]
    InvalidTimeout { value: String, reason: String },
}
