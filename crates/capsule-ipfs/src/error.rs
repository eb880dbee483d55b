//! IPFS client error types.
//!
//! A single provider failing is recoverable ([`ProviderError`], wrapped in an
//! [`UploadAttemptError`] by the builder). Everything reaching the caller is
//! fatal and names the provider or gateway that failed along with the cause.

use std::fmt;

use capsule_core::{ContentId, CoreError};

use crate::config::ConfigError;
use crate::provider::ProviderKind;

/// One upload to one provider failed.
#[derive(Debug, thiserror::Error)]
#[error("{provider} upload failed ({}): {message}", status_label(.status))]
pub struct ProviderError {
    pub provider: ProviderKind,
    /// HTTP status, when the provider answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            provider,
            status,
            message: message.into(),
        }
    }
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {code}"),
        None => "no response".to_string(),
    }
}

/// Which upload of a manifest build failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStage {
    /// The preliminary manifest, uploaded before any file.
    PreliminaryMetadata,
    /// A capsule file, identified by its logical path.
    File { path: String },
    /// The final manifest that references every file.
    FinalMetadata,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreliminaryMetadata => write!(f, "preliminary metadata"),
            Self::File { path } => write!(f, "file {path}"),
            Self::FinalMetadata => write!(f, "final metadata"),
        }
    }
}

/// A complete build against one provider was abandoned.
#[derive(Debug, thiserror::Error)]
#[error("{provider}: failed to upload {stage} {}", cause_detail(.source))]
pub struct UploadAttemptError {
    pub provider: ProviderKind,
    pub stage: UploadStage,
    #[source]
    pub source: ProviderError,
}

/// The provider's cause without its name, which the attempt already carries.
fn cause_detail(source: &ProviderError) -> String {
    format!("({}): {}", status_label(&source.status), source.message)
}

/// Every configured provider failed. Holds one cause per attempt, in order.
#[derive(Debug, thiserror::Error)]
#[error("all {} configured storage providers failed: {}", .attempts.len(), summarize(.attempts))]
pub struct AggregateUploadError {
    pub attempts: Vec<UploadAttemptError>,
}

fn summarize(attempts: &[UploadAttemptError]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a single gateway candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No response (connection refused, timeout, TLS).
    Transport(String),
    /// Non-success HTTP status.
    Status(u16),
    /// The body was not a manifest.
    Parse(String),
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {e}"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Parse(e) => write!(f, "not a manifest: {e}"),
        }
    }
}

/// A gateway candidate URL that did not yield a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayMiss {
    pub url: String,
    pub reason: MissReason,
}

impl fmt::Display for GatewayMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.url, self.reason)
    }
}

/// No gateway candidate produced a manifest.
#[derive(Debug, thiserror::Error)]
#[error("manifest {cid} not found on any gateway: {}", join_misses(.misses))]
pub struct NotFoundError {
    pub cid: ContentId,
    pub misses: Vec<GatewayMiss>,
}

fn join_misses(misses: &[GatewayMiss]) -> String {
    misses.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

/// Errors returned by [`crate::CapsuleClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum CapsuleError {
    /// No usable provider or gateway.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Every configured provider failed.
    #[error(transparent)]
    Upload(#[from] AggregateUploadError),
    /// The manifest could not be retrieved from any gateway.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    /// The request was rejected before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Manifest or identifier handling failed.
    #[error(transparent)]
    Core(#[from] CoreError),
    /// The HTTP client could not be constructed.
    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(#[source] reqwest::Error),
}
