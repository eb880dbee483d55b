//! # Integration Tests for the Storage Provider Adapters
//!
//! Runs the Pinata and NFT.Storage adapters against wiremock servers to
//! check request construction, content id extraction, and the failure
//! classification the orchestrator depends on.

use capsule_ipfs::nft_storage::NftStorageProvider;
use capsule_ipfs::pinata::PinataProvider;
use capsule_ipfs::{config, ProviderKind, StorageProvider};
use url::Url;
use wiremock::matchers::{body_string, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

fn base(server: &MockServer) -> Url {
    Url::parse(&server.uri()).expect("mock uri")
}

fn pinata(server: &MockServer, jwt: Option<&str>) -> PinataProvider {
    PinataProvider::new(
        reqwest::Client::new(),
        base(server),
        config::credential(jwt.map(str::to_string)),
    )
}

fn nft_storage(server: &MockServer, key: Option<&str>) -> NftStorageProvider {
    NftStorageProvider::new(
        reqwest::Client::new(),
        base(server),
        config::credential(key.map(str::to_string)),
    )
}

// ── Pinata ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn pinata_upload_returns_ipfs_hash() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .and(header("Authorization", "Bearer test-jwt"))
        .and(body_string_contains("pinataMetadata"))
        .and(body_string_contains(r#"{"name":"land-allotment/land-1.pdf"}"#))
        .and(body_string_contains(r#"{"cidVersion":0}"#))
        .and(body_string_contains("deed bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "IpfsHash": CID,
            "PinSize": 10,
            "Timestamp": "2026-01-15T12:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cid = pinata(&server, Some("test-jwt"))
        .upload_single_file(b"deed bytes", "land-allotment/land-1.pdf")
        .await
        .expect("upload");
    assert_eq!(cid.as_str(), CID);
}

#[tokio::test]
async fn pinata_non_success_status_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid jwt"))
        .expect(1)
        .mount(&server)
        .await;

    let err = pinata(&server, Some("bad"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert_eq!(err.provider, ProviderKind::Pinata);
    assert_eq!(err.status, Some(401));
    assert!(err.message.contains("invalid jwt"));
}

#[tokio::test]
async fn pinata_malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = pinata(&server, Some("jwt"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(200));
    assert!(err.message.contains("malformed"));
}

#[tokio::test]
async fn pinata_missing_hash_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pinning/pinFileToIPFS"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "PinSize": 1 })))
        .mount(&server)
        .await;

    let err = pinata(&server, Some("jwt"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert!(err.message.contains("IpfsHash"));
}

#[tokio::test]
async fn pinata_without_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = pinata(&server, Some("   "))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert_eq!(err.status, None);
    assert!(err.message.contains("PINATA_JWT"));
}

// ── NFT.Storage ──────────────────────────────────────────────────────────

#[tokio::test]
async fn nft_storage_upload_returns_value_cid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(header("Authorization", "Bearer test-key"))
        .and(header("X-Name", "payment-proof/payment-1.png"))
        .and(body_string("receipt bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "value": { "cid": CID, "size": 13 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cid = nft_storage(&server, Some("test-key"))
        .upload_single_file(b"receipt bytes", "payment-proof/payment-1.png")
        .await
        .expect("upload");
    assert_eq!(cid.as_str(), CID);
}

#[tokio::test]
async fn nft_storage_ok_false_is_an_error_even_on_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": false,
            "error": { "message": "quota exceeded" }
        })))
        .mount(&server)
        .await;

    let err = nft_storage(&server, Some("key"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert_eq!(err.provider, ProviderKind::NftStorage);
    assert_eq!(err.message, "quota exceeded");
}

#[tokio::test]
async fn nft_storage_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let err = nft_storage(&server, Some("key"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert_eq!(err.status, Some(503));
    assert_eq!(err.message, "maintenance");
}

#[tokio::test]
async fn nft_storage_missing_cid_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true, "value": {} })))
        .mount(&server)
        .await;

    let err = nft_storage(&server, Some("key"))
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert!(err.message.contains("value.cid"));
}

#[tokio::test]
async fn nft_storage_without_credential_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = nft_storage(&server, None)
        .upload_single_file(b"x", "metadata.json")
        .await
        .unwrap_err();
    assert!(err.message.contains("NFT_STORAGE_KEY"));
}
