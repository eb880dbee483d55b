//! # Integration Tests for the Capsule Service
//!
//! Admin gating, registry bookkeeping on create and append, and history
//! reads through the registry.

mod common;

use std::sync::Arc;

use capsule_core::FileCategory;
use capsule_ipfs::{
    AccountId, CapsuleClient, CapsuleRegistry, CapsuleService, InMemoryRegistry, InputFile, NewCapsule, NewFiles,
    ProviderKind, RecordId, RegistryError, ServiceError, StorageProvider,
};
use common::{fetcher_for, new_store, start_gateway, MemoryProvider};
use wiremock::MockServer;

fn admin() -> AccountId {
    AccountId::new("0xa11ce")
}

fn capsule() -> NewCapsule {
    NewCapsule {
        title: "Plot 12".into(),
        description: Some("Commercial allotment".into()),
        files: NewFiles {
            land_allotment_files: vec![InputFile::new("allotment.pdf", b"allotment".to_vec())],
            payment_proof_files: Vec::new(),
        },
    }
}

async fn service() -> (CapsuleService<InMemoryRegistry>, Arc<MemoryProvider>, MockServer) {
    let store = new_store();
    let gateway = start_gateway(&store).await;
    let provider = Arc::new(MemoryProvider::new(ProviderKind::Pinata, store));
    let client = CapsuleClient::from_parts(
        vec![provider.clone() as Arc<dyn StorageProvider>],
        fetcher_for(&[&gateway]),
    );
    let service = CapsuleService::new(client, InMemoryRegistry::with_admins([admin()]));
    (service, provider, gateway)
}

#[tokio::test]
async fn admin_creates_and_registers_a_capsule() {
    let (service, _, _gateway) = service().await;
    let (record, cid) = service.create_capsule(&admin(), &capsule()).await.expect("create");

    assert_eq!(record, RecordId(1));
    assert_eq!(service.registry().get_record(record).await.expect("record").content_id, cid);

    let (loaded_cid, manifest) = service.load_capsule(record).await.expect("load");
    assert_eq!(loaded_cid, cid);
    assert_eq!(manifest.title, "Plot 12");
}

#[tokio::test]
async fn non_admin_is_rejected_before_any_upload() {
    let (service, provider, _gateway) = service().await;
    let outsider = AccountId::new("0xb0b");

    let err = service.create_capsule(&outsider, &capsule()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(ref a) if *a == outsider));
    assert!(provider.uploaded_names().is_empty());
    assert!(service.registry().is_empty());
}

#[tokio::test]
async fn append_moves_the_record_to_the_new_version() {
    let (service, provider, _gateway) = service().await;
    let (record, c0) = service.create_capsule(&admin(), &capsule()).await.expect("create");

    let additions = NewFiles {
        payment_proof_files: vec![InputFile::new("challan.jpg", b"challan".to_vec())],
        ..Default::default()
    };

    let outsider = AccountId::new("0xb0b");
    let uploads_before = provider.uploaded_names().len();
    let err = service.append_to_capsule(&outsider, record, &additions).await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert_eq!(provider.uploaded_names().len(), uploads_before);

    let c1 = service.append_to_capsule(&admin(), record, &additions).await.expect("append");
    assert_eq!(service.registry().get_record(record).await.expect("record").content_id, c1);

    let (_, manifest) = service.load_capsule(record).await.expect("load");
    assert_eq!(manifest.previous_cid, Some(c0.clone()));
    assert_eq!(manifest.references(FileCategory::PaymentProof)[0].path, "payment-proof/challan.jpg");

    let history = service.capsule_history(record, 10).await.expect("history");
    let cids: Vec<_> = history.into_iter().map(|(cid, _)| cid).collect();
    assert_eq!(cids, vec![c1, c0]);
}

#[tokio::test]
async fn unknown_record_is_a_registry_error() {
    let (service, _, _gateway) = service().await;
    let err = service.load_capsule(RecordId(42)).await.unwrap_err();
    assert!(matches!(err, ServiceError::Registry(RegistryError::NotFound(RecordId(42)))));

    let err = service
        .append_to_capsule(&admin(), RecordId(42), &capsule().files)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Registry(_)));
}
