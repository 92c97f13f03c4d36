use std::sync::Arc;

use gamebase_api::fleet::{FleetError, ProfileUpdate, Registration, TenantStore, encode_email};
use gamebase_api::k8s::K8sClient;
use gamebase_config::shared::ClusterConfig;
use gamebase_telemetry::init_test_tracing;

use crate::support::k8s_client::FakeCluster;

mod support;

const RECORDS_NAMESPACE: &str = "gamebaseprefix";

fn store() -> (Arc<FakeCluster>, TenantStore) {
    let cluster = Arc::new(FakeCluster::new());
    let store = TenantStore::new(
        cluster.clone() as Arc<dyn K8sClient>,
        &ClusterConfig::default(),
    );

    (cluster, store)
}

fn registration(email: &str, password: &str) -> Registration {
    Registration {
        email: email.to_string(),
        name: "Ada".to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn register_creates_the_record_and_the_tenant_namespace() {
    init_test_tracing();
    let (cluster, store) = store();

    let tenant = store
        .register(&registration("Ada@Example.com ", "hunter22"))
        .await
        .expect("failed to register");

    assert_eq!(tenant.email, "ada@example.com");
    assert_eq!(tenant.name, "Ada");
    assert!(tenant.namespace.starts_with("gamebaseprefix-user-"));
    assert!(cluster.has_namespace(RECORDS_NAMESPACE));
    assert!(cluster.has_namespace(&tenant.namespace));

    let record = cluster
        .secret(RECORDS_NAMESPACE, &encode_email("ada@example.com"))
        .expect("tenant record missing");
    let data = record.data.unwrap();
    let password = String::from_utf8(data["password"].0.clone()).unwrap();
    assert_ne!(password, "hunter22");
}

#[tokio::test]
async fn registering_twice_keeps_the_namespace() {
    init_test_tracing();
    let (_cluster, store) = store();

    let first = store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();
    let second = store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();

    assert_eq!(first.namespace, second.namespace);
}

#[tokio::test]
async fn registering_over_another_password_is_refused() {
    init_test_tracing();
    let (_cluster, store) = store();
    store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();

    let err = store
        .register(&registration("ada@example.com", "something-else"))
        .await
        .unwrap_err();

    assert!(matches!(err, FleetError::TenantExists(_)));
    assert!(store.verify_credential("ada@example.com", "hunter22").await.unwrap());
}

#[tokio::test]
async fn credentials_are_verified_against_the_record() {
    init_test_tracing();
    let (_cluster, store) = store();
    store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();

    assert!(store.verify_credential("ADA@example.com", "hunter22").await.unwrap());
    assert!(!store.verify_credential("ada@example.com", "hunter23").await.unwrap());
    assert!(!store.verify_credential("bob@example.com", "hunter22").await.unwrap());
}

#[tokio::test]
async fn resolving_an_unknown_tenant_is_not_found() {
    init_test_tracing();
    let (_cluster, store) = store();

    let err = store.resolve_namespace("nobody@example.com").await.unwrap_err();

    assert!(matches!(err, FleetError::TenantNotFound(_)));
}

#[tokio::test]
async fn an_email_change_moves_the_record_and_keeps_the_namespace() {
    init_test_tracing();
    let (cluster, store) = store();
    let tenant = store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();

    let update = ProfileUpdate {
        email: Some("ada@lovelace.dev".to_string()),
        ..ProfileUpdate::default()
    };
    let moved = store.update_profile("ada@example.com", &update).await.unwrap();

    assert_eq!(moved.email, "ada@lovelace.dev");
    assert_eq!(moved.namespace, tenant.namespace);
    assert!(
        cluster
            .secret(RECORDS_NAMESPACE, &encode_email("ada@example.com"))
            .is_none()
    );
    assert!(store.verify_credential("ada@lovelace.dev", "hunter22").await.unwrap());
    assert_eq!(
        store.resolve_namespace("ada@lovelace.dev").await.unwrap(),
        tenant.namespace
    );
}

#[tokio::test]
async fn a_password_change_rewrites_the_credential() {
    init_test_tracing();
    let (_cluster, store) = store();
    store
        .register(&registration("ada@example.com", "hunter22"))
        .await
        .unwrap();

    let update = ProfileUpdate {
        name: Some("Countess".to_string()),
        password: Some("analytical-engine".to_string()),
        ..ProfileUpdate::default()
    };
    let tenant = store.update_profile("ada@example.com", &update).await.unwrap();

    assert_eq!(tenant.name, "Countess");
    assert!(!store.verify_credential("ada@example.com", "hunter22").await.unwrap());
    assert!(
        store
            .verify_credential("ada@example.com", "analytical-engine")
            .await
            .unwrap()
    );
}
