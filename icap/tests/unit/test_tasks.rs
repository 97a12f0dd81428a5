//! Task runner tests: session scoping, fault propagation and name locks

use std::sync::Arc;
use std::time::Duration;

use vlab_icap::appliance::ApplianceManager;
use vlab_icap::backend::memory::{Call, InMemoryBackend};
use vlab_icap::catalog::VersionCatalog;
use vlab_icap::errors::ProvisionerError;
use vlab_icap::tasks::{Operation, TaskRunner};

use crate::helpers::Fixture;

fn create(name: &str, network: &str) -> Operation {
    Operation::Create {
        username: "bob".to_string(),
        name: name.to_string(),
        version: "1.0.0".to_string(),
        network: network.to_string(),
    }
}

#[tokio::test]
async fn test_session_closed_after_success() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    fixture.runner.run(&create("BoxA", "LAN1")).await.unwrap();

    let calls = fixture.backend.calls();
    assert_eq!(calls.first(), Some(&Call::Connect));
    assert_eq!(calls.last(), Some(&Call::Close));
    assert_eq!(fixture.backend.open_sessions(), 0);
}

#[tokio::test]
async fn test_session_closed_after_domain_error() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    let envelope = fixture.runner.run(&create("BoxA", "LAN9")).await.unwrap();

    assert!(envelope.error.is_some());
    assert_eq!(fixture.backend.open_sessions(), 0);
}

#[tokio::test]
async fn test_fault_propagates_and_closes_session() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);
    fixture.backend.inject_fault("backend unreachable");

    let err = fixture.runner.run(&create("BoxA", "LAN1")).await.unwrap_err();

    assert!(matches!(err, ProvisionerError::BackendError(_)));
    assert_eq!(fixture.backend.open_sessions(), 0);
    assert_eq!(fixture.backend.calls().last(), Some(&Call::Close));
}

#[tokio::test]
async fn test_unreadable_catalog_is_a_fault() {
    let backend = InMemoryBackend::new();
    let manager = ApplianceManager::new(VersionCatalog::new("/nonexistent/images"));
    let runner = TaskRunner::new(Arc::new(backend), manager);

    let err = runner.run(&Operation::Image).await.unwrap_err();
    assert!(matches!(err, ProvisionerError::CatalogError(_)));
}

#[tokio::test]
async fn test_each_task_gets_its_own_session() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    fixture.runner.run(&create("BoxA", "LAN1")).await.unwrap();
    fixture.runner.run(&create("BoxB", "LAN1")).await.unwrap();

    let connects = fixture
        .backend
        .calls()
        .iter()
        .filter(|c| **c == Call::Connect)
        .count();
    assert_eq!(connects, 2);
}

#[tokio::test]
async fn test_concurrent_creates_of_one_name_are_serialized() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    let a = {
        let runner = fixture.runner.clone();
        tokio::spawn(async move { runner.run(&create("BoxA", "LAN1")).await })
    };
    let b = {
        let runner = fixture.runner.clone();
        tokio::spawn(async move { runner.run(&create("BoxA", "LAN1")).await })
    };

    let a = tokio::time::timeout(Duration::from_secs(5), a).await.unwrap().unwrap().unwrap();
    let b = tokio::time::timeout(Duration::from_secs(5), b).await.unwrap().unwrap().unwrap();

    // exactly one of them wins, the other sees the name taken
    let errors: Vec<_> = [a.error, b.error].into_iter().flatten().collect();
    assert_eq!(errors, vec!["BoxA already exists".to_string()]);
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxA".to_string()]);
}
