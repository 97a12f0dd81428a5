//! Appliance lifecycle tests, run through the task runner

use serde_json::{json, Map};
use vlab_icap::appliance::COMPONENT;
use vlab_icap::backend::memory::Call;
use vlab_icap::backend::{ApplianceMeta, Backend, PowerState};
use vlab_icap::tasks::Operation;

use crate::helpers::Fixture;

fn icap_meta(version: &str) -> Option<ApplianceMeta> {
    Some(ApplianceMeta {
        component: COMPONENT.to_string(),
        created: 1_700_000_000,
        version: version.to_string(),
        generation: 1,
        configured: true,
    })
}

fn onefs_meta() -> Option<ApplianceMeta> {
    Some(ApplianceMeta {
        component: "OneFS".to_string(),
        created: 1_700_000_000,
        version: "8.1.2".to_string(),
        generation: 1,
        configured: true,
    })
}

fn create(name: &str, version: &str, network: &str) -> Operation {
    Operation::Create {
        username: "bob".to_string(),
        name: name.to_string(),
        version: version.to_string(),
        network: network.to_string(),
    }
}

fn delete(name: &str) -> Operation {
    Operation::Delete {
        username: "bob".to_string(),
        name: name.to_string(),
    }
}

fn show() -> Operation {
    Operation::Show {
        username: "bob".to_string(),
    }
}

fn deployed(calls: &[Call]) -> bool {
    calls.iter().any(|c| matches!(c, Call::Deploy(_)))
}

#[tokio::test]
async fn test_create_end_to_end() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    let envelope = fixture.runner.run(&create("BoxA", "1.0.0", "LAN1")).await.unwrap();

    assert_eq!(envelope.error, None);
    assert!(envelope.params.is_empty());
    let info = &envelope.content["BoxA"];
    assert_eq!(info["meta"]["version"], "1.0.0");
    assert_eq!(info["meta"]["generation"], 1);
    assert_eq!(info["meta"]["configured"], false);
    assert_eq!(info["meta"]["component"], COMPONENT);
    assert_eq!(info["networks"], json!(["LAN1"]));
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxA".to_string()]);
}

#[tokio::test]
async fn test_create_unknown_network_never_deploys() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    let envelope = fixture.runner.run(&create("BoxA", "1.0.0", "LAN9")).await.unwrap();

    assert_eq!(envelope.error.as_deref(), Some("LAN9 is not a valid network"));
    assert_eq!(envelope.content, Map::new());
    assert!(!deployed(&fixture.backend.calls()));
}

#[tokio::test]
async fn test_create_unknown_version_never_deploys() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);

    let envelope = fixture.runner.run(&create("BoxA", "9.9.9", "LAN1")).await.unwrap();

    assert_eq!(
        envelope.error.as_deref(),
        Some("9.9.9 is not a valid image version")
    );
    assert_eq!(envelope.content, Map::new());
    assert!(!deployed(&fixture.backend.calls()));
}

#[tokio::test]
async fn test_create_taken_name_is_rejected() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);
    fixture.backend.add_vm("bob", "BoxA", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&create("BoxA", "1.0.0", "LAN1")).await.unwrap();

    assert_eq!(envelope.error.as_deref(), Some("BoxA already exists"));
    assert_eq!(envelope.content, Map::new());
}

#[tokio::test]
async fn test_delete_missing_name() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxB", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&delete("BoxA")).await.unwrap();

    assert_eq!(envelope.error.as_deref(), Some("BoxA does not exist"));
    assert_eq!(envelope.content, Map::new());
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxB".to_string()]);
}

#[tokio::test]
async fn test_delete_ignores_other_components() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxA", None);

    let envelope = fixture.runner.run(&delete("BoxA")).await.unwrap();

    assert_eq!(envelope.error.as_deref(), Some("BoxA does not exist"));
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxA".to_string()]);
}

#[tokio::test]
async fn test_delete_leaves_same_named_onefs_alone() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxA", onefs_meta());

    let envelope = fixture.runner.run(&delete("BoxA")).await.unwrap();

    assert_eq!(envelope.error.as_deref(), Some("BoxA does not exist"));
    assert_eq!(envelope.content, Map::new());
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxA".to_string()]);
    let calls = fixture.backend.calls();
    assert!(!calls.iter().any(|c| matches!(c, Call::Power(..) | Call::Destroy(_))));
}

#[tokio::test]
async fn test_delete_picks_icap_over_same_named_onefs() {
    let fixture = Fixture::new(&[], &[]);
    let onefs = fixture.backend.add_vm("bob", "BoxA", onefs_meta());
    fixture.backend.add_vm("bob", "BoxA", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&delete("BoxA")).await.unwrap();

    assert_eq!(envelope.error, None);
    assert_eq!(fixture.backend.vm_names("bob"), vec!["BoxA".to_string()]);

    let session = fixture.backend.connect().await.unwrap();
    let survivor = session.meta(&onefs).await.unwrap();
    session.close().await;
    assert_eq!(survivor, onefs_meta());

    let destroys = fixture
        .backend
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::Destroy(_)))
        .count();
    assert_eq!(destroys, 1);
}

#[tokio::test]
async fn test_delete_powers_off_then_destroys_once() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxA", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&delete("BoxA")).await.unwrap();

    assert_eq!(envelope.error, None);
    assert_eq!(envelope.content, Map::new());
    assert!(fixture.backend.vm_names("bob").is_empty());

    let calls = fixture.backend.calls();
    let power_offs: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Call::Power("BoxA".to_string(), PowerState::Off))
        .map(|(i, _)| i)
        .collect();
    let destroys: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Call::Destroy("BoxA".to_string()))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(power_offs.len(), 1);
    assert_eq!(destroys.len(), 1);
    assert!(power_offs[0] < destroys[0]);
}

#[tokio::test]
async fn test_show_absent_folder_is_empty() {
    let fixture = Fixture::new(&[], &[]);

    let envelope = fixture.runner.run(&show()).await.unwrap();

    assert_eq!(envelope.error, None);
    assert_eq!(envelope.content, Map::new());
}

#[tokio::test]
async fn test_show_only_lists_icap_appliances() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxA", icap_meta("1.0.0"));
    fixture.backend.add_vm("bob", "Router", None);
    fixture.backend.add_vm("alice", "BoxC", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&show()).await.unwrap();

    let names: Vec<&String> = envelope.content.keys().collect();
    assert_eq!(names, vec!["BoxA"]);
    assert_eq!(envelope.content["BoxA"]["state"], "on");
}

#[tokio::test]
async fn test_show_skips_onefs_appliances() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "Storage1", onefs_meta());
    fixture.backend.add_vm("bob", "BoxA", icap_meta("1.0.0"));

    let envelope = fixture.runner.run(&show()).await.unwrap();

    assert_eq!(envelope.error, None);
    let names: Vec<&String> = envelope.content.keys().collect();
    assert_eq!(names, vec!["BoxA"]);
}

#[tokio::test]
async fn test_image_lists_catalog() {
    let fixture = Fixture::new(&["1.0.0", "2.0.0"], &[]);

    let envelope = fixture.runner.run(&Operation::Image).await.unwrap();

    assert_eq!(envelope.error, None);
    assert_eq!(envelope.content["image"], json!(["1.0.0", "2.0.0"]));
    // no backend session needed to list images
    assert!(fixture.backend.calls().is_empty());
}

#[tokio::test]
async fn test_manager_show_direct() {
    let fixture = Fixture::new(&[], &[]);
    fixture.backend.add_vm("bob", "BoxA", icap_meta("3.0.0"));

    let session = fixture.backend.connect().await.unwrap();
    let shown = fixture.manager().show(session.as_ref(), "bob").await.unwrap();
    session.close().await;

    assert_eq!(shown["BoxA"]["meta"]["version"], "3.0.0");
}
