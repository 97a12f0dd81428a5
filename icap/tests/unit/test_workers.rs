//! Worker pool tests: submit through the queue, poll the result store

use std::sync::Arc;
use std::time::Duration;

use openapi_server::models::TaskState;
use tokio::sync::broadcast;
use vlab_icap::app::options::AppOptions;
use vlab_icap::app::state::AppState;
use vlab_icap::cache::results::{ResultStore, TaskRecord};
use vlab_icap::dispatch::Dispatcher;
use vlab_icap::tasks::{Operation, TaskHandle};
use vlab_icap::workers::pool;

use crate::helpers::Fixture;

async fn wait_for(results: &ResultStore, handle: &TaskHandle) -> TaskRecord {
    for _ in 0..200 {
        if let Some(record) = results.get(handle) {
            if record.state != TaskState::Pending {
                return record;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {} never finished", handle);
}

fn start(fixture: &Fixture, workers: usize) -> (AppState, broadcast::Sender<()>, Vec<tokio::task::JoinHandle<()>>) {
    let options = AppOptions {
        images_dir: fixture.images.path().to_path_buf(),
        ..Default::default()
    };
    let state = AppState::with_backend(&options, Arc::new(fixture.backend.clone()));
    let (shutdown_tx, _) = broadcast::channel(1);

    let handles = (0..workers)
        .map(|id| {
            let receiver = state.receiver.clone();
            let runner = state.runner.clone();
            let results = state.results.clone();
            let mut shutdown_rx = shutdown_tx.subscribe();
            tokio::spawn(pool::run(
                id,
                receiver,
                runner,
                results,
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            ))
        })
        .collect();

    (state, shutdown_tx, handles)
}

#[tokio::test]
async fn test_create_through_workers() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);
    let (state, shutdown_tx, handles) = start(&fixture, 2);

    let handle = state
        .dispatcher
        .submit(
            "bob",
            "txn-1",
            Operation::Create {
                username: "bob".to_string(),
                name: "BoxA".to_string(),
                version: "1.0.0".to_string(),
                network: "LAN1".to_string(),
            },
        )
        .await
        .unwrap();

    let record = wait_for(&state.results, &handle).await;
    assert_eq!(record.state, TaskState::Success);
    assert_eq!(record.task, "icap.create");
    let envelope = record.result.unwrap();
    assert_eq!(envelope.error, None);
    assert_eq!(envelope.content["BoxA"]["meta"]["version"], "1.0.0");

    let _ = shutdown_tx.send(());
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_domain_error_is_a_successful_task() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);
    let (state, shutdown_tx, _handles) = start(&fixture, 1);

    let handle = state
        .dispatcher
        .submit(
            "bob",
            "txn-2",
            Operation::Delete {
                username: "bob".to_string(),
                name: "BoxZ".to_string(),
            },
        )
        .await
        .unwrap();

    let record = wait_for(&state.results, &handle).await;
    assert_eq!(record.state, TaskState::Success);
    assert_eq!(
        record.result.unwrap().error.as_deref(),
        Some("BoxZ does not exist")
    );
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_fault_is_recorded_as_failure() {
    let fixture = Fixture::new(&["1.0.0"], &["LAN1"]);
    fixture.backend.inject_fault("connection refused");
    let (state, shutdown_tx, _handles) = start(&fixture, 1);

    let handle = state
        .dispatcher
        .submit(
            "bob",
            "txn-3",
            Operation::Show {
                username: "bob".to_string(),
            },
        )
        .await
        .unwrap();

    let record = wait_for(&state.results, &handle).await;
    assert_eq!(record.state, TaskState::Failure);
    assert!(record.result.is_none());
    assert!(record.failure.unwrap().contains("connection refused"));
    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn test_workers_stop_on_shutdown() {
    let fixture = Fixture::new(&[], &[]);
    let (_state, shutdown_tx, handles) = start(&fixture, 3);

    let _ = shutdown_tx.send(());
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
