//! Lifecycle task workers

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::{error, info, info_span, Instrument};

use crate::cache::results::ResultStore;
use crate::dispatch::queue::TaskReceiver;
use crate::tasks::{TaskPayload, TaskRunner};

/// Worker pool options
#[derive(Debug, Clone)]
pub struct Options {
    /// Number of concurrent workers
    pub count: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self { count: 4 }
    }
}

/// Run one worker until shutdown or until the queue closes.
///
/// A task that has been dequeued always runs to completion; shutdown is only
/// observed between tasks.
pub async fn run(
    worker_id: usize,
    receiver: TaskReceiver,
    runner: Arc<TaskRunner>,
    results: Arc<ResultStore>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Worker {} starting...", worker_id);

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Worker {} shutting down...", worker_id);
                return;
            }
            payload = receiver.dequeue() => {
                match payload {
                    Some(payload) => execute(payload, &runner, &results).await,
                    None => {
                        info!("Task queue closed, worker {} exiting", worker_id);
                        return;
                    }
                }
            }
        }
    }
}

/// Run a single task and publish its outcome
pub async fn execute(payload: TaskPayload, runner: &TaskRunner, results: &ResultStore) {
    let span = info_span!(
        "task",
        task_id = %payload.handle,
        txn_id = %payload.txn_id,
        operation = payload.operation.name(),
        user = %payload.user,
    );

    async {
        info!("Task starting");
        match runner.run(&payload.operation).await {
            Ok(envelope) => {
                match &envelope.error {
                    Some(e) => error!("Task failed: {}", e),
                    None => info!("Task complete"),
                }
                results.complete(&payload.handle, envelope);
            }
            Err(e) => {
                // infrastructure fault: surfaced as a task failure, never retried
                error!("Task errored: {}", e);
                results.fail(&payload.handle, e.to_string());
            }
        }
    }
    .instrument(span)
    .await
}
