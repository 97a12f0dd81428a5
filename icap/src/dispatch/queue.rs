//! In-process task queue

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::cache::results::ResultStore;
use crate::dispatch::Dispatcher;
use crate::errors::ProvisionerError;
use crate::tasks::{Operation, TaskHandle, TaskPayload};

/// Create a bounded queue and its two ends
pub fn local_queue(capacity: usize, results: Arc<ResultStore>) -> (LocalDispatcher, TaskReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        LocalDispatcher { tx, results },
        TaskReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Submitting end of the in-process queue
#[derive(Clone)]
pub struct LocalDispatcher {
    tx: mpsc::Sender<TaskPayload>,
    results: Arc<ResultStore>,
}

#[async_trait]
impl Dispatcher for LocalDispatcher {
    async fn submit(
        &self,
        user: &str,
        txn_id: &str,
        operation: Operation,
    ) -> Result<TaskHandle, ProvisionerError> {
        let payload = TaskPayload {
            handle: TaskHandle::new(),
            txn_id: txn_id.to_string(),
            user: user.to_string(),
            operation,
        };
        let handle = payload.handle.clone();

        // pending before it is visible to any worker
        self.results.insert_pending(&payload);

        if let Err(e) = self.tx.try_send(payload) {
            self.results.remove(&handle);
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "task queue is full",
                mpsc::error::TrySendError::Closed(_) => "task queue is closed",
            };
            warn!("Rejected task submission: {}", reason);
            return Err(ProvisionerError::DispatchError(reason.to_string()));
        }

        debug!("Submitted task {}", handle);
        Ok(handle)
    }
}

/// Receiving end of the in-process queue, shared by all workers
#[derive(Clone)]
pub struct TaskReceiver {
    rx: Arc<Mutex<mpsc::Receiver<TaskPayload>>>,
}

impl TaskReceiver {
    /// Next task, or `None` once every dispatcher is gone and the queue drained
    pub async fn dequeue(&self) -> Option<TaskPayload> {
        self.rx.lock().await.recv().await
    }
}
