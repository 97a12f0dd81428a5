//! Task result store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::tasks::{TaskEnvelope, TaskHandle, TaskPayload};
use openapi_server::models::TaskState;

/// Everything known about one submitted task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub user: String,
    pub task: &'static str,
    pub state: TaskState,
    pub result: Option<TaskEnvelope>,
    pub failure: Option<String>,
    seq: u64,
}

/// In-memory store of task states, bounded by `capacity`.
///
/// When full, the oldest finished record is evicted first; pending records
/// are only evicted when nothing has finished.
pub struct ResultStore {
    entries: RwLock<HashMap<TaskHandle, TaskRecord>>,
    capacity: usize,
    seq: AtomicU64,
}

impl ResultStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            seq: AtomicU64::new(0),
        }
    }

    /// Record a freshly submitted task as pending
    pub fn insert_pending(&self, payload: &TaskPayload) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if entries.len() >= self.capacity && !entries.contains_key(&payload.handle) {
            let victim = entries
                .iter()
                .min_by_key(|(_, r)| (r.state == TaskState::Pending, r.seq))
                .map(|(handle, _)| handle.clone());
            if let Some(victim) = victim {
                entries.remove(&victim);
            }
        }

        let record = TaskRecord {
            user: payload.user.clone(),
            task: payload.operation.name(),
            state: TaskState::Pending,
            result: None,
            failure: None,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        entries.insert(payload.handle.clone(), record);
    }

    /// Publish the envelope of a finished task
    pub fn complete(&self, handle: &TaskHandle, envelope: TaskEnvelope) {
        self.update(handle, |record| {
            record.state = TaskState::Success;
            record.result = Some(envelope);
        });
    }

    /// Record an infrastructure fault for a task
    pub fn fail(&self, handle: &TaskHandle, reason: String) {
        self.update(handle, |record| {
            record.state = TaskState::Failure;
            record.failure = Some(reason);
        });
    }

    fn update<F: FnOnce(&mut TaskRecord)>(&self, handle: &TaskHandle, f: F) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = entries.get_mut(handle) {
            f(record);
        }
    }

    /// Drop a record, e.g. when its submission never reached the queue
    pub fn remove(&self, handle: &TaskHandle) -> Option<TaskRecord> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(handle)
    }

    pub fn get(&self, handle: &TaskHandle) -> Option<TaskRecord> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(handle).cloned()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
