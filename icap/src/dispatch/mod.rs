//! Task dispatch
//!
//! The HTTP front end only ever submits; workers dequeue on the other end of
//! the queue and publish results into the [`ResultStore`].
//!
//! [`ResultStore`]: crate::cache::results::ResultStore

pub mod queue;

use async_trait::async_trait;

use crate::errors::ProvisionerError;
use crate::tasks::{Operation, TaskHandle};

/// Accepts work for asynchronous execution
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Enqueue `operation` and return its handle without waiting for it to run
    async fn submit(
        &self,
        user: &str,
        txn_id: &str,
        operation: Operation,
    ) -> Result<TaskHandle, ProvisionerError>;
}
