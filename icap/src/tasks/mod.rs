//! Lifecycle tasks
//!
//! A task is one lifecycle operation submitted by the HTTP front end and
//! executed later by a worker.

pub mod envelope;
pub mod runner;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::generate_uuid;

pub use envelope::TaskEnvelope;
pub use runner::TaskRunner;

/// Opaque id linking a submission to its eventual result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new() -> Self {
        Self(generate_uuid())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for TaskHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lifecycle operation and its arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", content = "args")]
pub enum Operation {
    #[serde(rename = "icap.show")]
    Show { username: String },

    #[serde(rename = "icap.create")]
    Create {
        username: String,
        name: String,
        version: String,
        network: String,
    },

    #[serde(rename = "icap.delete")]
    Delete { username: String, name: String },

    #[serde(rename = "icap.image")]
    Image,
}

impl Operation {
    /// Registered task name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Show { .. } => "icap.show",
            Operation::Create { .. } => "icap.create",
            Operation::Delete { .. } => "icap.delete",
            Operation::Image => "icap.image",
        }
    }

    /// Owner and appliance name for operations that change one appliance
    pub fn target(&self) -> Option<(&str, &str)> {
        match self {
            Operation::Create { username, name, .. } | Operation::Delete { username, name } => {
                Some((username, name))
            }
            Operation::Show { .. } | Operation::Image => None,
        }
    }
}

/// What gets queued for a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub handle: TaskHandle,

    /// Correlation id of the originating request
    pub txn_id: String,

    /// Caller that submitted the task
    pub user: String,

    pub operation: Operation,
}
