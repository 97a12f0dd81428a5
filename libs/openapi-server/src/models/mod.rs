//! ICAP API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Body of `POST /api/2/inf/icap`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIcapRequest {
    /// The name to give the new ICAP instance
    pub name: String,

    /// The image/version of ICAP to create
    pub image: String,

    /// The network to hook the ICAP instance up to
    pub network: String,
}

/// Body of `DELETE /api/2/inf/icap`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteIcapRequest {
    /// The name of the ICAP instance to destroy
    pub name: String,
}

/// Content of a submission response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRef {
    #[serde(rename = "task-id")]
    pub task_id: String,
}

/// Returned by every endpoint that submits work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAcceptedResponse {
    pub user: String,
    pub content: TaskRef,
}

/// Uniform result of every lifecycle task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub content: serde_json::Map<String, serde_json::Value>,
    pub error: Option<String>,
    pub params: serde_json::Map<String, serde_json::Value>,
}

/// Lifecycle state of a submitted task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskState {
    Pending,
    Success,
    Failure,
}

/// Response of `GET /api/2/inf/icap/task/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub user: String,
    pub task_id: String,
    pub state: TaskState,

    /// Set once the task completes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskEnvelope>,

    /// Set when the worker hit an infrastructure fault
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Body of every non-2xx response produced by the service itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
