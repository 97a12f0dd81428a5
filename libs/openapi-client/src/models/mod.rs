//! Gateway API models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Session login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Session login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub session_id: String,
}

/// A network known to the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub name: String,
    pub moid: String,
}

/// Network listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkListResponse {
    pub networks: Vec<NetworkInfo>,
}

/// Reference to a virtual machine in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSummary {
    pub name: String,
    pub moid: String,
}

/// Contents of a user's inventory folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderResponse {
    #[serde(default)]
    pub vms: Vec<VmSummary>,
}

/// Desired power state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerRequest {
    /// One of `on`, `off`, `restart`
    pub state: String,
}

/// Deploy a packaged image into a user's folder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub folder: String,
    pub name: String,
    pub ova_path: String,

    /// Image network name -> cluster network moid
    pub network_map: BTreeMap<String, String>,
    pub power_on: bool,
}

/// Result of a deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub vm: VmSummary,
}

/// Lifecycle metadata stored in a VM's annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmMeta {
    pub component: String,
    pub created: i64,
    pub version: String,
    pub generation: u32,
    pub configured: bool,
}

/// Error body returned by the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    #[serde(default)]
    pub error: String,
}
