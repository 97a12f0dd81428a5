//! Virtualization backend boundary
//!
//! The lifecycle manager only talks to the cluster through [`Session`]. Every
//! task opens its own session with [`Backend::connect`] and closes it when the
//! task ends; sessions are never shared between tasks.

pub mod memory;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProvisionerError;

/// A cluster network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub name: String,
    pub moid: String,
}

/// A virtual machine in the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmRef {
    pub name: String,
    pub moid: String,
}

/// Opaque info snapshot of a VM, passed through to callers untouched
pub type VmInfo = serde_json::Map<String, serde_json::Value>;

/// Lifecycle metadata tagged onto every managed appliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplianceMeta {
    pub component: String,
    pub created: i64,
    pub version: String,
    pub generation: u32,
    pub configured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Restart,
}

impl PowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerState::On => "on",
            PowerState::Off => "off",
            PowerState::Restart => "restart",
        }
    }
}

/// What to deploy, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploySpec {
    /// Owner whose folder receives the VM
    pub folder: String,

    /// Name of the new VM
    pub name: String,

    /// Path of the packaged image
    pub ova_path: PathBuf,

    /// Image network name -> cluster network
    pub network_map: BTreeMap<String, NetworkRef>,
}

/// Opens sessions against the cluster
#[async_trait]
pub trait Backend: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>, ProvisionerError>;
}

/// One authenticated conversation with the cluster.
///
/// Backend "not found" and "bad input" answers come back as
/// `ProvisionerError::Domain`; everything else is an infrastructure fault.
#[async_trait]
pub trait Session: Send + Sync {
    /// Networks the cluster knows, keyed by name
    async fn networks(&self) -> Result<HashMap<String, NetworkRef>, ProvisionerError>;

    /// VMs in `owner`'s folder; an absent folder is empty
    async fn folder(&self, owner: &str) -> Result<Vec<VmRef>, ProvisionerError>;

    async fn vm_info(&self, vm: &VmRef) -> Result<VmInfo, ProvisionerError>;

    /// Lifecycle metadata, `None` for untagged VMs
    async fn meta(&self, vm: &VmRef) -> Result<Option<ApplianceMeta>, ProvisionerError>;

    async fn set_meta(&self, vm: &VmRef, meta: &ApplianceMeta) -> Result<(), ProvisionerError>;

    /// Idempotent: powering off a VM that is already off succeeds
    async fn power(&self, vm: &VmRef, state: PowerState) -> Result<(), ProvisionerError>;

    async fn deploy(&self, spec: &DeploySpec) -> Result<VmRef, ProvisionerError>;

    /// Remove the VM from inventory and disk
    async fn destroy(&self, vm: &VmRef) -> Result<(), ProvisionerError>;

    /// Release the session. Never fails; problems are logged.
    async fn close(&self);
}
