//! In-process backend
//!
//! Keeps the inventory in memory and records every call made against it.
//! Used for local runs (`backend.base_url = "memory://"`) and by the tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::backend::{
    ApplianceMeta, Backend, DeploySpec, NetworkRef, PowerState, Session, VmInfo, VmRef,
};
use crate::errors::{DomainError, ProvisionerError};

/// A call received by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Close,
    Networks,
    Folder(String),
    VmInfo(String),
    Meta(String),
    SetMeta(String),
    Power(String, PowerState),
    Deploy(String),
    Destroy(String),
}

#[derive(Debug, Clone)]
struct VmRecord {
    vm: VmRef,
    power: PowerState,
    meta: Option<ApplianceMeta>,
    networks: Vec<String>,
}

#[derive(Debug, Default)]
struct Inventory {
    networks: HashMap<String, NetworkRef>,
    folders: HashMap<String, Vec<VmRecord>>,
    calls: Vec<Call>,
    open_sessions: usize,
    next_moid: u64,
    fault: Option<String>,
}

/// Shared in-memory inventory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    inventory: Arc<Mutex<Inventory>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `name` a network known to the cluster
    pub fn add_network(&self, name: &str) {
        let mut inv = self.lock();
        inv.next_moid += 1;
        let moid = format!("network-{}", inv.next_moid);
        inv.networks.insert(
            name.to_string(),
            NetworkRef {
                name: name.to_string(),
                moid,
            },
        );
    }

    /// Place a VM straight into `owner`'s folder, bypassing deploy
    pub fn add_vm(&self, owner: &str, name: &str, meta: Option<ApplianceMeta>) -> VmRef {
        let mut inv = self.lock();
        inv.next_moid += 1;
        let vm = VmRef {
            name: name.to_string(),
            moid: format!("vm-{}", inv.next_moid),
        };
        inv.folders.entry(owner.to_string()).or_default().push(VmRecord {
            vm: vm.clone(),
            power: PowerState::On,
            meta,
            networks: Vec::new(),
        });
        vm
    }

    /// Names of the VMs in `owner`'s folder
    pub fn vm_names(&self, owner: &str) -> Vec<String> {
        self.lock()
            .folders
            .get(owner)
            .map(|vms| vms.iter().map(|r| r.vm.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Sessions connected but not yet closed
    pub fn open_sessions(&self) -> usize {
        self.lock().open_sessions
    }

    /// Make every subsequent session call fail with an infrastructure fault
    pub fn inject_fault(&self, message: &str) {
        self.lock().fault = Some(message.to_string());
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn connect(&self) -> Result<Box<dyn Session>, ProvisionerError> {
        let mut inv = self.lock();
        inv.calls.push(Call::Connect);
        inv.open_sessions += 1;
        Ok(Box::new(InMemorySession {
            inventory: self.inventory.clone(),
        }))
    }
}

struct InMemorySession {
    inventory: Arc<Mutex<Inventory>>,
}

impl InMemorySession {
    /// Record `call` and hand back the inventory, unless a fault is injected
    fn enter(&self, call: Call) -> Result<MutexGuard<'_, Inventory>, ProvisionerError> {
        let mut inv = self.inventory.lock().unwrap_or_else(|e| e.into_inner());
        inv.calls.push(call);
        if let Some(fault) = inv.fault.clone() {
            return Err(ProvisionerError::BackendError(fault));
        }
        Ok(inv)
    }
}

fn find<'a>(inv: &'a mut Inventory, vm: &VmRef) -> Result<&'a mut VmRecord, ProvisionerError> {
    inv.folders
        .values_mut()
        .flat_map(|vms| vms.iter_mut())
        .find(|r| r.vm.moid == vm.moid)
        .ok_or_else(|| DomainError::Rejected(format!("no VM with id {}", vm.moid)).into())
}

#[async_trait]
impl Session for InMemorySession {
    async fn networks(&self) -> Result<HashMap<String, NetworkRef>, ProvisionerError> {
        let inv = self.enter(Call::Networks)?;
        Ok(inv.networks.clone())
    }

    async fn folder(&self, owner: &str) -> Result<Vec<VmRef>, ProvisionerError> {
        let inv = self.enter(Call::Folder(owner.to_string()))?;
        Ok(inv
            .folders
            .get(owner)
            .map(|vms| vms.iter().map(|r| r.vm.clone()).collect())
            .unwrap_or_default())
    }

    async fn vm_info(&self, vm: &VmRef) -> Result<VmInfo, ProvisionerError> {
        let mut inv = self.enter(Call::VmInfo(vm.name.clone()))?;
        let record = find(&mut inv, vm)?;

        let meta = match &record.meta {
            Some(meta) => serde_json::to_value(meta)?,
            None => json!({}),
        };
        let info = json!({
            "moid": record.vm.moid,
            "state": record.power.as_str(),
            "networks": record.networks,
            "meta": meta,
        });
        match info {
            Value::Object(map) => Ok(map),
            _ => Err(ProvisionerError::BackendError("malformed VM info".to_string())),
        }
    }

    async fn meta(&self, vm: &VmRef) -> Result<Option<ApplianceMeta>, ProvisionerError> {
        let mut inv = self.enter(Call::Meta(vm.name.clone()))?;
        Ok(find(&mut inv, vm)?.meta.clone())
    }

    async fn set_meta(&self, vm: &VmRef, meta: &ApplianceMeta) -> Result<(), ProvisionerError> {
        let mut inv = self.enter(Call::SetMeta(vm.name.clone()))?;
        find(&mut inv, vm)?.meta = Some(meta.clone());
        Ok(())
    }

    async fn power(&self, vm: &VmRef, state: PowerState) -> Result<(), ProvisionerError> {
        let mut inv = self.enter(Call::Power(vm.name.clone(), state))?;
        let record = find(&mut inv, vm)?;
        record.power = match state {
            PowerState::Restart => PowerState::On,
            other => other,
        };
        Ok(())
    }

    async fn deploy(&self, spec: &DeploySpec) -> Result<VmRef, ProvisionerError> {
        let mut inv = self.enter(Call::Deploy(spec.name.clone()))?;

        let taken = inv
            .folders
            .get(&spec.folder)
            .is_some_and(|vms| vms.iter().any(|r| r.vm.name == spec.name));
        if taken {
            return Err(DomainError::Rejected(format!("{} already exists", spec.name)).into());
        }

        inv.next_moid += 1;
        let vm = VmRef {
            name: spec.name.clone(),
            moid: format!("vm-{}", inv.next_moid),
        };
        let networks = spec.network_map.values().map(|n| n.name.clone()).collect();
        debug!("Deployed {} from {}", spec.name, spec.ova_path.display());

        inv.folders.entry(spec.folder.clone()).or_default().push(VmRecord {
            vm: vm.clone(),
            power: PowerState::On,
            meta: None,
            networks,
        });
        Ok(vm)
    }

    async fn destroy(&self, vm: &VmRef) -> Result<(), ProvisionerError> {
        let mut inv = self.enter(Call::Destroy(vm.name.clone()))?;
        find(&mut inv, vm)?;
        for vms in inv.folders.values_mut() {
            vms.retain(|r| r.vm.moid != vm.moid);
        }
        Ok(())
    }

    async fn close(&self) {
        let mut inv = self.inventory.lock().unwrap_or_else(|e| e.into_inner());
        inv.calls.push(Call::Close);
        inv.open_sessions = inv.open_sessions.saturating_sub(1);
    }
}
