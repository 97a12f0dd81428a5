//! ICAP appliance lifecycle
//!
//! Show, create and delete ICAP instances inside a user's inventory folder.
//! Folders are shared with other appliance types, so every lookup filters on
//! the component tag before matching names.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::backend::{ApplianceMeta, DeploySpec, PowerState, Session, VmRef};
use crate::catalog::VersionCatalog;
use crate::errors::{DomainError, ProvisionerError};
use crate::network::resolve_network;
use crate::utils::unix_timestamp;

/// Component tag identifying ICAP appliances
pub const COMPONENT: &str = "ICAP";

/// Lifecycle manager for ICAP appliances
#[derive(Debug, Clone)]
pub struct ApplianceManager {
    catalog: VersionCatalog,
}

impl ApplianceManager {
    pub fn new(catalog: VersionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    /// Info for every ICAP instance `username` owns, keyed by name
    pub async fn show(
        &self,
        session: &dyn Session,
        username: &str,
    ) -> Result<Map<String, Value>, ProvisionerError> {
        let mut appliances = Map::new();
        for vm in session.folder(username).await? {
            if !is_managed(session, &vm).await? {
                continue;
            }
            let info = session.vm_info(&vm).await?;
            appliances.insert(vm.name, Value::Object(info));
        }
        Ok(appliances)
    }

    /// Deploy a new ICAP instance and return its info keyed by name.
    ///
    /// The network and image are both validated before anything is deployed.
    /// A deploy that fails part way is not rolled back.
    pub async fn create(
        &self,
        session: &dyn Session,
        username: &str,
        name: &str,
        version: &str,
        network: &str,
    ) -> Result<Map<String, Value>, ProvisionerError> {
        let networks = session.networks().await?;
        let network = resolve_network(&networks, network)?;
        let ova = self.catalog.open(version).await?;

        // every network the image declares lands on the requested one
        let network_map: BTreeMap<_, _> = if ova.networks().is_empty() {
            BTreeMap::from([(network.name.clone(), network.clone())])
        } else {
            ova.networks()
                .iter()
                .map(|n| (n.clone(), network.clone()))
                .collect()
        };

        let spec = DeploySpec {
            folder: username.to_string(),
            name: name.to_string(),
            ova_path: ova.path().to_path_buf(),
            network_map,
        };
        info!("Deploying {} from {}", name, ova.path().display());
        let vm = session.deploy(&spec).await?;

        let meta = ApplianceMeta {
            component: COMPONENT.to_string(),
            created: unix_timestamp(),
            version: version.to_string(),
            generation: 1,
            configured: false,
        };
        session.set_meta(&vm, &meta).await?;

        let info = session.vm_info(&vm).await?;
        let mut created = Map::new();
        created.insert(vm.name, Value::Object(info));
        Ok(created)
    }

    /// Power off and remove the ICAP instance called `name`
    pub async fn delete(
        &self,
        session: &dyn Session,
        username: &str,
        name: &str,
    ) -> Result<(), ProvisionerError> {
        for vm in session.folder(username).await? {
            if vm.name != name || !is_managed(session, &vm).await? {
                continue;
            }
            info!("Destroying {}", name);
            session.power(&vm, PowerState::Off).await?;
            session.destroy(&vm).await?;
            return Ok(());
        }
        Err(DomainError::ObjectNotFound(name.to_string()).into())
    }

    /// Versions that can be deployed
    pub async fn list_images(&self) -> Result<Vec<String>, ProvisionerError> {
        self.catalog.list_versions().await
    }
}

async fn is_managed(session: &dyn Session, vm: &VmRef) -> Result<bool, ProvisionerError> {
    let managed = session
        .meta(vm)
        .await?
        .is_some_and(|meta| meta.component == COMPONENT);
    if !managed {
        debug!("Skipping {}, not an {} appliance", vm.name, COMPONENT);
    }
    Ok(managed)
}
