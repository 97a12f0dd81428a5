//! Virtualization gateway backend
//!
//! Speaks the gateway's REST API. A session is a login on the gateway; it is
//! logged out again when the task closes it.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::backend::{
    ApplianceMeta, Backend, DeploySpec, NetworkRef, PowerState, Session, VmInfo, VmRef,
};
use crate::errors::{DomainError, ProvisionerError};
use crate::http::client::HttpClient;
use openapi_client::models::{
    DeployRequest, DeployResponse, FolderResponse, LoginRequest, LoginResponse,
    NetworkListResponse, PowerRequest, VmMeta,
};

/// Backend backed by the gateway REST API
pub struct HttpBackend {
    client: HttpClient,
    username: String,
    password: SecretString,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        username: String,
        password: SecretString,
        timeout: Duration,
    ) -> Result<Self, ProvisionerError> {
        Ok(Self {
            client: HttpClient::new(base_url, timeout)?,
            username,
            password,
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn connect(&self) -> Result<Box<dyn Session>, ProvisionerError> {
        let login = LoginRequest {
            username: self.username.clone(),
            password: self.password.expose_secret().to_string(),
        };
        let response: LoginResponse = self
            .client
            .send_json(Method::POST, &["session"], None, Some(&login))
            .await
            .map_err(|e| match e {
                // a refused login is a deployment problem, never the caller's
                ProvisionerError::Domain(d) => ProvisionerError::BackendError(d.to_string()),
                other => other,
            })?;

        debug!("Opened gateway session");
        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            session_id: response.session_id,
        }))
    }
}

struct HttpSession {
    client: HttpClient,
    session_id: String,
}

impl HttpSession {
    fn sid(&self) -> Option<&str> {
        Some(&self.session_id)
    }
}

/// Treat a gateway 404 as "nothing there"
fn absent_as_none<T>(result: Result<T, ProvisionerError>) -> Result<Option<T>, ProvisionerError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ProvisionerError::Domain(DomainError::Rejected(_))) => Ok(None),
        Err(e) => Err(e),
    }
}

impl From<VmMeta> for ApplianceMeta {
    fn from(meta: VmMeta) -> Self {
        Self {
            component: meta.component,
            created: meta.created,
            version: meta.version,
            generation: meta.generation,
            configured: meta.configured,
        }
    }
}

impl From<&ApplianceMeta> for VmMeta {
    fn from(meta: &ApplianceMeta) -> Self {
        Self {
            component: meta.component.clone(),
            created: meta.created,
            version: meta.version.clone(),
            generation: meta.generation,
            configured: meta.configured,
        }
    }
}

#[async_trait]
impl Session for HttpSession {
    async fn networks(&self) -> Result<HashMap<String, NetworkRef>, ProvisionerError> {
        let response: NetworkListResponse = self
            .client
            .send_json(Method::GET, &["networks"], self.sid(), None::<&()>)
            .await?;

        Ok(response
            .networks
            .into_iter()
            .map(|n| {
                let net = NetworkRef {
                    name: n.name,
                    moid: n.moid,
                };
                (net.name.clone(), net)
            })
            .collect())
    }

    async fn folder(&self, owner: &str) -> Result<Vec<VmRef>, ProvisionerError> {
        let response: Option<FolderResponse> = absent_as_none(
            self.client
                .send_json(Method::GET, &["folders", owner], self.sid(), None::<&()>)
                .await,
        )?;

        Ok(response
            .map(|f| f.vms)
            .unwrap_or_default()
            .into_iter()
            .map(|vm| VmRef {
                name: vm.name,
                moid: vm.moid,
            })
            .collect())
    }

    async fn vm_info(&self, vm: &VmRef) -> Result<VmInfo, ProvisionerError> {
        self.client
            .send_json(Method::GET, &["vms", &vm.moid], self.sid(), None::<&()>)
            .await
    }

    async fn meta(&self, vm: &VmRef) -> Result<Option<ApplianceMeta>, ProvisionerError> {
        let meta: Option<VmMeta> = absent_as_none(
            self.client
                .send_json(Method::GET, &["vms", &vm.moid, "meta"], self.sid(), None::<&()>)
                .await,
        )?;
        Ok(meta.map(ApplianceMeta::from))
    }

    async fn set_meta(&self, vm: &VmRef, meta: &ApplianceMeta) -> Result<(), ProvisionerError> {
        self.client
            .send(
                Method::PUT,
                &["vms", &vm.moid, "meta"],
                self.sid(),
                Some(&VmMeta::from(meta)),
            )
            .await
    }

    async fn power(&self, vm: &VmRef, state: PowerState) -> Result<(), ProvisionerError> {
        let body = PowerRequest {
            state: state.as_str().to_string(),
        };
        self.client
            .send(Method::PUT, &["vms", &vm.moid, "power"], self.sid(), Some(&body))
            .await
    }

    async fn deploy(&self, spec: &DeploySpec) -> Result<VmRef, ProvisionerError> {
        let network_map: BTreeMap<String, String> = spec
            .network_map
            .iter()
            .map(|(image_net, net)| (image_net.clone(), net.moid.clone()))
            .collect();
        let body = DeployRequest {
            folder: spec.folder.clone(),
            name: spec.name.clone(),
            ova_path: spec.ova_path.to_string_lossy().into_owned(),
            network_map,
            power_on: true,
        };

        let response: DeployResponse = self
            .client
            .send_json(Method::POST, &["deployments"], self.sid(), Some(&body))
            .await?;
        Ok(VmRef {
            name: response.vm.name,
            moid: response.vm.moid,
        })
    }

    async fn destroy(&self, vm: &VmRef) -> Result<(), ProvisionerError> {
        self.client
            .send(Method::DELETE, &["vms", &vm.moid], self.sid(), None::<&()>)
            .await
    }

    async fn close(&self) {
        let result = self
            .client
            .send(Method::DELETE, &["session"], self.sid(), None::<&()>)
            .await;
        if let Err(e) = result {
            warn!("Failed to close gateway session: {}", e);
        }
    }
}
