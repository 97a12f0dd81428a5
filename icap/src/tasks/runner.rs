//! Task execution

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::appliance::ApplianceManager;
use crate::backend::{Backend, Session};
use crate::errors::ProvisionerError;
use crate::locks::NameLocks;
use crate::tasks::envelope::{self, TaskEnvelope};
use crate::tasks::Operation;

/// Runs lifecycle operations against the backend
pub struct TaskRunner {
    backend: Arc<dyn Backend>,
    manager: ApplianceManager,
    locks: Option<NameLocks>,
}

impl TaskRunner {
    pub fn new(backend: Arc<dyn Backend>, manager: ApplianceManager) -> Self {
        Self {
            backend,
            manager,
            locks: None,
        }
    }

    /// Serialize create/delete tasks per appliance name
    pub fn with_name_locks(mut self) -> Self {
        self.locks = Some(NameLocks::new());
        self
    }

    /// Run `operation` and wrap its outcome.
    ///
    /// Each backend operation gets its own session, closed again on every
    /// path out of here, including failures.
    pub async fn run(&self, operation: &Operation) -> Result<TaskEnvelope, ProvisionerError> {
        if let Operation::Image = operation {
            return envelope::wrap(self.images().await);
        }

        let _guard = match (&self.locks, operation.target()) {
            (Some(locks), Some((owner, name))) => Some(locks.acquire(owner, name).await),
            _ => None,
        };

        let session = self.backend.connect().await?;
        let result = self.run_in_session(session.as_ref(), operation).await;
        session.close().await;
        envelope::wrap(result)
    }

    async fn run_in_session(
        &self,
        session: &dyn Session,
        operation: &Operation,
    ) -> Result<Map<String, Value>, ProvisionerError> {
        match operation {
            Operation::Show { username } => self.manager.show(session, username).await,
            Operation::Create {
                username,
                name,
                version,
                network,
            } => {
                self.manager
                    .create(session, username, name, version, network)
                    .await
            }
            Operation::Delete { username, name } => {
                self.manager.delete(session, username, name).await?;
                Ok(Map::new())
            }
            Operation::Image => self.images().await,
        }
    }

    async fn images(&self) -> Result<Map<String, Value>, ProvisionerError> {
        let images = self.manager.list_images().await?;
        let mut content = Map::new();
        content.insert("image".to_string(), Value::from(images));
        Ok(content)
    }
}
