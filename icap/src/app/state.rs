//! Application state management

use std::sync::Arc;

use tracing::info;

use crate::app::options::{AppOptions, BackendOptions, MEMORY_BACKEND_URL};
use crate::appliance::ApplianceManager;
use crate::backend::memory::InMemoryBackend;
use crate::backend::Backend;
use crate::cache::results::ResultStore;
use crate::catalog::VersionCatalog;
use crate::dispatch::queue::{local_queue, LocalDispatcher, TaskReceiver};
use crate::errors::ProvisionerError;
use crate::http::gateway::HttpBackend;
use crate::tasks::TaskRunner;

/// Main application state
pub struct AppState {
    /// Executes lifecycle operations for the workers
    pub runner: Arc<TaskRunner>,

    /// Task states and envelopes
    pub results: Arc<ResultStore>,

    /// Submitting end of the task queue
    pub dispatcher: Arc<LocalDispatcher>,

    /// Receiving end of the task queue
    pub receiver: TaskReceiver,
}

impl AppState {
    /// Initialize application state
    pub fn init(options: &AppOptions) -> Result<Self, ProvisionerError> {
        info!("Initializing application state...");

        options.validate()?;
        let backend = build_backend(&options.backend)?;
        Ok(Self::with_backend(options, backend))
    }

    /// Initialize application state around an existing backend
    pub fn with_backend(options: &AppOptions, backend: Arc<dyn Backend>) -> Self {
        let manager = ApplianceManager::new(VersionCatalog::new(options.images_dir.clone()));
        let mut runner = TaskRunner::new(backend, manager);
        if options.serialize_by_name {
            runner = runner.with_name_locks();
        }

        let results = Arc::new(ResultStore::new(options.results_capacity));
        let (dispatcher, receiver) = local_queue(options.queue_capacity, results.clone());

        Self {
            runner: Arc::new(runner),
            results,
            dispatcher: Arc::new(dispatcher),
            receiver,
        }
    }
}

/// Pick the backend named by `options.base_url`
pub fn build_backend(options: &BackendOptions) -> Result<Arc<dyn Backend>, ProvisionerError> {
    if options.base_url.trim().is_empty() {
        return Err(ProvisionerError::ConfigError(
            "no virtualization backend configured".to_string(),
        ));
    }
    if options.base_url == MEMORY_BACKEND_URL {
        info!("Using in-memory backend");
        return Ok(Arc::new(InMemoryBackend::new()));
    }

    info!("Using gateway backend at {}", options.base_url);
    let backend = HttpBackend::new(
        &options.base_url,
        options.username.clone(),
        options.password.clone(),
        options.timeout,
    )?;
    Ok(Arc::new(backend))
}
