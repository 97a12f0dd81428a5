//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::errors::ProvisionerError;
use crate::storage::settings::{Settings, TokenSettings};
use crate::workers::pool;

/// Base URL selecting the in-memory backend
pub const MEMORY_BACKEND_URL: &str = "memory://";

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Virtualization backend
    pub backend: BackendOptions,

    /// Directory holding the appliance images
    pub images_dir: PathBuf,

    /// Prefix of status links handed back to callers
    pub vlab_url: String,

    /// Worker pool options
    pub workers: pool::Options,

    /// Maximum number of queued tasks
    pub queue_capacity: usize,

    /// Maximum number of task results kept
    pub results_capacity: usize,

    /// Serialize create/delete tasks per appliance name
    pub serialize_by_name: bool,

    /// Accepted caller token versions
    pub token: TokenSettings,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerOptions::default(),
            backend: BackendOptions::default(),
            images_dir: PathBuf::from("/images"),
            vlab_url: "https://localhost".to_string(),
            workers: pool::Options::default(),
            queue_capacity: 256,
            results_capacity: 1000,
            serialize_by_name: true,
            token: TokenSettings::default(),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self, ProvisionerError> {
        let timeout = Duration::from_secs(settings.backend.timeout_secs);
        let options = Self {
            lifecycle: LifecycleOptions {
                // let an in-flight backend call run out before giving up
                max_shutdown_delay: timeout + LifecycleOptions::default().max_shutdown_delay,
            },
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            backend: BackendOptions {
                base_url: settings.backend.base_url.clone(),
                username: settings.backend.username.clone(),
                password: settings.backend.password.clone(),
                timeout,
            },
            images_dir: settings.catalog.images_dir.clone(),
            vlab_url: settings.vlab_url.clone(),
            workers: pool::Options {
                count: settings.workers.count,
            },
            queue_capacity: settings.workers.queue_capacity,
            results_capacity: settings.results_capacity,
            serialize_by_name: settings.serialize_by_name,
            token: settings.token,
        };
        options.validate()?;
        Ok(options)
    }

    /// Reject configurations the service cannot run correctly with
    pub fn validate(&self) -> Result<(), ProvisionerError> {
        if self.backend.base_url.trim().is_empty() {
            return Err(ProvisionerError::ConfigError(format!(
                "backend.base_url is not set (use INF_VCENTER_SERVER, or {} for the in-memory backend)",
                MEMORY_BACKEND_URL
            )));
        }

        // every queued or running task holds a pending record that must not be evicted
        let in_flight = self.queue_capacity + self.workers.count.max(1);
        if self.results_capacity <= in_flight {
            return Err(ProvisionerError::ConfigError(format!(
                "results_capacity ({}) must exceed queue_capacity plus workers ({})",
                self.results_capacity, in_flight
            )));
        }
        Ok(())
    }
}

/// Lifecycle options for the service
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Virtualization backend options
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Gateway base URL, or [`MEMORY_BACKEND_URL`]
    pub base_url: String,

    pub username: String,

    pub password: SecretString,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: SecretString::from(String::new()),
            timeout: Duration::from_secs(600),
        }
    }
}
