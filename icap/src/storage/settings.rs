//! Settings file management

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::ProvisionerError;
use crate::logs::LogLevel;

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/vlab/icap/settings.json";

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Also write logs to a daily rolling file in this directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerSettings,

    /// Public URL prefix used when building task status links
    #[serde(default = "default_vlab_url")]
    pub vlab_url: String,

    /// Virtualization gateway
    #[serde(default)]
    pub backend: BackendSettings,

    /// Packaged image storage
    #[serde(default)]
    pub catalog: CatalogSettings,

    /// Worker pool
    #[serde(default)]
    pub workers: WorkerSettings,

    /// Completed task records kept for polling
    #[serde(default = "default_results_capacity")]
    pub results_capacity: usize,

    /// Serialize create/delete tasks that target the same appliance name
    #[serde(default = "default_true")]
    pub serialize_by_name: bool,

    /// Accepted caller token versions
    #[serde(default)]
    pub token: TokenSettings,
}

fn default_true() -> bool {
    true
}

fn default_vlab_url() -> String {
    "https://localhost".to_string()
}

fn default_results_capacity() -> usize {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            vlab_url: default_vlab_url(),
            backend: BackendSettings::default(),
            catalog: CatalogSettings::default(),
            workers: WorkerSettings::default(),
            results_capacity: default_results_capacity(),
            serialize_by_name: true,
            token: TokenSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`, falling back to defaults when the file is
    /// missing. Environment overrides are applied last.
    pub async fn load(path: &Path) -> Result<Self, ProvisionerError> {
        let settings = match tokio::fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                ProvisionerError::ConfigError(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No settings file at {}, using defaults", path.display());
                Settings::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!("Loaded settings from {}", path.display());
        Ok(settings.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply the environment overrides the deployment scripts set
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("VLAB_URL") {
            self.vlab_url = url;
        }
        if let Some(server) = lookup("INF_VCENTER_SERVER") {
            self.backend.base_url = server;
        }
        if let Some(level) = lookup("ICAP_LOG_LEVEL") {
            match level.parse() {
                Ok(level) => self.log_level = level,
                Err(e) => warn!("Ignoring ICAP_LOG_LEVEL: {}", e),
            }
        }
        self
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Virtualization gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Gateway base URL, or `memory://` for the in-process backend. Required.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default = "empty_secret", skip_serializing)]
    pub password: SecretString,

    /// Per-request timeout
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

fn empty_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_backend_timeout() -> u64 {
    600
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: empty_secret(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Packaged image storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("/images")
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
        }
    }
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    #[serde(default = "default_worker_count")]
    pub count: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    256
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Caller token settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenSettings {
    #[serde(default = "default_token_version")]
    pub min_version: u32,

    #[serde(default = "default_token_version")]
    pub max_version: u32,
}

fn default_token_version() -> u32 {
    2
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            min_version: default_token_version(),
            max_version: default_token_version(),
        }
    }
}
