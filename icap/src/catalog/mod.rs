//! Version catalog
//!
//! Maps between the version strings callers use and the packaged image files
//! stored on disk. Every artifact is named `ICAP-<version>.ova`.

pub mod ova;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{DomainError, ProvisionerError};

pub use ova::Ova;

/// Fixed leading segment of every artifact name
pub const ARTIFACT_PREFIX: &str = "ICAP";

/// Extension of every artifact name
pub const ARTIFACT_EXT: &str = "ova";

/// Artifact file name for `version`
pub fn to_artifact_name(version: &str) -> String {
    format!("{}-{}.{}", ARTIFACT_PREFIX, version, ARTIFACT_EXT)
}

/// Version encoded in `artifact_name`, or `None` if the name does not follow
/// the naming convention
pub fn to_version(artifact_name: &str) -> Option<String> {
    let version = artifact_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(ARTIFACT_EXT)?
        .strip_suffix('.')?;
    is_valid_version(version).then(|| version.to_string())
}

fn is_valid_version(version: &str) -> bool {
    !version.is_empty() && !version.contains(['/', '\\']) && version != "." && version != ".."
}

/// The set of deployable images on disk
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    images_dir: PathBuf,
}

impl VersionCatalog {
    pub fn new(images_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// List every version with an artifact on disk, sorted.
    ///
    /// An unreadable image directory is a deployment problem, not a bad
    /// request, so it surfaces as `CatalogError` rather than a domain error.
    pub async fn list_versions(&self) -> Result<Vec<String>, ProvisionerError> {
        let mut entries = tokio::fs::read_dir(&self.images_dir).await.map_err(|e| {
            ProvisionerError::CatalogError(format!(
                "unable to read {}: {}",
                self.images_dir.display(),
                e
            ))
        })?;

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            match to_version(file_name) {
                Some(version) if entry.file_type().await?.is_file() => versions.push(version),
                _ => debug!("Skipping non-image entry {}", file_name),
            }
        }

        versions.sort();
        Ok(versions)
    }

    /// Path of the artifact backing `version`
    pub fn artifact_path(&self, version: &str) -> Result<PathBuf, DomainError> {
        if !is_valid_version(version) {
            return Err(DomainError::InvalidImage(version.to_string()));
        }
        Ok(self.images_dir.join(to_artifact_name(version)))
    }

    /// Open and validate the artifact for `version`
    pub async fn open(&self, version: &str) -> Result<Ova, ProvisionerError> {
        let path = self.artifact_path(version)?;
        // only regular files are artifacts, matching list_versions
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(DomainError::InvalidImage(version.to_string()).into()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DomainError::InvalidImage(version.to_string()).into())
            }
            Err(e) => return Err(e.into()),
        }

        let opened = tokio::task::spawn_blocking(move || Ova::open(&path))
            .await
            .map_err(|e| ProvisionerError::CatalogError(e.to_string()))?;

        match opened {
            Err(ProvisionerError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DomainError::InvalidImage(version.to_string()).into())
            }
            other => other,
        }
    }
}
