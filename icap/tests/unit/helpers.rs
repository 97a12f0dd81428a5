//! Shared fixtures

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use vlab_icap::appliance::ApplianceManager;
use vlab_icap::backend::memory::InMemoryBackend;
use vlab_icap::catalog::{to_artifact_name, VersionCatalog};
use vlab_icap::tasks::TaskRunner;

/// Write a minimal OVA for `version` declaring `networks`
pub fn write_ova(dir: &Path, version: &str, networks: &[&str]) -> PathBuf {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<Envelope>\n<NetworkSection>\n");
    for network in networks {
        xml.push_str(&format!("<Network ovf:name=\"{}\"/>\n", network));
    }
    xml.push_str("</NetworkSection>\n</Envelope>\n");

    let path = dir.join(to_artifact_name(version));
    let mut builder = tar::Builder::new(File::create(&path).unwrap());

    let mut header = tar::Header::new_gnu();
    header.set_size(xml.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "icap.ovf", xml.as_bytes())
        .unwrap();
    builder.finish().unwrap();
    path
}

/// An image directory, an in-memory backend and a runner wired to both
pub struct Fixture {
    pub images: TempDir,
    pub backend: InMemoryBackend,
    pub runner: Arc<TaskRunner>,
}

impl Fixture {
    pub fn new(versions: &[&str], networks: &[&str]) -> Self {
        let images = TempDir::new().unwrap();
        for version in versions {
            write_ova(images.path(), version, &["VM Network"]);
        }

        let backend = InMemoryBackend::new();
        for network in networks {
            backend.add_network(network);
        }

        let manager = ApplianceManager::new(VersionCatalog::new(images.path()));
        let runner = TaskRunner::new(Arc::new(backend.clone()), manager).with_name_locks();

        Self {
            images,
            backend,
            runner: Arc::new(runner),
        }
    }

    pub fn manager(&self) -> ApplianceManager {
        ApplianceManager::new(VersionCatalog::new(self.images.path()))
    }
}
