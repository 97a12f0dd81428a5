//! Packaged appliance images (OVA archives)

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ProvisionerError;

static NETWORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(?:ovf:)?Network\s+ovf:name\s*=\s*"([^"]+)""#).expect("valid network pattern")
});

/// An opened and validated OVA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ova {
    path: PathBuf,
    descriptor: String,
    networks: Vec<String>,
}

impl Ova {
    /// Open the archive at `path` and read its OVF descriptor.
    ///
    /// Blocking; call from `spawn_blocking` on the async side.
    pub fn open(path: &Path) -> Result<Self, ProvisionerError> {
        let file = std::fs::File::open(path)?;
        let mut archive = tar::Archive::new(file);

        for entry in archive.entries()? {
            let mut entry = entry?;
            let name = entry.path()?.to_string_lossy().into_owned();
            if !name.ends_with(".ovf") {
                continue;
            }

            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            return Ok(Self {
                path: path.to_path_buf(),
                descriptor: name,
                networks: parse_networks(&xml),
            });
        }

        Err(ProvisionerError::CatalogError(format!(
            "{} has no OVF descriptor",
            path.display()
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the `.ovf` entry inside the archive
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Networks the image declares, in descriptor order
    pub fn networks(&self) -> &[String] {
        &self.networks
    }
}

fn parse_networks(xml: &str) -> Vec<String> {
    let mut networks: Vec<String> = Vec::new();
    for caps in NETWORK_RE.captures_iter(xml) {
        let name = caps[1].to_string();
        if !networks.contains(&name) {
            networks.push(name);
        }
    }
    networks
}
