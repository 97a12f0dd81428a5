//! Version catalog tests

use std::fs;

use tempfile::TempDir;
use vlab_icap::catalog::{to_artifact_name, to_version, VersionCatalog};
use vlab_icap::errors::{DomainError, ProvisionerError};

use crate::helpers::write_ova;

#[test]
fn test_version_names_round_trip() {
    for version in ["1.0.0", "2.1", "10.0.3-beta", "latest", "v1_2"] {
        assert_eq!(to_version(&to_artifact_name(version)).as_deref(), Some(version));
    }
}

#[test]
fn test_foreign_names_have_no_version() {
    assert_eq!(to_version("ICAP.ova"), None);
    assert_eq!(to_version("ICAP-.ova"), None);
    assert_eq!(to_version("OneFS-1.0.0.ova"), None);
    assert_eq!(to_version("ICAP-1.0.0.iso"), None);
    assert_eq!(to_version("README"), None);
}

#[tokio::test]
async fn test_list_versions_only_matching_artifacts() {
    let images = TempDir::new().unwrap();
    write_ova(images.path(), "1.0.0", &[]);
    write_ova(images.path(), "1.1.0", &[]);
    fs::write(images.path().join("notes.txt"), "not an image").unwrap();
    fs::write(images.path().join("OneFS-8.0.ova"), "other component").unwrap();
    fs::create_dir(images.path().join("ICAP-2.0.0.ova")).unwrap();

    let catalog = VersionCatalog::new(images.path());
    let versions = catalog.list_versions().await.unwrap();

    assert_eq!(versions, vec!["1.0.0".to_string(), "1.1.0".to_string()]);
}

#[tokio::test]
async fn test_list_versions_unreadable_dir_is_a_fault() {
    let images = TempDir::new().unwrap();
    let catalog = VersionCatalog::new(images.path().join("missing"));

    let err = catalog.list_versions().await.unwrap_err();
    assert!(matches!(err, ProvisionerError::CatalogError(_)));
    assert!(err.as_domain().is_none());
}

#[tokio::test]
async fn test_open_directory_artifact_is_invalid_image() {
    let images = TempDir::new().unwrap();
    fs::create_dir(images.path().join("ICAP-2.0.0.ova")).unwrap();
    let catalog = VersionCatalog::new(images.path());

    let err = catalog.open("2.0.0").await.unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&DomainError::InvalidImage("2.0.0".to_string()))
    );
}

#[tokio::test]
async fn test_open_missing_version_is_invalid_image() {
    let images = TempDir::new().unwrap();
    let catalog = VersionCatalog::new(images.path());

    let err = catalog.open("9.9.9").await.unwrap_err();
    assert_eq!(
        err.as_domain(),
        Some(&DomainError::InvalidImage("9.9.9".to_string()))
    );
}

#[tokio::test]
async fn test_open_rejects_path_traversal() {
    let images = TempDir::new().unwrap();
    let catalog = VersionCatalog::new(images.path());

    let err = catalog.open("../../etc/passwd").await.unwrap_err();
    assert!(matches!(err.as_domain(), Some(DomainError::InvalidImage(_))));
}

#[tokio::test]
async fn test_open_reads_declared_networks() {
    let images = TempDir::new().unwrap();
    write_ova(images.path(), "1.0.0", &["VM Network", "Backend"]);

    let ova = VersionCatalog::new(images.path()).open("1.0.0").await.unwrap();
    assert_eq!(ova.descriptor(), "icap.ovf");
    assert_eq!(ova.networks(), ["VM Network".to_string(), "Backend".to_string()]);
}
