//! Integration tests for locating existing binaries on a search path.
//!
//! Fixtures are shell scripts in temp directories, so these tests exercise
//! the real probe subprocess path. They are written to pass regardless of
//! what is actually installed on the host.

#![cfg(unix)]

use binsource::{locate::ExistingBinary, InstallError, Installer, Product, Version, VersionSpec};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

fn demo_product() -> Product {
    Product::new("demo", "demo", "--version", r"demo v(\d+\.\d+\.\d+)")
}

fn write_fake_tool(dir: &Path, name: &str, banner: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh\necho '{banner}'").unwrap();
    drop(file);
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_locates_exact_version() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_fake_tool(dir.path(), "demo", "demo v1.3.7");

    let source = ExistingBinary::matching(demo_product(), VersionSpec::parse("1.3.7").unwrap())
        .in_dirs(vec![dir.path().to_path_buf()]);

    let mut installer = Installer::new();
    let exec_path = installer.ensure(&[source.into()]).await.unwrap();
    assert_eq!(exec_path, tool);

    // The accepted binary self-reports exactly the requested version.
    let output = std::process::Command::new(&exec_path).output().unwrap();
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    assert_eq!(
        demo_product().parse_version_output(&text),
        Some(Version::new(1, 3, 7))
    );

    // Nothing was created, so nothing is tracked and remove is a no-op.
    assert!(installer.ledger().is_empty());
    installer.remove().await.unwrap();
    assert!(exec_path.exists());
}

#[tokio::test]
async fn test_unsatisfying_version_is_not_found_not_execution() {
    let dir = tempfile::tempdir().unwrap();
    write_fake_tool(dir.path(), "demo", "demo v0.9.0");

    let source = ExistingBinary::matching(demo_product(), VersionSpec::parse("~> 1.0").unwrap())
        .in_dirs(vec![dir.path().to_path_buf()]);

    let result = source_resolve(source).await;
    assert!(matches!(result, Err(InstallError::NotFound { .. })));
}

#[tokio::test]
async fn test_non_executable_file_is_not_matched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo");
    std::fs::write(&path, "#!/bin/sh\necho 'demo v1.0.0'\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let source =
        ExistingBinary::any(demo_product()).in_dirs(vec![dir.path().to_path_buf()]);
    let result = source_resolve(source).await;
    assert!(matches!(result, Err(InstallError::NotFound { .. })));
}

#[tokio::test]
async fn test_search_order_is_caller_order() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let expected = write_fake_tool(first.path(), "demo", "demo v1.1.0");
    write_fake_tool(second.path(), "demo", "demo v1.2.0");

    // Without a constraint the first structural match wins, even though a
    // newer one exists further down the list.
    let source = ExistingBinary::any(demo_product()).in_dirs(vec![
        first.path().to_path_buf(),
        second.path().to_path_buf(),
    ]);
    let result = source_resolve(source).await.unwrap();
    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_default_search_path_finds_common_tool() {
    // `sh` exists on any Unix PATH; no constraint, so it is never probed.
    let product = Product::new("sh", "sh", "--version", r"(\d+\.\d+\.\d+)");
    let source = ExistingBinary::any(product);
    let result = source_resolve(source).await.unwrap();
    assert!(result.exists());
}

async fn source_resolve(source: ExistingBinary) -> Result<PathBuf, InstallError> {
    let mut installer = Installer::new();
    installer.ensure(&[source.into()]).await.map_err(|e| {
        // Unwrap single-source aggregates back to the underlying error for
        // easier assertions.
        match e {
            InstallError::Aggregate(mut aggregate) if aggregate.failures.len() == 1 => {
                aggregate.failures.remove(0).1
            }
            other => other,
        }
    })
}
