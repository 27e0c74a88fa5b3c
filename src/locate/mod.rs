//! Locating an already-installed binary on a search path.
//!
//! The locate source never downloads or builds anything: it walks an
//! ordered list of directories (the process `PATH` by default) looking for
//! the product's executable, optionally enforcing a version constraint by
//! probing each candidate. Because it only finds pre-existing system state,
//! its results are never tracked for removal.

mod probe;

use crate::error::InstallError;
use crate::product::Product;
use crate::source::InstallResult;
use crate::version_spec::VersionSpec;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Default timeout for probing a candidate's version.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A source that resolves to an executable already present on disk.
///
/// # Example
///
/// ```rust,no_run
/// use binsource::{locate::ExistingBinary, product, Source, VersionSpec};
///
/// // Any terraform on PATH:
/// let any = ExistingBinary::any(product::terraform());
///
/// // Only a terraform in the 1.x series:
/// let constrained = ExistingBinary::matching(
///     product::terraform(),
///     VersionSpec::parse("~> 1.0").unwrap(),
/// );
/// let source: Source = constrained.into();
/// ```
#[derive(Debug, Clone)]
pub struct ExistingBinary {
    /// The product whose executable to look for.
    pub product: Product,

    /// Accept a candidate only if its self-reported version satisfies this.
    /// `None` accepts the first structural match without probing.
    pub constraints: Option<VersionSpec>,

    /// Directories to search, in order. `None` means the process-wide
    /// executable search path.
    pub search_dirs: Option<Vec<PathBuf>>,

    /// Timeout for each candidate's version probe.
    pub probe_timeout: Duration,
}

impl ExistingBinary {
    /// Accept any version of the product found on the search path.
    pub fn any(product: Product) -> Self {
        Self {
            product,
            constraints: None,
            search_dirs: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Accept only versions satisfying `constraints`.
    pub fn matching(product: Product, constraints: VersionSpec) -> Self {
        Self {
            product,
            constraints: Some(constraints),
            search_dirs: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Restrict the search to an explicit list of directories.
    pub fn in_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = Some(dirs);
        self
    }

    pub(crate) fn label(&self) -> String {
        match &self.constraints {
            Some(spec) => format!("locate {} ({spec})", self.product.name),
            None => format!("locate {}", self.product.name),
        }
    }

    /// Walk the search directories in order and return the first acceptable
    /// candidate.
    ///
    /// A candidate whose version fails the constraint is skipped; a probe
    /// that cannot run at all fails the resolution with
    /// [`InstallError::Execution`]. Exhausting every directory is
    /// [`InstallError::NotFound`].
    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        let name = self.product.executable_name();
        let candidates = self.candidates(&name)?;

        for candidate in candidates {
            debug!(candidate = %candidate.display(), "considering binary");
            let Some(spec) = &self.constraints else {
                return Ok(InstallResult::found(candidate));
            };

            let version =
                probe::probe_version(&candidate, &self.product, self.probe_timeout).await?;
            if spec.satisfies(&version) {
                debug!(candidate = %candidate.display(), %version, "accepted binary");
                return Ok(InstallResult::found(candidate));
            }
            debug!(candidate = %candidate.display(), %version, "version does not satisfy constraint, skipping");
        }

        Err(InstallError::NotFound {
            what: match &self.constraints {
                Some(spec) => format!("{} matching {spec} on the search path", name),
                None => format!("{} on the search path", name),
            },
        })
    }

    /// Matching executables in search order.
    fn candidates(&self, name: &str) -> Result<Vec<PathBuf>, InstallError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let found: Vec<PathBuf> = match &self.search_dirs {
            Some(dirs) => {
                let joined = std::env::join_paths(dirs).map_err(|e| InstallError::Structural {
                    message: format!("invalid search directory list: {e}"),
                })?;
                which::which_in_all(name, Some(joined), cwd)
                    .map(|iter| iter.collect())
                    .unwrap_or_default()
            }
            None => which::which_all(name)
                .map(|iter| iter.collect())
                .unwrap_or_default(),
        };
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn write_fake_tool(dir: &std::path::Path, name: &str, banner: &str) -> PathBuf {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\necho '{banner}'").unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn demo_product() -> Product {
        Product::new("demo", "demo", "--version", r"demo v(\d+\.\d+\.\d+)")
    }

    #[tokio::test]
    async fn test_nothing_on_empty_dir_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = ExistingBinary::any(demo_product()).in_dirs(vec![dir.path().to_path_buf()]);
        let result = source.resolve().await;
        assert!(matches!(result, Err(InstallError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_finds_binary_without_constraint() {
        let dir = tempfile::tempdir().unwrap();
        let expected = write_fake_tool(dir.path(), "demo", "demo v1.2.3");

        let source = ExistingBinary::any(demo_product()).in_dirs(vec![dir.path().to_path_buf()]);
        let result = source.resolve().await.unwrap();
        assert_eq!(result.exec_path, expected);
        assert!(!result.removable());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_constraint_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_tool(dir.path(), "demo", "demo v1.2.3");

        let source = ExistingBinary::matching(
            demo_product(),
            VersionSpec::parse("~> 1.0").unwrap(),
        )
        .in_dirs(vec![dir.path().to_path_buf()]);
        let result = source.resolve().await.unwrap();
        assert!(result.exec_path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_wrong_version_is_not_found_not_execution() {
        let dir = tempfile::tempdir().unwrap();
        write_fake_tool(dir.path(), "demo", "demo v0.9.0");

        let source = ExistingBinary::matching(
            demo_product(),
            VersionSpec::parse("~> 1.0").unwrap(),
        )
        .in_dirs(vec![dir.path().to_path_buf()]);
        let result = source.resolve().await;
        assert!(matches!(result, Err(InstallError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_first_satisfying_dir_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_fake_tool(first.path(), "demo", "demo v0.9.0");
        let wanted = write_fake_tool(second.path(), "demo", "demo v1.5.0");

        let source = ExistingBinary::matching(
            demo_product(),
            VersionSpec::parse("~> 1.0").unwrap(),
        )
        .in_dirs(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        let result = source.resolve().await.unwrap();
        assert_eq!(result.exec_path, wanted);
    }

    #[test]
    fn test_label() {
        let source = ExistingBinary::matching(
            demo_product(),
            VersionSpec::parse("~> 1.0").unwrap(),
        );
        assert!(source.label().contains("locate demo"));
        assert!(ExistingBinary::any(demo_product()).label().contains("demo"));
    }
}
