//! The orchestrator: ordered-fallback resolution and the removal ledger.

use crate::error::{AggregateError, InstallError};
use crate::source::{InstallResult, Installable, Source};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Resolves sources in caller-given order and tracks every artifact it
/// created for later removal.
///
/// The ledger records only removable results - binaries merely *found* on
/// disk are pre-existing system state this value does not own. Ledger
/// entries live until [`remove`](Installer::remove) deletes their owning
/// directories; nothing persists across process restarts.
///
/// All three operations take `&mut self`, so one `Installer` cannot be
/// driven from two tasks at once; the ledger needs no further
/// synchronization. Deadlines and cancellation are the caller's: wrap any
/// operation in `tokio::time::timeout` or drop the future - staged
/// directories are cleaned up on cancellation and a cancelled resolution
/// never reaches the ledger.
///
/// # Example
///
/// ```rust,no_run
/// use binsource::{locate::ExistingBinary, releases::LatestVersion, product, Installer, VersionSpec};
///
/// # async fn run() -> Result<(), binsource::InstallError> {
/// let constraint = VersionSpec::parse("~> 1.0")?;
/// let mut installer = Installer::new();
///
/// // Prefer a local binary; fall back to a verified release download.
/// let exec_path = installer
///     .ensure(&[
///         ExistingBinary::matching(product::terraform(), constraint.clone()).into(),
///         LatestVersion::matching(product::terraform(), constraint).into(),
///     ])
///     .await?;
/// println!("terraform at {}", exec_path.display());
///
/// installer.remove().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Installer {
    ledger: Vec<InstallResult>,
}

impl Installer {
    /// An installer with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve exactly the first listed installable - no fallback.
    ///
    /// Use this when one specific strategy is wanted and no other; if it
    /// fails, the call fails with that source's error. The ledger is
    /// unchanged on failure.
    pub async fn install(
        &mut self,
        installables: &[Installable],
    ) -> Result<PathBuf, InstallError> {
        let Some(first) = installables.first() else {
            return Err(InstallError::NotFound {
                what: "an installable source (none provided)".to_string(),
            });
        };
        if installables.len() > 1 {
            debug!(
                ignored = installables.len() - 1,
                "install resolves only the first listed installable"
            );
        }

        debug!(source = %first.label(), "installing");
        let result = first.resolve().await?;
        Ok(self.record(result))
    }

    /// Try each source in listed order; the first success wins.
    ///
    /// Order is entirely caller-controlled - list cheap local strategies
    /// before expensive network ones, or the reverse; no reordering and no
    /// internal retries happen here. Only if *every* source fails does the
    /// call fail, with an [`AggregateError`] naming each attempted source
    /// and its failure. The ledger is unchanged in that case.
    pub async fn ensure(&mut self, sources: &[Source]) -> Result<PathBuf, InstallError> {
        if sources.is_empty() {
            return Err(InstallError::NotFound {
                what: "a source (none provided)".to_string(),
            });
        }

        let mut failures: Vec<(String, InstallError)> = Vec::new();
        for source in sources {
            let label = source.label();
            if let Some((_, last)) = failures.last() {
                if last.is_security_failure() {
                    // Uniform fallback policy, but never a silent one.
                    warn!(
                        next = %label,
                        "falling through to a further source after a failed signature or digest check"
                    );
                }
            }

            debug!(source = %label, "attempting source");
            match source.resolve().await {
                Ok(result) => {
                    debug!(source = %label, path = %result.exec_path.display(), "source succeeded");
                    return Ok(self.record(result));
                }
                Err(error) => {
                    debug!(source = %label, %error, "source failed");
                    failures.push((label, error));
                }
            }
        }

        Err(AggregateError::new(failures).into())
    }

    /// Delete every artifact this installer created, best-effort.
    ///
    /// Every ledger entry's owning directory is attempted, in ledger order,
    /// even when earlier deletions fail. Successfully removed entries leave
    /// the ledger regardless of the overall outcome; what remains is
    /// reported in an [`AggregateError`] (or `Ok` when everything went).
    pub async fn remove(&mut self) -> Result<(), InstallError> {
        let failures = self.remove_blocking();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(failures).into())
        }
    }

    /// Paths currently tracked for removal.
    pub fn ledger(&self) -> &[InstallResult] {
        &self.ledger
    }

    fn record(&mut self, result: InstallResult) -> PathBuf {
        let exec_path = result.exec_path.clone();
        if result.removable() {
            debug!(dir = ?result.owned_dir, "recording artifact in ledger");
            self.ledger.push(result);
        }
        exec_path
    }

    /// The synchronous removal sweep shared by [`remove`](Self::remove) and
    /// the drop guard.
    fn remove_blocking(&mut self) -> Vec<(String, InstallError)> {
        let mut failures = Vec::new();
        let mut remaining = Vec::new();

        for entry in self.ledger.drain(..) {
            let Some(dir) = entry.owned_dir.clone() else {
                // Non-removable results never enter the ledger.
                continue;
            };
            debug!(dir = %dir.display(), "removing installed artifact");
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                // Already gone counts as removed.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "failed to remove artifact");
                    failures.push((dir.display().to_string(), e.into()));
                    remaining.push(entry);
                }
            }
        }

        self.ledger = remaining;
        failures
    }
}

/// An [`Installer`] that sweeps its ledger on drop.
///
/// Guarantees best-effort removal on every exit path of the enclosing
/// operation - early returns, errors, panics - without an explicit
/// `remove` call. Explicit [`remove`](Installer::remove) still works and
/// makes failures observable; the drop sweep only logs them.
///
/// # Example
///
/// ```rust,no_run
/// use binsource::{releases::ExactVersion, product, ScopedInstaller};
/// use semver::Version;
///
/// # async fn run() -> Result<(), binsource::InstallError> {
/// let mut installer = ScopedInstaller::new();
/// let exec_path = installer
///     .install(&[ExactVersion::new(product::terraform(), Version::new(1, 3, 7)).into()])
///     .await?;
/// // ... use the binary; the install is swept when `installer` drops ...
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ScopedInstaller {
    inner: Option<Installer>,
}

impl Default for ScopedInstaller {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedInstaller {
    /// A scoped installer with an empty ledger.
    pub fn new() -> Self {
        Self {
            inner: Some(Installer::new()),
        }
    }

    /// Give up scoped cleanup and take the inner installer.
    pub fn into_inner(mut self) -> Installer {
        // Present until taken; drop then sees `None` and does nothing.
        self.inner.take().expect("installer already taken")
    }
}

impl From<Installer> for ScopedInstaller {
    fn from(inner: Installer) -> Self {
        Self { inner: Some(inner) }
    }
}

impl Deref for ScopedInstaller {
    type Target = Installer;

    fn deref(&self) -> &Installer {
        self.inner.as_ref().expect("installer already taken")
    }
}

impl DerefMut for ScopedInstaller {
    fn deref_mut(&mut self) -> &mut Installer {
        self.inner.as_mut().expect("installer already taken")
    }
}

impl Drop for ScopedInstaller {
    fn drop(&mut self) {
        if let Some(installer) = self.inner.as_mut() {
            let failures = installer.remove_blocking();
            for (path, error) in failures {
                warn!(%path, %error, "scoped cleanup failed");
            }
        }
    }
}
