//! The source abstraction: one uniform contract over heterogeneous
//! strategies for obtaining an installed artifact.
//!
//! Each strategy is a flat data-plus-behavior pair - a struct the caller
//! fills in directly - composed here into the [`Source`] and [`Installable`]
//! variants the [`Installer`](crate::Installer) iterates over. There is no
//! factory registry and no further subtyping.

use crate::build::GitRevision;
use crate::error::InstallError;
use crate::locate::ExistingBinary;
use crate::releases::{ExactVersion, LatestVersion};
use std::path::PathBuf;

/// What a successful resolution produced.
///
/// Once a source yields an `InstallResult`, lifecycle tracking of the path
/// belongs to the [`Installer`](crate::Installer): removable results are
/// recorded in its ledger, non-removable ones (pre-existing binaries found
/// on disk) are intentionally never tracked.
#[derive(Debug, Clone)]
pub struct InstallResult {
    /// Absolute path to the runnable executable.
    pub exec_path: PathBuf,

    /// The directory this resolution created and owns, when it created one.
    /// `None` for artifacts that existed before resolution.
    pub owned_dir: Option<PathBuf>,
}

impl InstallResult {
    /// A pre-existing artifact: nothing was created, nothing to remove.
    pub(crate) fn found(exec_path: PathBuf) -> Self {
        Self {
            exec_path,
            owned_dir: None,
        }
    }

    /// A freshly installed artifact owning `dir`.
    pub(crate) fn installed(exec_path: PathBuf, dir: PathBuf) -> Self {
        Self {
            exec_path,
            owned_dir: Some(dir),
        }
    }

    /// Whether this source variant can also remove what it produced.
    pub fn removable(&self) -> bool {
        self.owned_dir.is_some()
    }
}

/// A strategy for obtaining one artifact.
///
/// Construct the variant's struct directly and convert it with `into()`:
///
/// ```rust,no_run
/// use binsource::{locate::ExistingBinary, releases::LatestVersion, product, Source, VersionSpec};
///
/// let constraint = VersionSpec::parse("~> 1.0").unwrap();
/// let sources: Vec<Source> = vec![
///     ExistingBinary::matching(product::terraform(), constraint.clone()).into(),
///     LatestVersion::matching(product::terraform(), constraint).into(),
/// ];
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Source {
    /// An executable already present on a search path. Never removable.
    Locate(ExistingBinary),
    /// A specific version fetched from the release index.
    Release(ExactVersion),
    /// The newest release satisfying a constraint.
    LatestRelease(LatestVersion),
    /// A fresh build from a version-control revision.
    Build(GitRevision),
}

impl Source {
    /// Resolve this source to an installed artifact.
    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        match self {
            Self::Locate(source) => source.resolve().await,
            Self::Release(source) => source.resolve().await,
            Self::LatestRelease(source) => source.resolve().await,
            Self::Build(source) => source.resolve().await,
        }
    }

    /// Short human-readable identifier, used in aggregate errors and logs.
    pub(crate) fn label(&self) -> String {
        match self {
            Self::Locate(source) => source.label(),
            Self::Release(source) => source.label(),
            Self::LatestRelease(source) => source.label(),
            Self::Build(source) => source.label(),
        }
    }
}

impl From<ExistingBinary> for Source {
    fn from(source: ExistingBinary) -> Self {
        Self::Locate(source)
    }
}

impl From<ExactVersion> for Source {
    fn from(source: ExactVersion) -> Self {
        Self::Release(source)
    }
}

impl From<LatestVersion> for Source {
    fn from(source: LatestVersion) -> Self {
        Self::LatestRelease(source)
    }
}

impl From<GitRevision> for Source {
    fn from(source: GitRevision) -> Self {
        Self::Build(source)
    }
}

/// A source variant capable of producing a removable artifact.
///
/// Excludes disk lookup: [`Installer::install`](crate::Installer::install)
/// only accepts sources that create something it can own.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Installable {
    /// A specific version fetched from the release index.
    Release(ExactVersion),
    /// The newest release satisfying a constraint.
    LatestRelease(LatestVersion),
    /// A fresh build from a version-control revision.
    Build(GitRevision),
}

impl Installable {
    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        match self {
            Self::Release(source) => source.resolve().await,
            Self::LatestRelease(source) => source.resolve().await,
            Self::Build(source) => source.resolve().await,
        }
    }

    pub(crate) fn label(&self) -> String {
        match self {
            Self::Release(source) => source.label(),
            Self::LatestRelease(source) => source.label(),
            Self::Build(source) => source.label(),
        }
    }
}

impl From<ExactVersion> for Installable {
    fn from(source: ExactVersion) -> Self {
        Self::Release(source)
    }
}

impl From<LatestVersion> for Installable {
    fn from(source: LatestVersion) -> Self {
        Self::LatestRelease(source)
    }
}

impl From<GitRevision> for Installable {
    fn from(source: GitRevision) -> Self {
        Self::Build(source)
    }
}

impl From<Installable> for Source {
    fn from(installable: Installable) -> Self {
        match installable {
            Installable::Release(source) => Self::Release(source),
            Installable::LatestRelease(source) => Self::LatestRelease(source),
            Installable::Build(source) => Self::Build(source),
        }
    }
}
