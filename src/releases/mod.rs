//! Obtaining artifacts from the official release distribution.
//!
//! Three source variants live here: [`ExactVersion`] (one specific
//! version), [`LatestVersion`] (newest version satisfying a constraint),
//! and [`Versions`] (expand a constraint into many installable exact
//! versions with a single catalog query). All of them run the same
//! download -> signature verification -> digest check -> extract pipeline;
//! none of them ever treats unverified bytes as installed.

mod archive;
mod catalog;
mod fetcher;
mod manifest;

pub use catalog::ReleaseCatalog;
pub use ed25519_dalek::VerifyingKey;
pub use manifest::{ChecksumManifest, ManifestEntry};

use crate::error::InstallError;
use crate::http;
use crate::product::Product;
use crate::source::InstallResult;
use crate::version_spec::VersionSpec;
use fetcher::ReleaseFetcher;
use semver::Version;
use std::path::PathBuf;

/// Release index consulted when a source does not override it.
pub const DEFAULT_API_BASE_URL: &str = "https://releases.hashicorp.com";

/// The release signing key trusted by default. Sources targeting a private
/// mirror override it with [`ExactVersion::verifying_key`] (and friends).
const RELEASE_SIGNING_KEY: [u8; 32] = [
    0x23, 0x7c, 0x86, 0x1b, 0x58, 0xf1, 0x21, 0xd7, 0xde, 0x0b, 0xa0, 0x94, 0x24, 0x80, 0x6c,
    0xf2, 0xe3, 0x57, 0xcb, 0x1a, 0x40, 0x31, 0xd8, 0x4b, 0x63, 0x8d, 0x6b, 0xbb, 0xf3, 0x00,
    0xba, 0xca,
];

fn default_verifying_key() -> VerifyingKey {
    VerifyingKey::from_bytes(&RELEASE_SIGNING_KEY).expect("embedded release key is valid")
}

fn build_fetcher(
    client: Option<reqwest::Client>,
    api_base_url: Option<String>,
    verifying_key: Option<VerifyingKey>,
) -> ReleaseFetcher {
    ReleaseFetcher::new(
        client.unwrap_or_else(http::new_client),
        api_base_url.unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        verifying_key.unwrap_or_else(default_verifying_key),
    )
}

/// Options for an enterprise-licensed install.
///
/// Presence means enterprise semantics: the release archive must carry the
/// license text files, and they are placed under `license_dir`. This is
/// never silently ignored - an archive without them fails the resolution.
#[derive(Debug, Clone)]
pub struct EnterpriseOptions {
    /// Directory to place `EULA.txt` and `TermsOfEvaluation.txt` into.
    pub license_dir: PathBuf,
}

/// Install one specific release version.
///
/// # Example
///
/// ```rust,no_run
/// use binsource::{releases::ExactVersion, product, Installer};
/// use semver::Version;
///
/// # async fn run() -> Result<(), binsource::InstallError> {
/// let mut installer = Installer::new();
/// let exec_path = installer
///     .install(&[ExactVersion::new(product::terraform(), Version::new(1, 3, 7)).into()])
///     .await?;
/// // ... use the binary at exec_path ...
/// installer.remove().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ExactVersion {
    /// The product to install.
    pub product: Product,

    /// The version to install, exactly.
    pub version: Version,

    /// Install into this directory instead of a fresh temporary one.
    pub install_dir: Option<PathBuf>,

    /// Request the enterprise distribution and place its license files.
    pub enterprise: Option<EnterpriseOptions>,

    /// Override the release index host (private mirrors).
    pub api_base_url: Option<String>,

    /// Override the trusted release signing key (private mirrors).
    pub verifying_key: Option<VerifyingKey>,

    /// Use a caller-constructed HTTP client instead of the crate's default
    /// identified one.
    pub client: Option<reqwest::Client>,
}

impl ExactVersion {
    /// Install `version` of `product` into a fresh directory, from the
    /// default index.
    pub fn new(product: Product, version: Version) -> Self {
        Self {
            product,
            version,
            install_dir: None,
            enterprise: None,
            api_base_url: None,
            verifying_key: None,
            client: None,
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("release {} {}", self.product.name, self.version)
    }

    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        let fetcher = build_fetcher(
            self.client.clone(),
            self.api_base_url.clone(),
            self.verifying_key,
        );
        fetcher
            .fetch(
                &self.product,
                &self.version,
                self.install_dir.as_deref(),
                self.enterprise.as_ref().map(|e| e.license_dir.as_path()),
            )
            .await
    }
}

/// Install the newest release satisfying a constraint.
#[derive(Debug, Clone)]
pub struct LatestVersion {
    /// The product to install.
    pub product: Product,

    /// Only versions satisfying this are considered; `None` considers all.
    pub constraints: Option<VersionSpec>,

    /// Consider pre-release versions too. Off by default: a `-rc.1` never
    /// wins over a final release unless asked for.
    pub include_prereleases: bool,

    /// Install into this directory instead of a fresh temporary one.
    pub install_dir: Option<PathBuf>,

    /// Override the release index host (private mirrors).
    pub api_base_url: Option<String>,

    /// Override the trusted release signing key (private mirrors).
    pub verifying_key: Option<VerifyingKey>,

    /// Use a caller-constructed HTTP client.
    pub client: Option<reqwest::Client>,
}

impl LatestVersion {
    /// The newest release of `product`, unconstrained.
    pub fn any(product: Product) -> Self {
        Self {
            product,
            constraints: None,
            include_prereleases: false,
            install_dir: None,
            api_base_url: None,
            verifying_key: None,
            client: None,
        }
    }

    /// The newest release of `product` satisfying `constraints`.
    pub fn matching(product: Product, constraints: VersionSpec) -> Self {
        Self {
            constraints: Some(constraints),
            ..Self::any(product)
        }
    }

    pub(crate) fn label(&self) -> String {
        match &self.constraints {
            Some(spec) => format!("latest release {} ({spec})", self.product.name),
            None => format!("latest release {}", self.product.name),
        }
    }

    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        let client = self.client.clone().unwrap_or_else(http::new_client);
        let base_url = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let catalog = ReleaseCatalog::with_client(base_url.clone(), client.clone());
        let version = self.select(&catalog).await?;

        let fetcher = ReleaseFetcher::new(
            client,
            base_url,
            self.verifying_key.unwrap_or_else(default_verifying_key),
        );
        fetcher
            .fetch(&self.product, &version, self.install_dir.as_deref(), None)
            .await
    }

    async fn select(&self, catalog: &ReleaseCatalog) -> Result<Version, InstallError> {
        let mut versions = catalog.list_versions(&self.product, None).await?;
        if !self.include_prereleases {
            versions.retain(|v| v.pre.is_empty());
        }

        let selected = match &self.constraints {
            Some(spec) => spec.select_best(&versions),
            // The listing is newest-first.
            None => versions.first().cloned(),
        };
        selected.ok_or_else(|| InstallError::NotFound {
            what: match &self.constraints {
                Some(spec) => format!("{} version matching {spec}", self.product.name),
                None => format!("any released version of {}", self.product.name),
            },
        })
    }
}

/// Expand a constraint into every satisfying release, newest first, with a
/// single catalog query.
///
/// Returns installable units rather than installing: feed the results to
/// [`Installer::install`](crate::Installer::install) one at a time, e.g. to
/// run a test matrix across a version range.
#[derive(Debug, Clone)]
pub struct Versions {
    /// The product whose releases to list.
    pub product: Product,

    /// Versions to include.
    pub constraints: VersionSpec,

    /// Include pre-release versions. Off by default.
    pub include_prereleases: bool,

    /// Carried into every produced [`ExactVersion`].
    pub api_base_url: Option<String>,

    /// Carried into every produced [`ExactVersion`].
    pub verifying_key: Option<VerifyingKey>,

    /// Carried into every produced [`ExactVersion`].
    pub client: Option<reqwest::Client>,
}

impl Versions {
    /// Releases of `product` satisfying `constraints`.
    pub fn matching(product: Product, constraints: VersionSpec) -> Self {
        Self {
            product,
            constraints,
            include_prereleases: false,
            api_base_url: None,
            verifying_key: None,
            client: None,
        }
    }

    /// Query the catalog once and expand into exact-version sources,
    /// newest first.
    pub async fn list(&self) -> Result<Vec<ExactVersion>, InstallError> {
        let client = self.client.clone().unwrap_or_else(http::new_client);
        let base_url = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let catalog = ReleaseCatalog::with_client(base_url, client);

        let mut versions = catalog
            .list_versions(&self.product, Some(&self.constraints))
            .await?;
        if !self.include_prereleases {
            versions.retain(|v| v.pre.is_empty());
        }

        Ok(versions
            .into_iter()
            .map(|version| ExactVersion {
                product: self.product.clone(),
                version,
                install_dir: None,
                enterprise: None,
                api_base_url: self.api_base_url.clone(),
                verifying_key: self.verifying_key,
                client: self.client.clone(),
            })
            .collect())
    }
}
