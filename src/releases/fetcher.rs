//! The download -> verify -> extract pipeline for one release version.
//!
//! Ordering is load-bearing: the manifest signature is verified before the
//! archive digest is compared, and extraction never runs on bytes that have
//! not passed both checks.

use crate::error::InstallError;
use crate::product::Product;
use crate::releases::archive;
use crate::releases::manifest::{sha256_hex, ChecksumManifest};
use crate::source::InstallResult;
use ed25519_dalek::VerifyingKey;
use semver::Version;
use std::path::Path;
use tracing::debug;

/// Fetches, verifies, and installs release archives from one index host.
#[derive(Debug, Clone)]
pub(crate) struct ReleaseFetcher {
    client: reqwest::Client,
    base_url: String,
    verifying_key: VerifyingKey,
}

impl ReleaseFetcher {
    pub(crate) fn new(
        client: reqwest::Client,
        base_url: String,
        verifying_key: VerifyingKey,
    ) -> Self {
        Self {
            client,
            base_url,
            verifying_key,
        }
    }

    /// Run the full pipeline for `version` of `product`.
    ///
    /// The executable lands in `install_dir` when given, otherwise in a
    /// freshly created directory. Enterprise license files, when
    /// `license_dir` is given, land there; the archive not carrying them is
    /// then a structural failure. The returned result owns the directory it
    /// wrote into, so it is always removable.
    pub(crate) async fn fetch(
        &self,
        product: &Product,
        version: &Version,
        install_dir: Option<&Path>,
        license_dir: Option<&Path>,
    ) -> Result<InstallResult, InstallError> {
        let (os, arch) = platform_identifiers();
        let archive_name = format!("{}_{}_{}_{}.zip", product.name, version, os, arch);
        let release_base = format!("{}/{}/{}", self.base_url, product.name, version);

        // Manifest first: it decides whether this platform is distributed
        // at all, before any large download.
        let manifest_name = format!("{}_{}_SHA256SUMS", product.name, version);
        let manifest_url = format!("{release_base}/{manifest_name}");
        let manifest_bytes =
            self.get(&manifest_url)
                .await?
                .ok_or_else(|| InstallError::NotFound {
                    what: format!("checksum manifest for {} {version}", product.name),
                })?;
        let manifest = ChecksumManifest::parse(manifest_bytes);

        let entry = manifest
            .entry_for(&archive_name)
            .ok_or_else(|| InstallError::NotFound {
                what: format!(
                    "{archive_name} in the {} {version} manifest (platform unsupported for this release)",
                    product.name
                ),
            })?
            .clone();

        let signature_url = format!("{manifest_url}.sig");
        let signature =
            self.get(&signature_url)
                .await?
                .ok_or_else(|| InstallError::Verification {
                    artifact: manifest_name.clone(),
                    message: "release publishes no detached signature".to_string(),
                })?;
        manifest.verify_signature(&signature, &self.verifying_key)?;
        debug!(manifest = %manifest_name, "manifest signature verified");

        let archive_url = format!("{release_base}/{archive_name}");
        let archive_bytes =
            self.get(&archive_url)
                .await?
                .ok_or_else(|| InstallError::NotFound {
                    what: format!("release archive {archive_name}"),
                })?;
        let actual = sha256_hex(&archive_bytes);
        if actual != entry.digest {
            // The downloaded bytes are dropped here; nothing was written.
            return Err(InstallError::ChecksumMismatch {
                artifact: archive_name,
                expected: entry.digest,
                actual,
            });
        }
        debug!(archive = %archive_name, digest = %actual, "archive digest verified");

        // Staged as a TempDir until fully extracted: an error (or a caller
        // cancelling at an await point) drops it and takes the partial
        // install with it.
        let (dest, staged) = match install_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                (dir.to_path_buf(), None)
            }
            None => {
                let tmp = tempfile::Builder::new().prefix("binsource-").tempdir()?;
                (tmp.path().to_path_buf(), Some(tmp))
            }
        };

        let exec_path = archive::extract_executable(
            &archive_bytes,
            &archive_name,
            &product.executable_name(),
            &dest,
            license_dir,
        )?;

        let owned_dir = match staged {
            Some(tmp) => tmp.keep(),
            None => dest,
        };
        Ok(InstallResult::installed(exec_path, owned_dir))
    }

    /// GET `url`, returning `None` on 404 and [`InstallError::Network`] on
    /// transport failure.
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>, InstallError> {
        debug!(%url, "downloading");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| InstallError::Network {
                url: url.to_string(),
                source: e,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| InstallError::Network {
                url: url.to_string(),
                source: e,
            })?;
        let bytes = response.bytes().await.map_err(|e| InstallError::Network {
            url: url.to_string(),
            source: e,
        })?;
        Ok(Some(bytes.to_vec()))
    }
}

/// `(os, arch)` identifiers as release filenames spell them.
pub(crate) fn platform_identifiers() -> (&'static str, &'static str) {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        other => other,
    };
    (os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_identifiers_are_release_style() {
        let (os, arch) = platform_identifiers();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
        // Rust's names for the common pairs are translated.
        assert_ne!(os, "macos");
        assert_ne!(arch, "x86_64");
        assert_ne!(arch, "aarch64");
    }

    #[test]
    fn test_archive_name_layout() {
        let (os, arch) = platform_identifiers();
        let name = format!("demo_{}_{os}_{arch}.zip", Version::new(1, 2, 3));
        assert!(name.starts_with("demo_1.2.3_"));
        assert!(name.ends_with(".zip"));
    }
}
