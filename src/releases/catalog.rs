//! Querying the remote release index.

use crate::error::InstallError;
use crate::http;
use crate::product::Product;
use crate::version_spec::VersionSpec;
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// The release index document for one product: a `versions` object keyed by
/// version string. Entry bodies carry build metadata this crate does not
/// consume; unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ProductIndex {
    #[serde(default)]
    versions: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {}

/// Client for a product release index.
///
/// Lists the versions a remote index publishes for a product and selects
/// the one satisfying a request. Each call re-queries the index; results
/// are not cached across resolution attempts.
#[derive(Debug, Clone)]
pub struct ReleaseCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl ReleaseCatalog {
    /// Catalog over `base_url` using the crate's identified HTTP client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, http::new_client())
    }

    /// Catalog over `base_url` using a caller-constructed client. The
    /// caller's client keeps its own identification headers.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: trim_base(base_url.into()),
            client,
        }
    }

    /// Versions the index publishes for `product`, newest first, optionally
    /// filtered by `spec`.
    ///
    /// An unknown product is [`InstallError::NotFound`]; a transport
    /// failure is [`InstallError::Network`] and may be retried by the
    /// caller (never internally).
    pub async fn list_versions(
        &self,
        product: &Product,
        spec: Option<&VersionSpec>,
    ) -> Result<Vec<Version>, InstallError> {
        let url = format!("{}/{}/index.json", self.base_url, product.name);
        debug!(%url, "querying release index");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| InstallError::Network {
                url: url.clone(),
                source: e,
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(InstallError::NotFound {
                what: format!("product {} in the release index", product.name),
            });
        }
        let response = response
            .error_for_status()
            .map_err(|e| InstallError::Network {
                url: url.clone(),
                source: e,
            })?;

        let body = response.text().await.map_err(|e| InstallError::Network {
            url: url.clone(),
            source: e,
        })?;
        let index: ProductIndex =
            serde_json::from_str(&body).map_err(|e| InstallError::Structural {
                message: format!("malformed release index at {url}: {e}"),
            })?;

        let mut versions: Vec<Version> = index
            .versions
            .keys()
            // Index keys that are not semver (dev builds, channel aliases)
            // are skipped rather than failing the listing.
            .filter_map(|key| Version::parse(key).ok())
            .filter(|v| spec.map_or(true, |s| s.satisfies(v)))
            .collect();
        versions.sort();
        versions.reverse();

        debug!(product = %product.name, count = versions.len(), "release index listed");
        Ok(versions)
    }

    /// The best (latest satisfying) version for `spec`.
    pub async fn select_version(
        &self,
        product: &Product,
        spec: &VersionSpec,
    ) -> Result<Version, InstallError> {
        let versions = self.list_versions(product, None).await?;
        spec.select_best(&versions)
            .ok_or_else(|| InstallError::NotFound {
                what: format!("{} version matching {spec}", product.name),
            })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}
