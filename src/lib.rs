//! # binsource
//!
//! Multi-source resolution and installation of tool binaries.
//!
//! binsource obtains a runnable executable for a named product at a wanted
//! version from whichever of several sources succeeds first: an existing
//! installation found on a search path, an official release distribution
//! downloaded and cryptographically verified, or a fresh build from a git
//! revision. Everything it installs is tracked and can be removed again in
//! one call.
//!
//! ## Sources
//!
//! - [`locate::ExistingBinary`] - probe `PATH` (or explicit directories)
//!   for an already-installed binary, optionally enforcing a version
//!   constraint by asking the binary itself.
//! - [`releases::ExactVersion`] / [`releases::LatestVersion`] - download a
//!   release archive, verify the signed checksum manifest and the archive
//!   digest, and extract the executable.
//! - [`build::GitRevision`] - check out a revision and run the product's
//!   own build toolchain.
//!
//! Sources are plain data constructed by the caller and tried strictly in
//! the order given - cheap local lookups before network fetches, or the
//! reverse, as the caller prefers.
//!
//! ## Example
//!
//! ```rust,no_run
//! use binsource::{locate::ExistingBinary, releases::LatestVersion, product, Installer, VersionSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), binsource::InstallError> {
//!     let constraint = VersionSpec::parse("~> 1.0")?;
//!     let mut installer = Installer::new();
//!
//!     let exec_path = installer
//!         .ensure(&[
//!             ExistingBinary::matching(product::terraform(), constraint.clone()).into(),
//!             LatestVersion::matching(product::terraform(), constraint).into(),
//!         ])
//!         .await?;
//!     println!("terraform available at {}", exec_path.display());
//!
//!     // Delete whatever the installer itself created (a binary found on
//!     // PATH is left alone).
//!     installer.remove().await?;
//!     Ok(())
//! }
//! ```
//!
//! Deadlines and cancellation ride the async runtime: wrap any operation in
//! `tokio::time::timeout`, or drop the future. Partially staged installs
//! are discarded on cancellation and never reach the removal ledger.

pub mod build;
pub mod locate;
pub mod product;
pub mod releases;

mod error;
mod http;
mod installer;
mod source;
mod version_spec;

pub use error::{AggregateError, InstallError};
pub use installer::{Installer, ScopedInstaller};
pub use product::{BuildSpec, Product};
pub use source::{InstallResult, Installable, Source};
pub use version_spec::{ParseVersionSpecError, VersionSpec};

// The version type used throughout the public API.
pub use semver::Version;
