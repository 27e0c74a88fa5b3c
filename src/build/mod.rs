//! Building a product from a version-control revision.
//!
//! The checkout and the build toolchain are external subprocesses: their
//! exit status and captured output are the only signals consumed, and their
//! diagnostic output travels verbatim inside the error when they fail.

use crate::error::InstallError;
use crate::product::Product;
use crate::source::InstallResult;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Default timeout for the checkout.
const DEFAULT_VCS_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Default timeout for the build command.
const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(25 * 60);

/// A source that stages a checkout of the product's repository at a
/// revision and builds the executable with the product's own toolchain.
///
/// # Example
///
/// ```rust,no_run
/// use binsource::{build::GitRevision, product};
///
/// // Build whatever the default branch currently points at.
/// let head = GitRevision::new(product::terraform());
///
/// // Or a specific tag.
/// let tagged = GitRevision::at(product::terraform(), "v1.3.7");
/// ```
#[derive(Debug, Clone)]
pub struct GitRevision {
    /// The product to build; must carry a
    /// [`BuildSpec`](crate::product::BuildSpec).
    pub product: Product,

    /// The reference to check out.
    pub revision: String,

    /// Timeout for the clone/checkout phase.
    pub vcs_timeout: Duration,

    /// Timeout for the build command.
    pub build_timeout: Duration,
}

impl GitRevision {
    /// Build the repository's `HEAD`.
    pub fn new(product: Product) -> Self {
        Self::at(product, "HEAD")
    }

    /// Build a specific reference (branch, tag, or commit).
    pub fn at(product: Product, revision: impl Into<String>) -> Self {
        Self {
            product,
            revision: revision.into(),
            vcs_timeout: DEFAULT_VCS_TIMEOUT,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }

    pub(crate) fn label(&self) -> String {
        format!("build {} @ {}", self.product.name, self.revision)
    }

    /// Stage, check out, build, and locate the produced executable.
    ///
    /// Always removable: the result owns the staged directory, sources,
    /// build droppings and all.
    pub(crate) async fn resolve(&self) -> Result<InstallResult, InstallError> {
        let build = self
            .product
            .build
            .as_ref()
            .ok_or_else(|| InstallError::Structural {
                message: format!("product {} has no build instructions", self.product.name),
            })?;

        let staging = tempfile::Builder::new()
            .prefix("binsource-build-")
            .tempdir()?;
        let checkout = staging.path();

        debug!(url = %build.repository_url, revision = %self.revision, "cloning");
        self.git(
            &["clone", build.repository_url.as_str(), "."],
            checkout,
            "clone",
        )
        .await?;
        if self.revision != "HEAD" {
            self.git(&["checkout", &self.revision], checkout, "checkout")
                .await?;
        }

        let (program, args) =
            build
                .build_command
                .split_first()
                .ok_or_else(|| InstallError::Structural {
                    message: format!("product {} has an empty build command", self.product.name),
                })?;
        debug!(%program, ?args, "building");
        let output = run(program, args, checkout, self.build_timeout)
            .await
            .map_err(|message| InstallError::Build {
                message: format!("could not run build command for {}: {message}", self.product.name),
                output: String::new(),
            })?;
        if !output.status.success() {
            return Err(InstallError::Build {
                message: format!(
                    "build of {} @ {} exited with {}",
                    self.product.name, self.revision, output.status
                ),
                output: combined_output(&output),
            });
        }

        let exec_path = checkout.join(self.product.executable_name());
        if !exec_path.is_file() {
            return Err(InstallError::Structural {
                message: format!(
                    "build succeeded but produced no {} in the checkout root",
                    self.product.executable_name()
                ),
            });
        }

        let owned_dir = staging.keep();
        let exec_path = owned_dir.join(self.product.executable_name());
        Ok(InstallResult::installed(exec_path, owned_dir))
    }

    /// Run a git subcommand, translating failures into [`InstallError::Vcs`]
    /// with git's own diagnostics attached.
    async fn git(&self, args: &[&str], cwd: &Path, what: &str) -> Result<(), InstallError> {
        let output = run("git", args, cwd, self.vcs_timeout)
            .await
            .map_err(|message| InstallError::Vcs {
                message: format!("could not run git {what}: {message}"),
                output: String::new(),
            })?;
        if !output.status.success() {
            return Err(InstallError::Vcs {
                message: format!(
                    "git {what} of {} @ {} exited with {}",
                    self.product.name, self.revision, output.status
                ),
                output: combined_output(&output),
            });
        }
        Ok(())
    }
}

async fn run<S: AsRef<std::ffi::OsStr>>(
    program: &str,
    args: &[S],
    cwd: &Path,
    limit: Duration,
) -> Result<std::process::Output, String> {
    timeout(
        limit,
        Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| format!("timed out after {limit:?}"))?
    .map_err(|e| e.to_string())
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.is_empty() {
        stderr.into_owned()
    } else if stderr.is_empty() {
        stdout.into_owned()
    } else {
        format!("{stdout}\n{stderr}")
    }
}
