//! Async version probing of a candidate executable.

use crate::error::InstallError;
use crate::product::Product;
use semver::Version;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Run a candidate with the product's version argument and parse its
/// self-reported version.
///
/// The invocation is timeout-bounded so an unresponsive binary cannot hang
/// resolution. Output is read from stdout, falling back to stderr (some
/// tools report their version there). Any unexpected failure - spawn error,
/// timeout, non-zero exit, unparseable output - is an
/// [`InstallError::Execution`]; a *parsed but unwanted* version is the
/// caller's decision, not an error here.
pub(crate) async fn probe_version(
    path: &Path,
    product: &Product,
    probe_timeout: Duration,
) -> Result<Version, InstallError> {
    let command = format!("{} {}", path.display(), product.version_arg);

    let output = timeout(
        probe_timeout,
        Command::new(path)
            .arg(&product.version_arg)
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| InstallError::Execution {
        command: command.clone(),
        message: format!("timed out after {probe_timeout:?}"),
    })?
    .map_err(|e| InstallError::Execution {
        command: command.clone(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(InstallError::Execution {
            command,
            message: format!("exited with {}", output.status),
        });
    }

    let raw = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    let text = String::from_utf8_lossy(&raw);

    product
        .parse_version_output(&text)
        .ok_or_else(|| InstallError::Execution {
            command,
            message: format!("could not parse a version from output: {}", text.trim()),
        })
}
