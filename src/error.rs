//! Error types for resolution and installation.
//!
//! The taxonomy distinguishes expected misses ([`InstallError::NotFound`])
//! from transport failures the caller may retry ([`InstallError::Network`])
//! and from security-relevant failures that must never be retried or
//! downgraded ([`InstallError::Verification`],
//! [`InstallError::ChecksumMismatch`]). Sources return their most specific
//! error; the installer never interprets or retries them, it only aggregates.

use std::fmt;
use thiserror::Error;

/// Errors that can occur while resolving, verifying, or installing an
/// artifact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InstallError {
    /// No matching version or binary exists. Expected, not exceptional:
    /// a constraint nothing satisfies, an unknown product, an unsupported
    /// platform, or an empty search path all land here.
    #[error("not found: {what}")]
    NotFound {
        /// What was looked for and missed.
        what: String,
    },

    /// Transport failure talking to the release index. Retryable by the
    /// caller; never retried internally.
    #[error("network error fetching {url}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// Signature check over the checksum manifest failed. Fatal and
    /// security-relevant: never retried, never downgraded to a warning.
    #[error("signature verification failed for {artifact}: {message}")]
    Verification {
        /// The artifact whose signature did not verify.
        artifact: String,
        /// What went wrong.
        message: String,
    },

    /// Downloaded bytes do not match the manifest digest. Fatal; the
    /// download is discarded and nothing is installed.
    #[error("checksum mismatch for {artifact}: manifest lists {expected}, computed {actual}")]
    ChecksumMismatch {
        /// The archive filename.
        artifact: String,
        /// Digest from the manifest entry.
        expected: String,
        /// Digest computed over the downloaded bytes.
        actual: String,
    },

    /// An archive or build output did not have the expected shape: zero or
    /// several executable candidates, or enterprise license artifacts
    /// missing when the caller asked for enterprise semantics.
    #[error("{message}")]
    Structural {
        /// Description of the structural problem.
        message: String,
    },

    /// A version-control operation failed. The tool's diagnostic output is
    /// preserved verbatim for surfacing, not parsed.
    #[error("version control failed: {message}")]
    Vcs {
        /// Description of the failed operation.
        message: String,
        /// Captured diagnostic output.
        output: String,
    },

    /// The external build toolchain failed. Diagnostic output preserved
    /// verbatim.
    #[error("build failed: {message}")]
    Build {
        /// Description of the failed operation.
        message: String,
        /// Captured diagnostic output.
        output: String,
    },

    /// Probing a candidate binary failed unexpectedly - spawning it, or
    /// reading its output. Distinct from "wrong version", which is a skip,
    /// not an error.
    #[error("failed to execute {command}: {message}")]
    Execution {
        /// The command that failed.
        command: String,
        /// What went wrong.
        message: String,
    },

    /// A version spec string supplied by the caller did not parse.
    #[error(transparent)]
    InvalidVersionSpec(#[from] crate::version_spec::ParseVersionSpecError),

    /// Filesystem failure while staging, extracting, or removing.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Several underlying failures, one per attempted source or removed
    /// path.
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl InstallError {
    /// Whether this failure is security-relevant (a failed signature or
    /// digest check). Falling back past one of these deserves attention.
    pub fn is_security_failure(&self) -> bool {
        matches!(
            self,
            Self::Verification { .. } | Self::ChecksumMismatch { .. }
        )
    }
}

/// A collection of failures, each labeled with the source or path it came
/// from.
///
/// Returned by `ensure` when every source fails, and by `remove` when some
/// paths could not be deleted. Individual errors stay inspectable.
#[derive(Debug)]
pub struct AggregateError {
    /// `(label, error)` pairs in attempt order.
    pub failures: Vec<(String, InstallError)>,
}

impl AggregateError {
    pub(crate) fn new(failures: Vec<(String, InstallError)>) -> Self {
        Self { failures }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} failure(s):", self.failures.len())?;
        for (label, error) in &self.failures {
            writeln!(f, "  {label}: {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = InstallError::NotFound {
            what: "terraform matching ~>3.0".to_string(),
        };
        assert_eq!(error.to_string(), "not found: terraform matching ~>3.0");
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let error = InstallError::ChecksumMismatch {
            artifact: "terraform_1.3.7_linux_amd64.zip".to_string(),
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let text = error.to_string();
        assert!(text.contains("terraform_1.3.7_linux_amd64.zip"));
        assert!(text.contains(&"aa".repeat(32)));
    }

    #[test]
    fn test_security_failure_classification() {
        let verification = InstallError::Verification {
            artifact: "SHA256SUMS".to_string(),
            message: "bad signature".to_string(),
        };
        let checksum = InstallError::ChecksumMismatch {
            artifact: "a.zip".to_string(),
            expected: "00".to_string(),
            actual: "11".to_string(),
        };
        let not_found = InstallError::NotFound {
            what: "anything".to_string(),
        };
        assert!(verification.is_security_failure());
        assert!(checksum.is_security_failure());
        assert!(!not_found.is_security_failure());
    }

    #[test]
    fn test_aggregate_display_names_each_failure() {
        let aggregate = AggregateError::new(vec![
            (
                "locate terraform".to_string(),
                InstallError::NotFound {
                    what: "terraform on PATH".to_string(),
                },
            ),
            (
                "release terraform latest".to_string(),
                InstallError::Structural {
                    message: "no executable in archive".to_string(),
                },
            ),
        ]);
        let text = aggregate.to_string();
        assert!(text.contains("2 failure(s)"));
        assert!(text.contains("locate terraform"));
        assert!(text.contains("release terraform latest"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error: InstallError = io.into();
        assert!(matches!(error, InstallError::Io(_)));
    }

    #[test]
    fn test_vcs_preserves_output_verbatim() {
        let error = InstallError::Vcs {
            message: "checkout of deadbeef failed".to_string(),
            output: "fatal: reference is not a tree: deadbeef\n".to_string(),
        };
        if let InstallError::Vcs { output, .. } = &error {
            assert_eq!(output, "fatal: reference is not a tree: deadbeef\n");
        } else {
            panic!("wrong variant");
        }
    }
}
