//! Version requirements: exact versions and constraint sets.
//!
//! A [`VersionSpec`] is a pure value describing which versions of a product
//! are acceptable. Matching and selection never perform I/O, so constraint
//! behavior can be tested in complete isolation from the network and the
//! filesystem.

use semver::{Version, VersionReq};
use std::fmt;
use thiserror::Error;

/// Error returned when a version spec string cannot be parsed.
#[derive(Debug, Error)]
#[error("invalid version spec {input:?}: {message}")]
pub struct ParseVersionSpecError {
    /// The input that failed to parse.
    pub input: String,
    /// What went wrong.
    pub message: String,
}

/// An acceptable-version requirement: a single exact version or a
/// conjunction of comparison predicates.
///
/// # Example
///
/// ```rust
/// use binsource::VersionSpec;
/// use semver::Version;
///
/// let spec = VersionSpec::parse("~> 1.0").unwrap();
/// assert!(spec.satisfies(&Version::new(1, 4, 2)));
/// assert!(!spec.satisfies(&Version::new(2, 0, 0)));
///
/// let exact = VersionSpec::parse("1.3.7").unwrap();
/// assert!(exact.satisfies(&Version::new(1, 3, 7)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum VersionSpec {
    /// Exactly this version and no other.
    Exact(Version),
    /// Any version matching every comparator in the requirement.
    Constraints(VersionReq),
}

impl VersionSpec {
    /// Wrap an already-parsed exact version.
    pub fn exact(version: Version) -> Self {
        Self::Exact(version)
    }

    /// Parse a spec string.
    ///
    /// Accepted forms:
    ///
    /// - a bare or `=`-prefixed version (`"1.3.7"`, `"=1.3.7"`) - exact match
    /// - a semver requirement list (`">=1.0, <2.0"`, `"^1.2"`)
    /// - the pessimistic operator (`"~> 1.0"` meaning `>=1.0.0, <2.0.0`;
    ///   `"~> 1.0.3"` meaning `>=1.0.3, <1.1.0`)
    pub fn parse(input: &str) -> Result<Self, ParseVersionSpecError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ParseVersionSpecError {
                input: input.to_string(),
                message: "empty spec".to_string(),
            });
        }

        // A plain version (optionally "="-prefixed) is an exact requirement.
        let exact_candidate = trimmed.strip_prefix('=').unwrap_or(trimmed).trim();
        if let Ok(version) = Version::parse(exact_candidate) {
            return Ok(Self::Exact(version));
        }

        let mut comparators = Vec::new();
        for part in trimmed.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("~>") {
                let (lower, upper) = pessimistic_bounds(rest.trim()).map_err(|message| {
                    ParseVersionSpecError {
                        input: input.to_string(),
                        message,
                    }
                })?;
                comparators.push(lower);
                comparators.push(upper);
            } else {
                comparators.push(part.to_string());
            }
        }

        let req = VersionReq::parse(&comparators.join(", ")).map_err(|e| {
            ParseVersionSpecError {
                input: input.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::Constraints(req))
    }

    /// Whether `candidate` satisfies this spec. Pure predicate.
    ///
    /// An exact version always satisfies itself.
    pub fn satisfies(&self, candidate: &Version) -> bool {
        match self {
            Self::Exact(version) => version == candidate,
            Self::Constraints(req) => req.matches(candidate),
        }
    }

    /// Select the best candidate: the maximum version, under semver
    /// precedence, among those satisfying this spec.
    ///
    /// Returns `None` when nothing matches; callers distinguish that from
    /// transport or parse errors, which surface elsewhere.
    pub fn select_best(&self, candidates: &[Version]) -> Option<Version> {
        candidates
            .iter()
            .filter(|v| self.satisfies(v))
            .max()
            .cloned()
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => write!(f, "={version}"),
            Self::Constraints(req) => write!(f, "{req}"),
        }
    }
}

impl From<Version> for VersionSpec {
    fn from(version: Version) -> Self {
        Self::Exact(version)
    }
}

/// Translate one pessimistic component (`"1.0"`, `"1.0.3"`) into a
/// `(lower, upper)` comparator pair.
///
/// The upper bound excludes the next release of the second-least-significant
/// given component: `~> 1.0` caps below `2.0.0`, `~> 1.0.3` below `1.1.0`.
fn pessimistic_bounds(version: &str) -> Result<(String, String), String> {
    if version.is_empty() {
        return Err("pessimistic operator requires a version".to_string());
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let numbers: Vec<u64> = core
        .split('.')
        .map(|p| p.parse::<u64>().map_err(|_| format!("invalid component {p:?}")))
        .collect::<Result<_, _>>()?;

    let upper = match numbers.as_slice() {
        [major] | [major, _] => format!("<{}.0.0", major + 1),
        [major, minor, _] => format!("<{major}.{}.0", minor + 1),
        _ => return Err(format!("too many components in {version:?}")),
    };
    Ok((format!(">={version}"), upper))
}
