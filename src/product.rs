//! Product descriptors: what is being installed.
//!
//! A [`Product`] identifies one installable tool: its stable name (used in
//! release URLs), the executable's base name, how to ask a candidate binary
//! for its version, and how to pull a semantic version out of that output.
//! Products are immutable request descriptors - construct one directly, or
//! use the built-in registry ([`terraform`], [`vault`]).

use regex::Regex;
use semver::Version;

/// Describes one installable software product.
///
/// # Example
///
/// ```rust
/// use binsource::Product;
///
/// // A custom product for your own tool.
/// let product = Product::new(
///     "mytool",
///     "mytool",
///     "--version",
///     r"mytool v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)",
/// );
/// assert_eq!(product.name, "mytool");
/// ```
#[derive(Debug, Clone)]
pub struct Product {
    /// Stable product name, as it appears in release index URLs and archive
    /// filenames (e.g. `"terraform"`).
    pub name: String,

    /// Base name of the executable, without any platform suffix.
    pub executable_base: String,

    /// Argument passed to a candidate executable to make it report its
    /// version (e.g. `"version"` or `"--version"`).
    pub version_arg: String,

    /// Pattern applied to the candidate's combined output; capture group 1
    /// must be the semantic version.
    pub version_pattern: Regex,

    /// How to build this product from a source checkout, if it supports the
    /// build-from-revision source.
    pub build: Option<BuildSpec>,
}

/// How to produce a product's executable from a source checkout.
///
/// The build toolchain is external and opaque: the command is run in the
/// checkout root with its exit status and captured output as the only
/// signals consumed, and it is expected to leave the product executable in
/// the checkout root.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    /// Where to clone the product's sources from.
    pub repository_url: String,

    /// Program and arguments of the build command, run in the checkout root.
    pub build_command: Vec<String>,
}

impl Product {
    /// Construct a product descriptor.
    ///
    /// `version_pattern` must contain one capture group holding the semver
    /// text; an invalid pattern is a programming error and panics.
    pub fn new(name: &str, executable_base: &str, version_arg: &str, version_pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            executable_base: executable_base.to_string(),
            version_arg: version_arg.to_string(),
            version_pattern: Regex::new(version_pattern).expect("invalid version pattern"),
            build: None,
        }
    }

    /// Attach a [`BuildSpec`], enabling the build-from-revision source.
    pub fn with_build(mut self, build: BuildSpec) -> Self {
        self.build = Some(build);
        self
    }

    /// Platform-appropriate executable filename.
    ///
    /// ```rust
    /// use binsource::product;
    ///
    /// let name = product::terraform().executable_name();
    /// #[cfg(unix)]
    /// assert_eq!(name, "terraform");
    /// #[cfg(windows)]
    /// assert_eq!(name, "terraform.exe");
    /// ```
    pub fn executable_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.executable_base)
        } else {
            self.executable_base.clone()
        }
    }

    /// Extract the product's version from a candidate executable's combined
    /// version output. `None` when the output doesn't match the pattern or
    /// the matched text is not a valid semver.
    pub fn parse_version_output(&self, output: &str) -> Option<Version> {
        let caps = self.version_pattern.captures(output)?;
        let text = caps.get(1)?.as_str();
        Version::parse(text).ok()
    }
}

/// Terraform, as published on its official release index.
pub fn terraform() -> Product {
    Product::new(
        "terraform",
        "terraform",
        "version",
        r"Terraform v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?)",
    )
    .with_build(BuildSpec {
        repository_url: "https://github.com/hashicorp/terraform.git".to_string(),
        build_command: vec![
            "go".to_string(),
            "build".to_string(),
            "-o".to_string(),
            ".".to_string(),
        ],
    })
}

/// Vault, as published on its official release index.
pub fn vault() -> Product {
    Product::new(
        "vault",
        "vault",
        "version",
        r"Vault v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.+-]+)?)",
    )
    .with_build(BuildSpec {
        repository_url: "https://github.com/hashicorp/vault.git".to_string(),
        build_command: vec![
            "go".to_string(),
            "build".to_string(),
            "-o".to_string(),
            ".".to_string(),
        ],
    })
}
