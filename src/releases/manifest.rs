//! Checksum manifest parsing and signature verification.
//!
//! A release version publishes a `SHA256SUMS` manifest (standard
//! `sha256sum` line format, one entry per distributed file) and a detached
//! ed25519 signature over the manifest's exact bytes. Nothing downloaded is
//! trusted until the signature verifies against the release signing key and
//! the archive digest matches its manifest entry.

use crate::error::InstallError;
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

/// One row of the checksum manifest: a filename and its hex digest. The
/// target platform and architecture are encoded in the filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Distributed filename, e.g. `terraform_1.3.7_linux_amd64.zip`.
    pub filename: String,
    /// Lowercase hex SHA-256 digest of that file.
    pub digest: String,
}

/// A parsed checksum manifest, retaining the exact bytes the detached
/// signature covers.
#[derive(Debug, Clone)]
pub struct ChecksumManifest {
    raw: Vec<u8>,
    entries: Vec<ManifestEntry>,
}

impl ChecksumManifest {
    /// Parse manifest bytes. Blank lines, comments, and malformed lines are
    /// skipped; the raw bytes are kept verbatim for signature verification.
    pub fn parse(raw: Vec<u8>) -> Self {
        let text = String::from_utf8_lossy(&raw);
        let entries = text
            .lines()
            .filter_map(parse_sum_line)
            .collect();
        Self { raw, entries }
    }

    /// All parsed entries, in manifest order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// The entry matching `filename` exactly, if any. A missing entry means
    /// the release does not distribute that file (e.g. an unsupported
    /// platform).
    pub fn entry_for(&self, filename: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|entry| entry.filename == filename || entry.filename.trim_start_matches("./") == filename)
    }

    /// Verify the detached signature over this manifest's exact bytes.
    ///
    /// Fatal on mismatch: the error is never retried and never downgraded.
    pub fn verify_signature(
        &self,
        signature_raw: &[u8],
        key: &VerifyingKey,
    ) -> Result<(), InstallError> {
        let signature = parse_signature(signature_raw)?;
        key.verify(&self.raw, &signature)
            .map_err(|_| InstallError::Verification {
                artifact: "checksum manifest".to_string(),
                message: "detached signature does not verify against the release signing key"
                    .to_string(),
            })
    }
}

/// Parse one `sha256sum` line: `<hex digest>  <filename>`, tolerating the
/// `*` binary-mode marker and collapsed whitespace.
fn parse_sum_line(line: &str) -> Option<ManifestEntry> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let digest = parts.next()?;
    let filename = parts.next()?.trim_start_matches('*');
    if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(ManifestEntry {
        filename: filename.to_string(),
        digest: digest.to_ascii_lowercase(),
    })
}

/// Decode a detached ed25519 signature: 64 raw bytes, or hex/base64 text.
fn parse_signature(raw: &[u8]) -> Result<Signature, InstallError> {
    if raw.len() == 64 {
        let bytes: [u8; 64] = raw.try_into().map_err(|_| invalid_signature())?;
        return Ok(Signature::from_bytes(&bytes));
    }

    let text = std::str::from_utf8(raw)
        .map_err(|_| invalid_signature())?
        .trim();
    let decoded = decode_hex_or_base64(text).ok_or_else(invalid_signature)?;
    let bytes: [u8; 64] = decoded.try_into().map_err(|_| invalid_signature())?;
    Ok(Signature::from_bytes(&bytes))
}

fn invalid_signature() -> InstallError {
    InstallError::Verification {
        artifact: "checksum manifest".to_string(),
        message: "signature is not a 64-byte ed25519 signature in raw, hex, or base64 form"
            .to_string(),
    }
}

fn decode_hex_or_base64(text: &str) -> Option<Vec<u8>> {
    if text.is_empty() {
        return None;
    }
    if text.len() % 2 == 0 && text.chars().all(|c| c.is_ascii_hexdigit()) {
        return decode_hex(text);
    }
    general_purpose::STANDARD
        .decode(text)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(text))
        .ok()
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}

/// Lowercase hex SHA-256 of `bytes`.
pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn test_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    const SAMPLE: &str = "\
9a1b1d1e8f9c0b8a7d6e5f4a3b2c1d0e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4c  demo_1.2.3_linux_amd64.zip
0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a69788796a5b4c3d2e1f0  demo_1.2.3_darwin_arm64.zip
";

    #[test]
    fn test_parse_entries() {
        let manifest = ChecksumManifest::parse(SAMPLE.as_bytes().to_vec());
        assert_eq!(manifest.entries().len(), 2);
        let entry = manifest.entry_for("demo_1.2.3_linux_amd64.zip").unwrap();
        assert!(entry.digest.starts_with("9a1b"));
    }

    #[test]
    fn test_parse_tolerates_binary_marker_and_noise() {
        let text = format!(
            "# release 1.2.3\n\n{} *demo_1.2.3_windows_amd64.zip\nnot a sum line\n",
            "ab".repeat(32)
        );
        let manifest = ChecksumManifest::parse(text.into_bytes());
        assert_eq!(manifest.entries().len(), 1);
        assert!(manifest.entry_for("demo_1.2.3_windows_amd64.zip").is_some());
    }

    #[test]
    fn test_missing_entry_is_none() {
        let manifest = ChecksumManifest::parse(SAMPLE.as_bytes().to_vec());
        assert!(manifest.entry_for("demo_1.2.3_solaris_sparc.zip").is_none());
    }

    #[test]
    fn test_rejects_short_digest() {
        let manifest = ChecksumManifest::parse(b"abcd  file.zip\n".to_vec());
        assert!(manifest.entries().is_empty());
    }

    #[test]
    fn test_signature_verifies_raw_hex_and_base64() {
        let key = test_key();
        let manifest = ChecksumManifest::parse(SAMPLE.as_bytes().to_vec());
        let signature = key.sign(SAMPLE.as_bytes());
        let verifying = key.verifying_key();

        manifest
            .verify_signature(&signature.to_bytes(), &verifying)
            .unwrap();

        let hex: String = signature
            .to_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        manifest
            .verify_signature(hex.as_bytes(), &verifying)
            .unwrap();

        let b64 = general_purpose::STANDARD.encode(signature.to_bytes());
        manifest
            .verify_signature(b64.as_bytes(), &verifying)
            .unwrap();
    }

    #[test]
    fn test_tampered_manifest_fails_verification() {
        let key = test_key();
        let signature = key.sign(SAMPLE.as_bytes());

        let tampered = SAMPLE.replace("linux", "l1nux");
        let manifest = ChecksumManifest::parse(tampered.into_bytes());
        let result = manifest.verify_signature(&signature.to_bytes(), &key.verifying_key());
        assert!(matches!(result, Err(InstallError::Verification { .. })));
    }

    #[test]
    fn test_wrong_key_fails_verification() {
        let key = test_key();
        let other = SigningKey::from_bytes(&[9u8; 32]);
        let manifest = ChecksumManifest::parse(SAMPLE.as_bytes().to_vec());
        let signature = key.sign(SAMPLE.as_bytes());
        let result = manifest.verify_signature(&signature.to_bytes(), &other.verifying_key());
        assert!(matches!(result, Err(InstallError::Verification { .. })));
    }

    #[test]
    fn test_garbage_signature_is_verification_error() {
        let manifest = ChecksumManifest::parse(SAMPLE.as_bytes().to_vec());
        let key = test_key().verifying_key();
        let result = manifest.verify_signature(b"not a signature", &key);
        assert!(matches!(result, Err(InstallError::Verification { .. })));
    }

    #[test]
    fn test_sha256_hex() {
        // sha256 of the empty string is a fixed vector.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
