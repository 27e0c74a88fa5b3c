//! Extracting the product executable (and enterprise license files) from a
//! verified release archive.
//!
//! Extraction only ever runs on bytes whose manifest digest has already
//! been checked. An archive must contain exactly one top-level executable
//! candidate; anything else is a structural defect of the release.

use crate::error::InstallError;
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// License files an enterprise release must carry.
pub(crate) const ENTERPRISE_LICENSE_FILES: [&str; 2] = ["EULA.txt", "TermsOfEvaluation.txt"];

/// A top-level file pulled out of the archive.
struct ArchiveFile {
    name: String,
    bytes: Vec<u8>,
    mode: Option<u32>,
}

impl ArchiveFile {
    fn is_license(&self) -> bool {
        ENTERPRISE_LICENSE_FILES.contains(&self.name.as_str())
    }

    fn is_executable_candidate(&self, expected_name: &str) -> bool {
        if self.is_license() {
            return false;
        }
        match self.mode {
            Some(mode) => mode & 0o111 != 0,
            // Archives built without unix metadata: fall back to the name.
            None => self.name == expected_name,
        }
    }
}

/// Extract the single expected executable from `bytes` into `dest_dir`,
/// preserving executable permission bits, and - when `license_dir` is given
/// - the enterprise license files alongside it.
///
/// Returns the path of the extracted executable.
pub(crate) fn extract_executable(
    bytes: &[u8],
    archive_filename: &str,
    expected_name: &str,
    dest_dir: &Path,
    license_dir: Option<&Path>,
) -> Result<PathBuf, InstallError> {
    let files = if archive_filename.ends_with(".zip") {
        read_zip(bytes, archive_filename)?
    } else if archive_filename.ends_with(".tar.gz") || archive_filename.ends_with(".tgz") {
        read_tar_gz(bytes, archive_filename)?
    } else {
        return Err(InstallError::Structural {
            message: format!("unsupported archive format: {archive_filename}"),
        });
    };

    let mut executables: Vec<&ArchiveFile> = files
        .iter()
        .filter(|f| f.is_executable_candidate(expected_name))
        .collect();
    if executables.is_empty() {
        return Err(InstallError::Structural {
            message: format!("{archive_filename} contains no top-level executable"),
        });
    }
    if executables.len() > 1 {
        let names: Vec<&str> = executables.iter().map(|f| f.name.as_str()).collect();
        return Err(InstallError::Structural {
            message: format!(
                "{archive_filename} contains more than one top-level executable: {}",
                names.join(", ")
            ),
        });
    }
    let executable = executables.remove(0);

    std::fs::create_dir_all(dest_dir)?;
    let exec_path = dest_dir.join(&executable.name);
    std::fs::write(&exec_path, &executable.bytes)?;
    set_executable(&exec_path, executable.mode)?;
    debug!(path = %exec_path.display(), "extracted executable");

    if let Some(license_dir) = license_dir {
        std::fs::create_dir_all(license_dir)?;
        for required in ENTERPRISE_LICENSE_FILES {
            let Some(file) = files.iter().find(|f| f.name == required) else {
                return Err(InstallError::Structural {
                    message: format!(
                        "enterprise install requested but {archive_filename} has no {required}"
                    ),
                });
            };
            std::fs::write(license_dir.join(required), &file.bytes)?;
        }
        debug!(dir = %license_dir.display(), "placed enterprise license files");
    }

    Ok(exec_path)
}

/// Top-level regular files of a zip archive.
fn read_zip(bytes: &[u8], archive_filename: &str) -> Result<Vec<ArchiveFile>, InstallError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| InstallError::Structural {
            message: format!("{archive_filename} is not a readable zip archive: {e}"),
        })?;

    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| InstallError::Structural {
            message: format!("unreadable entry in {archive_filename}: {e}"),
        })?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().and_then(top_level_name) else {
            continue;
        };
        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content)?;
        files.push(ArchiveFile {
            name,
            bytes: content,
            mode: entry.unix_mode(),
        });
    }
    Ok(files)
}

/// Top-level regular files of a gzip-compressed tarball.
fn read_tar_gz(bytes: &[u8], archive_filename: &str) -> Result<Vec<ArchiveFile>, InstallError> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);

    let mut files = Vec::new();
    let entries = archive.entries().map_err(|e| InstallError::Structural {
        message: format!("{archive_filename} is not a readable tar archive: {e}"),
    })?;
    for entry in entries {
        let mut entry = entry.map_err(|e| InstallError::Structural {
            message: format!("unreadable entry in {archive_filename}: {e}"),
        })?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let Some(name) = entry.path().ok().and_then(|p| top_level_name(p.into_owned())) else {
            continue;
        };
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        files.push(ArchiveFile {
            name,
            bytes: content,
            mode: entry.header().mode().ok(),
        });
    }
    Ok(files)
}

/// The file name when `path` is a single top-level component, `None` for
/// nested paths.
fn top_level_name(path: PathBuf) -> Option<String> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    }
}

#[cfg(unix)]
fn set_executable(path: &Path, mode: Option<u32>) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = match mode {
        Some(m) if m & 0o111 != 0 => m & 0o7777,
        _ => 0o755,
    };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path, _mode: Option<u32>) -> std::io::Result<()> {
    Ok(())
}
