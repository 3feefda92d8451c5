//! Integrity checks against the published SHA-256 digests.
//!
//! Verification only inspects what is already on disk; fetching missing
//! files is left to the caller.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DatasetError, DatasetResult};

/// Read size used while hashing.
pub const CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// One published file and its digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file_name: &'static str,
    pub sha256: &'static str,
}

const fn entry(file_name: &'static str, sha256: &'static str) -> ManifestEntry {
    ManifestEntry { file_name, sha256 }
}

/// Zip archives, each unpacking to a folder of the same name minus `.zip`.
pub const ARCHIVES: [ManifestEntry; 7] = [
    entry("S1-S10.mat.zip", "02893ac902dc9bb39e99e35f44f9c8cddb6b810a6f255ee33258c37fbd4ed08e"),
    entry("S11-S20.mat.zip", "d137b6f4f861932701d3f4bf07b4a143c34095f5aabef2f9372be018e78956d3"),
    entry("S21-S30.mat.zip", "6ac5f9cb7fead05942bbcc639cc28e648c5219b45c6624c838045ba26e29995d"),
    entry("S31-S40.mat.zip", "c53f8400502175e2069e1645572852c0fc01d304fec060ccafe1394428044954"),
    entry("S41-S50.mat.zip", "5f6d5fa5758ff00f630ddf87984ded56d42a271edc0c199f06d7d549609c2ab1"),
    entry("S51-S60.mat.zip", "827429e2c3224860d33ae82d78ef52846882bd193176cf9edf5d4a27dec74ced"),
    entry("S61-S64.mat.zip", "c500e8ef2062f71c3b7a929c26d1e6068fb73ede4593b7983d0bdb0fa8af51b3"),
];

/// Documentation and montage files shipped alongside the archives.
pub const SIDE_FILES: [ManifestEntry; 4] = [
    entry("64-channels.loc", "947e5a743d86a5c94eaca6c442f1858f39d19486a5e841df4147063e15e9108c"),
    entry("note.txt", "a70d6a729d861e8ad97dd1a6eb62f40bd93f32dca079d544ff9e269527d917f8"),
    entry("Readme.txt", "5e67e6fe3596ff8b3691d812ab8ecf9286477d0b15361895c695977bebd57981"),
    entry(
        "subjects_information.xlsx",
        "beee4446bfdebd8d83fbe360ca4970525fd9921906b1dffab9ced99277aee68d",
    ),
];

/// Every published file, side files first.
pub fn manifest() -> impl Iterator<Item = &'static ManifestEntry> {
    SIDE_FILES.iter().chain(ARCHIVES.iter())
}

fn hash_reader<R: Read>(mut reader: R, hasher: &mut Sha256) -> io::Result<()> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buf[..n]);
    }
}

/// Lowercase hex SHA-256 of one file.
pub fn file_sha256(path: impl AsRef<Path>) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hash_reader(File::open(path)?, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 over the contents of every file below `dir`, in sorted path
/// order. With `include`, only files whose name is listed contribute.
pub fn folder_sha256(dir: impl AsRef<Path>, include: Option<&[&str]>) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let walker = WalkDir::new(dir).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if include.map_or(true, |names| names.contains(&&*name)) {
            hash_reader(File::open(entry.path())?, &mut hasher)?;
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of checking one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum FileStatus {
    Missing,
    /// Present; hashing was disabled.
    Present,
    Verified,
    Mismatch { actual: String },
}

impl FileStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, FileStatus::Present | FileStatus::Verified)
    }
}

pub fn verify_file(path: &Path, expected: &str, verify_sha256: bool) -> io::Result<FileStatus> {
    if !path.is_file() {
        return Ok(FileStatus::Missing);
    }
    if !verify_sha256 {
        return Ok(FileStatus::Present);
    }
    let actual = file_sha256(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(FileStatus::Verified)
    } else {
        Ok(FileStatus::Mismatch { actual })
    }
}

/// Status of every manifest entry under one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub root: PathBuf,
    pub entries: Vec<(String, FileStatus)>,
}

impl VerificationReport {
    pub fn is_ok(&self) -> bool {
        self.entries.iter().all(|(_, status)| status.is_ok())
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, s)| *s == FileStatus::Missing)
            .map(|(name, _)| name.as_str())
    }

    pub fn mismatched(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, s)| matches!(s, FileStatus::Mismatch { .. }))
            .map(|(name, _)| name.as_str())
    }
}

/// Check every published file under `root`.
pub fn verify_manifest(root: &Path, verify_sha256: bool) -> DatasetResult<VerificationReport> {
    verify_entries(root, manifest(), verify_sha256)
}

pub(crate) fn verify_entries<'a>(
    root: &Path,
    entries: impl Iterator<Item = &'a ManifestEntry>,
    verify_sha256: bool,
) -> DatasetResult<VerificationReport> {
    let mut report = VerificationReport {
        root: root.to_path_buf(),
        entries: Vec::new(),
    };
    for entry in entries {
        let path = root.join(entry.file_name);
        let status = verify_file(&path, entry.sha256, verify_sha256)
            .map_err(|e| DatasetError::from_io(&path, e))?;
        match &status {
            FileStatus::Missing => warn!(file = entry.file_name, "missing dataset file"),
            FileStatus::Mismatch { actual } => warn!(
                file = entry.file_name,
                expected = entry.sha256,
                %actual,
                "checksum mismatch"
            ),
            FileStatus::Present | FileStatus::Verified => {
                debug!(file = entry.file_name, ?status, "dataset file ok")
            }
        }
        report.entries.push((entry.file_name.to_string(), status));
    }
    info!(
        root = %root.display(),
        ok = report.is_ok(),
        checked = report.entries.len(),
        "verified dataset files"
    );
    Ok(report)
}
