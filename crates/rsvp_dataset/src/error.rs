//! Error types for the dataset loader

use std::path::{Path, PathBuf};

use rsvp_types::{IdError, RecordingError};
use thiserror::Error;

use crate::mat::MatError;

/// The two ways a load can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested file or directory does not exist or cannot be opened.
    NotFound,
    /// The file exists but its content does not match the expected layout.
    Format,
}

/// Dataset loader error types
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("not found: {}: {reason}", .path.display())]
    NotFound { path: PathBuf, reason: String },

    #[error("format error{}: {message}", in_path(.path))]
    Format {
        path: Option<PathBuf>,
        message: String,
    },
}

fn in_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::NotFound { .. } => ErrorKind::NotFound,
            DatasetError::Format { .. } => ErrorKind::Format,
        }
    }

    pub fn not_found(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DatasetError::NotFound {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn format(path: &Path, message: impl ToString) -> Self {
        DatasetError::Format {
            path: Some(path.to_path_buf()),
            message: message.to_string(),
        }
    }

    /// Map an I/O failure while opening or reading `path`. Reads that stop
    /// short are content errors; everything else means the file is unusable.
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                Self::format(path, err)
            }
            _ => Self::not_found(path, err),
        }
    }

    pub(crate) fn from_mat(path: &Path, err: MatError) -> Self {
        Self::format(path, err)
    }

    pub(crate) fn from_recording(path: &Path, err: RecordingError) -> Self {
        Self::format(path, err)
    }

    pub(crate) fn from_id(path: impl Into<PathBuf>, err: IdError) -> Self {
        Self::not_found(path, err)
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        DatasetError::Format {
            path: None,
            message: err.to_string(),
        }
    }
}

/// Result type for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_display() {
        let err = DatasetError::not_found("/data/S1-S10.mat/sub1A.mat", "No such file");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            err.to_string(),
            "not found: /data/S1-S10.mat/sub1A.mat: No such file"
        );

        let err = DatasetError::format(Path::new("x.mat"), "bad tag");
        assert_eq!(err.kind(), ErrorKind::Format);
        assert_eq!(err.to_string(), "format error in x.mat: bad tag");

        let err: DatasetError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().starts_with("format error: "));
    }

    #[test]
    fn test_io_mapping() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert_eq!(DatasetError::from_io(Path::new("a"), eof).kind(), ErrorKind::Format);

        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(DatasetError::from_io(Path::new("a"), missing).kind(), ErrorKind::NotFound);
    }
}
