//! Where each session file lives under the dataset root.
//!
//! The published archives unpack into one folder per decade of subjects:
//!
//! ```text
//! <root>/S1-S10.mat/sub1A.mat
//! <root>/S1-S10.mat/sub1B.mat
//! ...
//! <root>/S61-S64.mat/sub64B.mat
//! ```
//!
//! Each file holds both blocks of one (subject, group).

use std::path::{Path, PathBuf};

use rsvp_types::{BlockNumber, Group, SubjectId, N_SUBJECTS};

/// Variable holding the signal matrix of `block`.
pub fn signal_variable(block: BlockNumber) -> &'static str {
    match block.get() {
        1 => "EEGdata1",
        _ => "EEGdata2",
    }
}

/// Onset sample indices, one row per block.
pub const TRIGGER_VARIABLE: &str = "trigger_positions";
/// Class codes, one row per block.
pub const LABEL_VARIABLE: &str = "class_labels";

/// Name of the extracted folder that holds `subject`.
pub fn subject_folder(subject: SubjectId) -> String {
    let first = (subject.get() - 1) / 10 * 10 + 1;
    let last = (first + 9).min(N_SUBJECTS);
    format!("S{first}-S{last}.mat")
}

pub fn session_file_name(subject: SubjectId, group: Group) -> String {
    format!("sub{}{}.mat", subject.get(), group)
}

/// Full path of the file holding both blocks of (subject, group).
pub fn session_path(root: &Path, subject: SubjectId, group: Group) -> PathBuf {
    root.join(subject_folder(subject))
        .join(session_file_name(subject, group))
}

/// All extracted folder names, in subject order.
pub fn subject_folders() -> Vec<String> {
    let mut folders: Vec<String> = SubjectId::all().map(subject_folder).collect();
    folders.dedup();
    folders
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(n: i64) -> SubjectId {
        SubjectId::new(n).unwrap()
    }

    #[test]
    fn test_subject_folders() {
        assert_eq!(subject_folder(subject(1)), "S1-S10.mat");
        assert_eq!(subject_folder(subject(10)), "S1-S10.mat");
        assert_eq!(subject_folder(subject(11)), "S11-S20.mat");
        assert_eq!(subject_folder(subject(60)), "S51-S60.mat");
        assert_eq!(subject_folder(subject(61)), "S61-S64.mat");
        assert_eq!(subject_folder(subject(64)), "S61-S64.mat");
        assert_eq!(subject_folders().len(), 7);
    }

    #[test]
    fn test_session_path() {
        let path = session_path(Path::new("/data/thu"), subject(23), Group::B);
        assert_eq!(path, PathBuf::from("/data/thu/S21-S30.mat/sub23B.mat"));
    }

    #[test]
    fn test_signal_variable() {
        assert_eq!(signal_variable(BlockNumber::FIRST), "EEGdata1");
        assert_eq!(signal_variable(BlockNumber::SECOND), "EEGdata2");
    }
}
