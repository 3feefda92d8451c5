//! Reads session files and turns them into `Recording`s.

use std::path::{Path, PathBuf};

use rsvp_types::{
    BlockId, BlockNumber, Group, Label, Recording, Session, StimulusEvent, SubjectId,
    EVENTS_PER_BLOCK, SAMPLE_RATE_HZ,
};
use tracing::{debug, info};

use crate::checksum::{self, VerificationReport};
use crate::config::DatasetConfig;
use crate::error::{DatasetError, DatasetResult};
use crate::layout::{self, LABEL_VARIABLE, TRIGGER_VARIABLE};
use crate::mat::{MatArray, MatFile};

/// Load one block.
///
/// Takes raw identifiers so that out-of-range requests (subject 0, group
/// `'C'`, block 3) surface as [`NotFound`](crate::ErrorKind::NotFound): no
/// file exists for them.
pub fn load_recording(
    root: impl AsRef<Path>,
    subject: i64,
    group: char,
    block: i64,
) -> DatasetResult<Recording> {
    let root = root.as_ref();
    let id = BlockId::parse(subject, group, block).map_err(|e| {
        DatasetError::from_id(root.join(format!("sub{subject}{group}.mat")), e)
    })?;
    read_block(root, id, SAMPLE_RATE_HZ)
}

/// Handle on an extracted copy of the dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    config: DatasetConfig,
}

impl Dataset {
    pub fn open(config: DatasetConfig) -> DatasetResult<Self> {
        config.validate()?;
        if !config.root.is_dir() {
            return Err(DatasetError::not_found(
                &config.root,
                "dataset root is not a directory",
            ));
        }
        info!(root = %config.root.display(), "opened dataset");
        Ok(Self { config })
    }

    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Path of the file holding both blocks of (subject, group).
    pub fn path_for(&self, subject: SubjectId, group: Group) -> PathBuf {
        layout::session_path(self.root(), subject, group)
    }

    pub fn load(&self, id: BlockId) -> DatasetResult<Recording> {
        read_block(self.root(), id, self.config.sample_rate_hz)
    }

    /// Load both blocks of a session, parsing the file once.
    pub fn load_session(&self, subject: SubjectId, group: Group) -> DatasetResult<Session> {
        let path = self.path_for(subject, group);
        let mut file = read_mat(&path, None)?;
        let rate = self.config.sample_rate_hz;
        let first = decode_block(
            &mut file,
            BlockId::new(subject, group, BlockNumber::FIRST),
            rate,
            &path,
        )?;
        let second = decode_block(
            &mut file,
            BlockId::new(subject, group, BlockNumber::SECOND),
            rate,
            &path,
        )?;
        Session::new(first, second)
            .map_err(|_| DatasetError::format(&path, "blocks do not form one session"))
    }

    /// Every block of the dataset in canonical order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> {
        BlockId::all()
    }

    /// Sessions whose file exists under the root.
    pub fn sessions_present(&self) -> Vec<(SubjectId, Group)> {
        SubjectId::all()
            .flat_map(|s| Group::ALL.into_iter().map(move |g| (s, g)))
            .filter(|&(s, g)| self.path_for(s, g).is_file())
            .collect()
    }

    /// Check the published archives and side files under the root.
    pub fn verify(&self) -> DatasetResult<VerificationReport> {
        checksum::verify_manifest(self.root(), self.config.verify_sha256)
    }
}

fn read_mat(path: &Path, only: Option<&[&str]>) -> DatasetResult<MatFile> {
    let bytes = std::fs::read(path).map_err(|e| DatasetError::from_io(path, e))?;
    let file = match only {
        Some(names) => MatFile::from_bytes_selected(&bytes, names),
        None => MatFile::from_bytes(&bytes),
    };
    file.map_err(|e| DatasetError::from_mat(path, e))
}

pub(crate) fn read_block(
    root: &Path,
    id: BlockId,
    sample_rate_hz: u32,
) -> DatasetResult<Recording> {
    let path = layout::session_path(root, id.subject, id.group);
    let signal = layout::signal_variable(id.block);
    let mut file = read_mat(&path, Some(&[signal, TRIGGER_VARIABLE, LABEL_VARIABLE][..]))?;
    decode_block(&mut file, id, sample_rate_hz, &path)
}

fn decode_block(
    file: &mut MatFile,
    id: BlockId,
    sample_rate_hz: u32,
    path: &Path,
) -> DatasetResult<Recording> {
    let events = decode_events(file, id.block, path)?;

    let name = layout::signal_variable(id.block);
    let signal = file.take(name).ok_or_else(|| missing(path, name))?;
    ensure_real(&signal, path)?;
    if signal.dims().len() != 2 {
        return Err(DatasetError::format(
            path,
            format!("{name} has dimensions {:?}, expected a matrix", signal.dims()),
        ));
    }
    let data = signal
        .into_array2()
        .map_err(|e| DatasetError::from_mat(path, e))?;

    let recording = Recording::new(id, data, sample_rate_hz, events)
        .map_err(|e| DatasetError::from_recording(path, e))?;
    info!(
        block = %id,
        samples = recording.n_samples(),
        targets = recording.targets().count(),
        "loaded block"
    );
    Ok(recording)
}

fn decode_events(
    file: &MatFile,
    block: BlockNumber,
    path: &Path,
) -> DatasetResult<Vec<StimulusEvent>> {
    let onsets = event_table(file, TRIGGER_VARIABLE, path)?;
    let labels = event_table(file, LABEL_VARIABLE, path)?;
    let row = block.index();

    let cell = |table: &MatArray, i: usize| table.get(row, i).unwrap_or(f64::NAN);
    let events = (0..EVENTS_PER_BLOCK)
        .map(|i| {
            let raw = cell(onsets, i);
            let onset = integral(raw)
                .and_then(|v| usize::try_from(v).ok())
                .ok_or_else(|| {
                    DatasetError::format(
                        path,
                        format!("{TRIGGER_VARIABLE}[{row}, {i}] = {raw} is not a sample index"),
                    )
                })?;
            let raw = cell(labels, i);
            let label = integral(raw).and_then(Label::from_code).ok_or_else(|| {
                DatasetError::format(
                    path,
                    format!("{LABEL_VARIABLE}[{row}, {i}] = {raw} is not a class code"),
                )
            })?;
            Ok(StimulusEvent::at_index(i, onset, label))
        })
        .collect::<DatasetResult<Vec<_>>>()?;
    debug!(block = %block, count = events.len(), "decoded stimulus events");
    Ok(events)
}

/// Fetch a `2 x 4000` per-block event table.
fn event_table<'f>(file: &'f MatFile, name: &str, path: &Path) -> DatasetResult<&'f MatArray> {
    let table = file
        .require(name)
        .map_err(|e| DatasetError::from_mat(path, e))?;
    ensure_real(table, path)?;
    if table.dims() != [BlockNumber::ALL.len(), EVENTS_PER_BLOCK].as_slice() {
        return Err(DatasetError::format(
            path,
            format!(
                "{name} has dimensions {:?}, expected [2, {EVENTS_PER_BLOCK}]",
                table.dims()
            ),
        ));
    }
    Ok(table)
}

fn ensure_real(array: &MatArray, path: &Path) -> DatasetResult<()> {
    if array.is_complex() {
        return Err(DatasetError::format(
            path,
            format!("{} is complex", array.name()),
        ));
    }
    Ok(())
}

fn missing(path: &Path, name: &str) -> DatasetError {
    DatasetError::format(path, format!("variable {name} is missing"))
}

fn integral(v: f64) -> Option<i64> {
    // Bounds keep the cast exact.
    (v.is_finite() && v.fract() == 0.0 && v.abs() < 9.0e15).then(|| v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mat::{ArrayClass, MatWriter, FLAG_COMPLEX};
    use tempfile::tempdir;

    fn write_session(root: &Path, writer: MatWriter) -> PathBuf {
        write_session_bytes(root, &writer.to_bytes().unwrap())
    }

    fn write_session_bytes(root: &Path, bytes: &[u8]) -> PathBuf {
        let subject = SubjectId::new(5).unwrap();
        let path = layout::session_path(root, subject, Group::A);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn event_rows(
        onset: impl Fn(usize) -> f64,
        label: impl Fn(usize) -> f64,
    ) -> (Vec<f64>, Vec<f64>) {
        // Column-major 2 x 4000: both blocks share the same events here.
        let mut onsets = Vec::new();
        let mut labels = Vec::new();
        for i in 0..EVENTS_PER_BLOCK {
            onsets.extend([onset(i), onset(i)]);
            labels.extend([label(i), label(i)]);
        }
        (onsets, labels)
    }

    fn session_writer(samples: usize, onsets: Vec<f64>, labels: Vec<f64>) -> MatWriter {
        let signal = vec![0.5; 64 * samples];
        MatWriter::new()
            .add("EEGdata1", 64, samples, signal.clone())
            .add("EEGdata2", 64, samples, signal)
            .add(TRIGGER_VARIABLE, 2, EVENTS_PER_BLOCK, onsets)
            .add(LABEL_VARIABLE, 2, EVENTS_PER_BLOCK, labels)
    }

    fn block(n: i64) -> BlockId {
        BlockId::parse(5, 'A', n).unwrap()
    }

    #[test]
    fn test_loads_minimal_session() {
        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(
            |i| (i * 2) as f64,
            |i| if i % 40 == 0 { 1.0 } else { 2.0 },
        );
        write_session(dir.path(), session_writer(8001, onsets, labels));

        let rec = read_block(dir.path(), block(2), 250).unwrap();
        assert_eq!(rec.block(), BlockNumber::SECOND);
        assert_eq!(rec.n_samples(), 8001);
        assert_eq!(rec.events()[3999].onset, 7998);
        assert_eq!(rec.targets().count(), 100);
    }

    #[test]
    fn test_bad_onset_values() {
        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(|i| if i == 17 { 34.5 } else { (i * 2) as f64 }, |_| 2.0);
        write_session(dir.path(), session_writer(8001, onsets, labels));

        let err = read_block(dir.path(), block(1), 250).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("trigger_positions[0, 17]"));
    }

    #[test]
    fn test_bad_label_codes() {
        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(|i| (i * 2) as f64, |i| if i == 3 { 0.0 } else { 2.0 });
        write_session(dir.path(), session_writer(8001, onsets, labels));

        let err = read_block(dir.path(), block(1), 250).unwrap_err();
        assert!(err.to_string().contains("class_labels[0, 3]"));
    }

    #[test]
    fn test_event_table_shape() {
        let dir = tempdir().unwrap();
        let writer = MatWriter::new()
            .add("EEGdata1", 64, 10, vec![0.0; 640])
            .add(TRIGGER_VARIABLE, 1, 4000, vec![1.0; 4000])
            .add(LABEL_VARIABLE, 2, 4000, vec![2.0; 8000]);
        write_session(dir.path(), writer);

        let err = read_block(dir.path(), block(1), 250).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("trigger_positions has dimensions [1, 4000]"));
    }

    #[test]
    fn test_missing_signal_variable() {
        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(|i| (i * 2) as f64, |_| 2.0);
        let writer = MatWriter::new()
            .add("EEGdata1", 64, 8001, vec![0.0; 64 * 8001])
            .add(TRIGGER_VARIABLE, 2, EVENTS_PER_BLOCK, onsets)
            .add(LABEL_VARIABLE, 2, EVENTS_PER_BLOCK, labels);
        write_session(dir.path(), writer);

        assert!(read_block(dir.path(), block(1), 250).is_ok());
        let err = read_block(dir.path(), block(2), 250).unwrap_err();
        assert!(err.to_string().contains("variable EEGdata2 is missing"));
    }

    #[test]
    fn test_opaque_variable_does_not_block_loading() {
        use crate::mat::{raw, HEADER_LEN};

        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(|i| (i * 2) as f64, |_| 2.0);
        let session = session_writer(8001, onsets, labels).to_bytes().unwrap();
        let mut bytes = session[..HEADER_LEN].to_vec();
        bytes.extend_from_slice(&raw::opaque("s"));
        bytes.extend_from_slice(&session[HEADER_LEN..]);
        write_session_bytes(dir.path(), &bytes);

        let rec = load_recording(dir.path(), 5, 'A', 1).unwrap();
        assert_eq!(rec.n_samples(), 8001);
    }

    #[test]
    fn test_complex_signal_is_rejected() {
        use crate::mat::raw;

        let dir = tempdir().unwrap();
        let (onsets, labels) = event_rows(|i| (i * 2) as f64, |_| 2.0);
        let mut bytes = MatWriter::new()
            .add(TRIGGER_VARIABLE, 2, EVENTS_PER_BLOCK, onsets)
            .add(LABEL_VARIABLE, 2, EVENTS_PER_BLOCK, labels)
            .to_bytes()
            .unwrap();
        bytes.extend_from_slice(&raw::matrix(
            ArrayClass::Double as u32 | FLAG_COMPLEX,
            &[
                raw::dims(64, 1),
                raw::text("EEGdata1"),
                raw::doubles(&[0.0; 64]),
                raw::doubles(&[1.0; 64]),
            ],
        ));
        write_session_bytes(dir.path(), &bytes);

        let err = load_recording(dir.path(), 5, 'A', 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("EEGdata1 is complex"), "{err}");
    }

    #[test]
    fn test_integral() {
        assert_eq!(integral(3.0), Some(3));
        assert_eq!(integral(-2.0), Some(-2));
        assert_eq!(integral(2.5), None);
        assert_eq!(integral(f64::NAN), None);
        assert_eq!(integral(f64::INFINITY), None);
        assert_eq!(integral(1e300), None);
    }

    #[test]
    fn test_open_requires_directory() {
        let dir = tempdir().unwrap();
        let err = Dataset::open(DatasetConfig::new(dir.path().join("absent"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(Dataset::open(DatasetConfig::new(dir.path())).is_ok());
    }
}
