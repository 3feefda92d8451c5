//! Immutable in-memory form of one block.

use ndarray::{Array2, ArrayView1, Axis};

use crate::{
    BlockId, BlockNumber, Group, StimulusEvent, SubjectId, EVENTS_PER_BLOCK, EVENTS_PER_TRIAL,
    N_CHANNELS, TRIALS_PER_BLOCK,
};

/// Violations of the block invariants, detected at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordingError {
    #[error("expected {expected} channels, found {found}")]
    ChannelCount { expected: usize, found: usize },
    #[error("expected {expected} stimulus events, found {found}")]
    EventCount { expected: usize, found: usize },
    #[error("event {index} is numbered trial {trial} position {position}")]
    EventOrder { index: usize, trial: u16, position: u16 },
    #[error("event {index} onset {onset} does not follow previous onset {previous}")]
    OnsetNotIncreasing { index: usize, previous: usize, onset: usize },
    #[error("event {index} onset {onset} is past the end of the signal ({n_samples} samples)")]
    OnsetOutOfRange { index: usize, onset: usize, n_samples: usize },
    #[error("channel index {index} is out of range")]
    ChannelIndex { index: usize },
}

/// One block's raw EEG capture.
///
/// The signal matrix is laid out channel-major: row `c` holds every sample
/// of channel `c`. A `Recording` can only be built through [`Recording::new`],
/// which enforces the block invariants, and cannot be modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    id: BlockId,
    data: Array2<f64>,
    sample_rate_hz: u32,
    events: Vec<StimulusEvent>,
}

impl Recording {
    pub fn new(
        id: BlockId,
        data: Array2<f64>,
        sample_rate_hz: u32,
        events: Vec<StimulusEvent>,
    ) -> Result<Self, RecordingError> {
        let (n_channels, n_samples) = data.dim();
        if n_channels != N_CHANNELS {
            return Err(RecordingError::ChannelCount {
                expected: N_CHANNELS,
                found: n_channels,
            });
        }
        if events.len() != EVENTS_PER_BLOCK {
            return Err(RecordingError::EventCount {
                expected: EVENTS_PER_BLOCK,
                found: events.len(),
            });
        }

        let mut previous: Option<usize> = None;
        for (index, ev) in events.iter().enumerate() {
            if ev.index() != index || ev.position as usize >= EVENTS_PER_TRIAL {
                return Err(RecordingError::EventOrder {
                    index,
                    trial: ev.trial,
                    position: ev.position,
                });
            }
            if let Some(prev) = previous {
                if ev.onset <= prev {
                    return Err(RecordingError::OnsetNotIncreasing {
                        index,
                        previous: prev,
                        onset: ev.onset,
                    });
                }
            }
            if ev.onset >= n_samples {
                return Err(RecordingError::OnsetOutOfRange {
                    index,
                    onset: ev.onset,
                    n_samples,
                });
            }
            previous = Some(ev.onset);
        }

        Ok(Self {
            id,
            data,
            sample_rate_hz,
            events,
        })
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn subject(&self) -> SubjectId {
        self.id.subject
    }

    pub fn group(&self) -> Group {
        self.id.group
    }

    pub fn block(&self) -> BlockNumber {
        self.id.block
    }

    /// The full `channels x samples` signal matrix.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Samples of a single channel, or `None` if `index >= 64`.
    pub fn channel(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.n_channels()).then(|| self.data.row(index))
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn duration_secs(&self) -> f64 {
        self.n_samples() as f64 / self.sample_rate_hz as f64
    }

    /// All stimulus events in presentation order.
    pub fn events(&self) -> &[StimulusEvent] {
        &self.events
    }

    /// The 100 events of trial `n`, or `None` if `n >= 40`.
    pub fn trial(&self, n: usize) -> Option<&[StimulusEvent]> {
        if n >= TRIALS_PER_BLOCK {
            return None;
        }
        Some(&self.events[n * EVENTS_PER_TRIAL..(n + 1) * EVENTS_PER_TRIAL])
    }

    pub fn targets(&self) -> impl Iterator<Item = &StimulusEvent> + '_ {
        self.events.iter().filter(|ev| ev.label.is_target())
    }

    /// Share of events labelled as targets.
    pub fn target_fraction(&self) -> f64 {
        self.targets().count() as f64 / self.events.len() as f64
    }

    /// Copy the requested channel rows, in the given order, into a new matrix.
    pub fn channel_subset(&self, keep: &[usize]) -> Result<Array2<f64>, RecordingError> {
        if let Some(&index) = keep.iter().find(|&&i| i >= self.n_channels()) {
            return Err(RecordingError::ChannelIndex { index });
        }
        Ok(self.data.select(Axis(0), keep))
    }

    /// Copy every channel except the excluded ones, e.g.
    /// [`RECOMMENDED_EXCLUDED_CHANNELS`](crate::RECOMMENDED_EXCLUDED_CHANNELS).
    pub fn channels_excluding(&self, exclude: &[usize]) -> Result<Array2<f64>, RecordingError> {
        if let Some(&index) = exclude.iter().find(|&&i| i >= self.n_channels()) {
            return Err(RecordingError::ChannelIndex { index });
        }
        let keep: Vec<usize> = (0..self.n_channels())
            .filter(|c| !exclude.contains(c))
            .collect();
        Ok(self.data.select(Axis(0), &keep))
    }
}

/// Both blocks recorded for one subject in one group.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    first: Recording,
    second: Recording,
}

impl Session {
    /// Pair two blocks. Returns them back if they do not belong to the same
    /// subject and group or are not blocks 1 and 2.
    pub fn new(first: Recording, second: Recording) -> Result<Self, (Recording, Recording)> {
        let same_session =
            first.subject() == second.subject() && first.group() == second.group();
        if !same_session
            || first.block() != BlockNumber::FIRST
            || second.block() != BlockNumber::SECOND
        {
            return Err((first, second));
        }
        Ok(Self { first, second })
    }

    pub fn subject(&self) -> SubjectId {
        self.first.subject()
    }

    pub fn group(&self) -> Group {
        self.first.group()
    }

    pub fn block(&self, block: BlockNumber) -> &Recording {
        match block.get() {
            1 => &self.first,
            _ => &self.second,
        }
    }

    pub fn blocks(&self) -> [&Recording; 2] {
        [&self.first, &self.second]
    }

    pub fn into_blocks(self) -> (Recording, Recording) {
        (self.first, self.second)
    }
}
