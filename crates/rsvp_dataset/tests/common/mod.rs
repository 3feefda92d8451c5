//! Synthetic session files laid out like the published dataset.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rsvp_dataset::layout::{self, LABEL_VARIABLE, TRIGGER_VARIABLE};
use rsvp_dataset::mat::{DataType, Endian, MatWriter};
use rsvp_dataset::rsvp_types::{
    Group, SubjectId, EVENTS_PER_BLOCK, EVENTS_PER_TRIAL, N_CHANNELS,
};

#[derive(Debug, Clone, Copy)]
pub struct Fixture {
    pub endian: Endian,
    pub compressed: bool,
    /// Samples between consecutive images of a trial.
    pub stride: usize,
    pub first_onset: usize,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
            compressed: false,
            stride: 3,
            first_onset: 50,
        }
    }
}

impl Fixture {
    pub fn small() -> Self {
        Self {
            compressed: true,
            stride: 1,
            first_onset: 0,
            ..Self::default()
        }
    }

    /// Onset of event `i` in block row `row` (0 or 1).
    pub fn onset(&self, row: usize, i: usize) -> usize {
        let gap = EVENTS_PER_TRIAL * self.stride + 20;
        let (trial, position) = (i / EVENTS_PER_TRIAL, i % EVENTS_PER_TRIAL);
        self.first_onset + row * 7 + trial * gap + position * self.stride
    }

    pub fn samples(&self) -> usize {
        self.onset(1, EVENTS_PER_BLOCK - 1) + 50
    }

    /// Two targets per trial: 80 of 4000 events, 2 %.
    pub fn is_target(row: usize, i: usize) -> bool {
        let (trial, position) = (i / EVENTS_PER_TRIAL, i % EVENTS_PER_TRIAL);
        let first = (trial * 7 + row * 3) % EVENTS_PER_TRIAL;
        position == first || position == (first + 50) % EVENTS_PER_TRIAL
    }

    pub fn signal_value(subject: u8, group: Group, row: usize, channel: usize, t: usize) -> f64 {
        let seed = subject as usize * 4 + group as usize * 2 + row;
        ((channel * 7919 + t * 104_729 + seed * 31) % 2001) as f64 * 0.25 - 250.0
    }

    pub fn write(&self, root: &Path, subject: i64, group: char) -> PathBuf {
        let subject = SubjectId::new(subject).unwrap();
        let group = Group::try_from(group).unwrap();
        let path = layout::session_path(root, subject, group);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        self.writer(subject, group).save(&path).unwrap();
        path
    }

    pub fn writer(&self, subject: SubjectId, group: Group) -> MatWriter {
        let samples = self.samples();
        let signal = |row: usize| {
            let mut data = Vec::with_capacity(N_CHANNELS * samples);
            for t in 0..samples {
                for c in 0..N_CHANNELS {
                    data.push(Self::signal_value(subject.get(), group, row, c, t));
                }
            }
            data
        };

        let mut onsets = Vec::with_capacity(2 * EVENTS_PER_BLOCK);
        let mut labels = Vec::with_capacity(2 * EVENTS_PER_BLOCK);
        for i in 0..EVENTS_PER_BLOCK {
            for row in 0..2 {
                onsets.push(self.onset(row, i) as f64);
                labels.push(if Self::is_target(row, i) { 1.0 } else { 2.0 });
            }
        }

        MatWriter::new()
            .endian(self.endian)
            .compressed(self.compressed)
            .add("EEGdata1", N_CHANNELS, samples, signal(0))
            .add("EEGdata2", N_CHANNELS, samples, signal(1))
            .add_as(TRIGGER_VARIABLE, 2, EVENTS_PER_BLOCK, onsets, DataType::UInt32)
            .add_as(LABEL_VARIABLE, 2, EVENTS_PER_BLOCK, labels, DataType::UInt8)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
