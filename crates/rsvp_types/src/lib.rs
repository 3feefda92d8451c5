//! Shared types for the THU RSVP benchmark dataset
//!
//! This crate contains the data model used throughout the workspace:
//! block identifiers, stimulus events and the immutable `Recording`
//! produced by the dataset loader.

pub mod id;
pub mod event;
pub mod recording;

// Re-export commonly used types
pub use id::*;
pub use event::*;
pub use recording::*;

/// Number of subjects in the benchmark.
pub const N_SUBJECTS: u8 = 64;
/// Number of EEG channels in every block.
pub const N_CHANNELS: usize = 64;
/// Stimulus sequences (trials) per block.
pub const TRIALS_PER_BLOCK: usize = 40;
/// Image presentations per trial.
pub const EVENTS_PER_TRIAL: usize = 100;
/// Stimulus events per block.
pub const EVENTS_PER_BLOCK: usize = TRIALS_PER_BLOCK * EVENTS_PER_TRIAL;
/// Sampling rate of the published files. The acquisition device ran at
/// 1000 Hz; the publisher downsampled to this rate before release.
pub const SAMPLE_RATE_HZ: u32 = 250;

/// Channels the dataset paper advises dropping before analysis.
pub const RECOMMENDED_EXCLUDED_CHANNELS: [usize; 2] = [32, 42];
