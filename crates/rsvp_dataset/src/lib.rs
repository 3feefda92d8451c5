//! Loader for the Tsinghua University RSVP benchmark dataset
//!
//! The dataset holds 64 subjects, each recorded in two groups of two blocks.
//! A block is 40 stimulus sequences of 100 images shown at 10 Hz, captured
//! on 64 EEG channels. The publisher ships one MAT-file per
//! (subject, group); this crate decodes those files into
//! [`Recording`](rsvp_types::Recording)s.
//!
//! ```no_run
//! use rsvp_dataset::load_recording;
//!
//! let rec = load_recording("./datasets/thu", 1, 'A', 1)?;
//! assert_eq!(rec.n_channels(), 64);
//! assert_eq!(rec.events().len(), 4000);
//! # Ok::<(), rsvp_dataset::DatasetError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod layout;
pub mod loader;
pub mod mat;

// Re-export commonly used types
pub use checksum::{verify_manifest, FileStatus, VerificationReport};
pub use config::DatasetConfig;
pub use error::{DatasetError, DatasetResult, ErrorKind};
pub use loader::{load_recording, Dataset};
pub use rsvp_types;
