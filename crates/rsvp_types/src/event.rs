use serde::{Deserialize, Serialize};

use crate::EVENTS_PER_TRIAL;

/// Class of a single image presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Label {
    /// The image contains the sought category.
    Target,
    NonTarget,
}

impl Label {
    /// Decode the class code used in the published files:
    /// `1` is a target, `2` a non-target.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Label::Target),
            2 => Some(Label::NonTarget),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Label::Target => 1,
            Label::NonTarget => 2,
        }
    }

    pub fn is_target(self) -> bool {
        matches!(self, Label::Target)
    }
}

/// One image presentation within a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusEvent {
    /// Sample index of the stimulus onset within the block's signal matrix.
    pub onset: usize,
    /// Trial (stimulus sequence) number, `0..40`.
    pub trial: u16,
    /// Position within the trial, `0..100`.
    pub position: u16,
    pub label: Label,
}

impl StimulusEvent {
    /// Build the event at flat index `index` of a block.
    pub fn at_index(index: usize, onset: usize, label: Label) -> Self {
        Self {
            onset,
            trial: (index / EVENTS_PER_TRIAL) as u16,
            position: (index % EVENTS_PER_TRIAL) as u16,
            label,
        }
    }

    /// Flat index of this event within its block.
    pub fn index(&self) -> usize {
        self.trial as usize * EVENTS_PER_TRIAL + self.position as usize
    }
}
