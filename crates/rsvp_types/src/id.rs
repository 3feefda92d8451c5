//! Identifiers for subjects, groups and blocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::N_SUBJECTS;

/// Rejected identifier components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("subject {0} is out of range (expected 1..=64)")]
    Subject(i64),
    #[error("group {0:?} is not one of A, B")]
    Group(String),
    #[error("block {0} is out of range (expected 1 or 2)")]
    Block(i64),
}

/// A subject number in `1..=64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SubjectId(u8);

impl SubjectId {
    pub fn new(n: i64) -> Result<Self, IdError> {
        if (1..=N_SUBJECTS as i64).contains(&n) {
            Ok(Self(n as u8))
        } else {
            Err(IdError::Subject(n))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All subjects in ascending order.
    pub fn all() -> impl Iterator<Item = SubjectId> {
        (1..=N_SUBJECTS).map(SubjectId)
    }
}

impl TryFrom<u8> for SubjectId {
    type Error = IdError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n as i64)
    }
}

impl From<SubjectId> for u8 {
    fn from(id: SubjectId) -> u8 {
        id.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub{}", self.0)
    }
}

/// Recording group. Each subject was recorded in two groups of two blocks.
///
/// Parsing folds case: `'a'` and `'A'` both name group A. Files on disk
/// always use the uppercase letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Group {
    A,
    B,
}

impl Group {
    pub const ALL: [Group; 2] = [Group::A, Group::B];

    pub fn as_char(self) -> char {
        match self {
            Group::A => 'A',
            Group::B => 'B',
        }
    }
}

/// Accepts `A` or `B` in either case.
impl TryFrom<char> for Group {
    type Error = IdError;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c.to_ascii_uppercase() {
            'A' => Ok(Group::A),
            'B' => Ok(Group::B),
            _ => Err(IdError::Group(c.to_string())),
        }
    }
}

impl FromStr for Group {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Group::try_from(c).map_err(|_| IdError::Group(s.to_string())),
            _ => Err(IdError::Group(s.to_string())),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Block number within a group, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BlockNumber(u8);

impl BlockNumber {
    pub const FIRST: BlockNumber = BlockNumber(1);
    pub const SECOND: BlockNumber = BlockNumber(2);
    pub const ALL: [BlockNumber; 2] = [Self::FIRST, Self::SECOND];

    pub fn new(n: i64) -> Result<Self, IdError> {
        match n {
            1 | 2 => Ok(Self(n as u8)),
            _ => Err(IdError::Block(n)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based row of this block in the per-session event tables.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for BlockNumber {
    type Error = IdError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n as i64)
    }
}

impl From<BlockNumber> for u8 {
    fn from(b: BlockNumber) -> u8 {
        b.0
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fully qualified block: subject, group and block number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub subject: SubjectId,
    pub group: Group,
    pub block: BlockNumber,
}

impl BlockId {
    pub fn new(subject: SubjectId, group: Group, block: BlockNumber) -> Self {
        Self { subject, group, block }
    }

    /// Validate raw components. Used by entry points that accept plain
    /// integers from callers.
    pub fn parse(subject: i64, group: char, block: i64) -> Result<Self, IdError> {
        Ok(Self {
            subject: SubjectId::new(subject)?,
            group: Group::try_from(group)?,
            block: BlockNumber::new(block)?,
        })
    }

    /// Every block of the dataset: subject ascending, then group, then block.
    pub fn all() -> impl Iterator<Item = BlockId> {
        SubjectId::all().flat_map(|subject| {
            Group::ALL.into_iter().flat_map(move |group| {
                BlockNumber::ALL
                    .into_iter()
                    .map(move |block| BlockId::new(subject, group, block))
            })
        })
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/block{}", self.subject, self.group, self.block)
    }
}
