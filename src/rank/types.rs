use serde::{Deserialize, Serialize};
use std::fmt;

use super::table::RANK_COUNT;

/// A drawn tier in `[-1, 16]`, ordered by increasing rarity towards -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rank(i8);

impl Rank {
    pub const MIN: Rank = Rank(-1);
    pub const MAX: Rank = Rank(RANK_COUNT as i8 - 2);

    /// Maps a probability table / histogram index to its rank, clamping past the end.
    pub fn from_index(index: usize) -> Self {
        let clamped = index.min(RANK_COUNT - 1);
        Rank(clamped as i8 - 1)
    }

    pub fn new(value: i8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0).contains(&value).then_some(Rank(value))
    }

    /// Histogram bucket holding this rank's count.
    pub fn index(self) -> usize {
        (self.0 + 1) as usize
    }

    pub fn value(self) -> i8 {
        self.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one roll request after the cooldown gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollOutcome {
    Accepted(Rank),
    CooldownRejected,
    /// The stored record could not be decoded; left untouched.
    CorruptRecord,
}

impl RollOutcome {
    /// Value reported in the `result` field. Anything not accepted is `-1`.
    pub fn wire_value(self) -> i8 {
        match self {
            RollOutcome::Accepted(rank) => rank.value(),
            RollOutcome::CooldownRejected | RollOutcome::CorruptRecord => -1,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, RollOutcome::Accepted(_))
    }
}
