pub const RANK_COUNT: usize = 18;

/// Consumption weights, index `i` belonging to rank `i - 1`.
///
/// Listed from rarest to most common so the final entry soaks up any
/// probability mass left over from rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityTable {
    weights: [f64; RANK_COUNT],
}

pub const GONG_TABLE: ProbabilityTable = ProbabilityTable {
    weights: [
        0.000001, 0.000002, 0.000002, 0.000005, 0.00004, 0.00005, 0.0002, 0.0004, 0.0005, 0.0008, 0.001, 0.002,
        0.005, 0.01, 0.08, 0.166666666666, 0.33333333333333, 0.4,
    ],
};

impl ProbabilityTable {
    pub fn weights(&self) -> &[f64; RANK_COUNT] {
        &self.weights
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

impl Default for ProbabilityTable {
    fn default() -> Self {
        GONG_TABLE
    }
}
