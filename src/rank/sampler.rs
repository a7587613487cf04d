use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{Arc, Mutex};

use super::table::{ProbabilityTable, RANK_COUNT};
use super::types::Rank;

/// Slack absorbed when the running remainder is compared against zero.
pub const EPSILON: f64 = 1e-8;

/// Source of uniform draws in `[0, 1)`.
pub trait UniformSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl UniformSource for ThreadRngSource {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Reproducible source for simulations and tests.
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl UniformSource for SeededSource {
    fn next_unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random::<f64>()
    }
}

#[derive(Debug, Clone)]
pub struct Sampler {
    table: Arc<ProbabilityTable>,
}

impl Sampler {
    pub fn new(table: Arc<ProbabilityTable>) -> Self {
        Self { table }
    }

    pub fn sample(&self, source: &dyn UniformSource) -> Rank {
        self.rank_for(source.next_unit())
    }

    /// Walks the table subtracting weights from `r` until the remainder is
    /// used up. The rank of the weight that exhausted it is returned; the
    /// final weight takes whatever is left, so at most `RANK_COUNT` steps run.
    pub fn rank_for(&self, r: f64) -> Rank {
        let weights = self.table.weights();
        let mut remainder = r;
        let mut index = 0;

        loop {
            remainder -= weights[index];
            if remainder <= EPSILON || index == RANK_COUNT - 1 {
                break;
            }
            index += 1;
        }

        Rank::from_index(index)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(Arc::new(ProbabilityTable::default()))
    }
}
