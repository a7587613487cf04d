pub mod sampler;
pub mod table;
pub mod types;


pub use sampler::{Sampler, SeededSource, ThreadRngSource, UniformSource};
pub use table::{ProbabilityTable, GONG_TABLE, RANK_COUNT};
pub use types::{Rank, RollOutcome};
