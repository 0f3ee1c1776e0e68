//! Score predictor
//!
//! Narrows a category forecast down to three representative totals:
//! 1. Five analyses (recency frequency, pair sequence, distribution,
//!    cluster, gap) weight every candidate total
//! 2. A fixed weighted sum combines them
//! 3. A diversity pass picks top / low / high / mid values
//! 4. A coverage pass occasionally swaps in a rarely offered value
//!
//! The coverage swap draws from a seedable `StdRng`, so runs with a fixed
//! seed are reproducible.

pub mod analysis;
pub mod selection;

pub use analysis::{Distribution, ScoreAnalyses};
pub use selection::{default_selection, rebalance_coverage, select_diverse, SelectionMemory};

use crate::types::{Category, OutcomeRecord};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Configuration for the score predictor
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Per-round decay of the frequency analysis
    pub decay: f64,
    /// Records the frequency analysis looks back over
    pub lookback: usize,
    /// Chance of a coverage swap per forecast
    pub swap_probability: f64,
    /// Past selections remembered per category
    pub memory_capacity: usize,
    /// Seed for the coverage swap; entropy when unset
    pub seed: Option<u64>,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            decay: 0.96,
            lookback: 80,
            swap_probability: 0.3,
            memory_capacity: 10,
            seed: None,
        }
    }
}

/// Stateful score forecaster: owns the selection memory and the swap RNG
pub struct ScorePredictor {
    config: ScoreConfig,
    memory: SelectionMemory,
    rng: StdRng,
}

impl ScorePredictor {
    pub fn new(config: ScoreConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            memory: SelectionMemory::new(config.memory_capacity),
            config,
            rng,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoreConfig::default())
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn memory(&self) -> &SelectionMemory {
        &self.memory
    }

    /// Run the five analyses without selecting
    pub fn analyze(&self, history: &[OutcomeRecord], category: Category) -> ScoreAnalyses {
        ScoreAnalyses::run(
            history,
            category,
            category.candidate_totals(),
            self.config.decay,
            self.config.lookback,
        )
    }

    /// Three distinct representative totals for `category`, ascending.
    /// Ranges with fewer than three candidates skip the pipeline.
    pub fn predict(&mut self, history: &[OutcomeRecord], category: Category) -> Vec<u8> {
        let candidates = category.candidate_totals();
        if candidates.len() < selection::SELECTION_SIZE {
            return default_selection(candidates);
        }

        let combined = self.analyze(history, category).combine(candidates);
        let selected = select_diverse(&combined, candidates);

        rebalance_coverage(
            selected,
            category,
            candidates,
            &mut self.memory,
            &mut self.rng,
            self.config.swap_probability,
        )
    }
}
