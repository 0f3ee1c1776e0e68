//! Synthetic outcome histories for tests and offline replay

use crate::types::{Category, OutcomeRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds well-formed `OutcomeRecord` sequences with increasing ids
pub struct HistoryGenerator {
    rng: StdRng,
    next_id: u64,
}

impl HistoryGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    /// Continue numbering from `id`
    pub fn starting_at(mut self, id: u64) -> Self {
        self.next_id = id;
        self
    }

    /// A record with the given total and the next sequence id
    pub fn record(&mut self, total: u8) -> OutcomeRecord {
        let id = self.next_id;
        self.next_id += 1;
        make_record(id, total)
    }

    /// A record rolled from three fair dice
    pub fn roll(&mut self) -> OutcomeRecord {
        let dice = [
            self.rng.gen_range(1..=6u8),
            self.rng.gen_range(1..=6u8),
            self.rng.gen_range(1..=6u8),
        ];
        let id = self.next_id;
        self.next_id += 1;
        match OutcomeRecord::new(id, dice) {
            Ok(record) => record,
            Err(e) => panic!("fair dice produced an invalid record: {}", e),
        }
    }

    /// `n` fair rolls
    pub fn random(seed: u64, n: usize) -> Vec<OutcomeRecord> {
        let mut generator = Self::new(seed);
        (0..n).map(|_| generator.roll()).collect()
    }

    /// One record per total, ids starting at 1
    pub fn from_totals(totals: &[u8]) -> Vec<OutcomeRecord> {
        totals
            .iter()
            .enumerate()
            .map(|(i, t)| make_record(i as u64 + 1, *t))
            .collect()
    }

    /// One record per category using a representative total
    pub fn from_categories(categories: &[Category]) -> Vec<OutcomeRecord> {
        let totals: Vec<u8> = categories.iter().map(|c| representative_total(*c)).collect();
        Self::from_totals(&totals)
    }

    /// `n` records alternating strictly, beginning with `first`
    pub fn alternating(first: Category, n: usize) -> Vec<OutcomeRecord> {
        let categories: Vec<Category> = (0..n)
            .map(|i| if i % 2 == 0 { first } else { first.opposite() })
            .collect();
        Self::from_categories(&categories)
    }

    /// `n` records of a single category
    pub fn constant(category: Category, n: usize) -> Vec<OutcomeRecord> {
        Self::from_categories(&vec![category; n])
    }
}

fn representative_total(category: Category) -> u8 {
    match category {
        Category::Primary => 12,
        Category::Secondary => 7,
        Category::Discard => 18,
    }
}

/// Dice faces summing to `total`
///
/// # Panics
///
/// Panics when `total` is outside 3..=18.
pub fn dice_for_total(total: u8) -> [u8; 3] {
    assert!(
        (3..=18).contains(&total),
        "three dice cannot sum to {}",
        total
    );
    let first = total.saturating_sub(2).clamp(1, 6);
    let rest = total - first;
    let second = (rest - 1).min(6);
    [first, second, rest - second]
}

fn make_record(id: u64, total: u8) -> OutcomeRecord {
    match OutcomeRecord::new(id, dice_for_total(total)) {
        Ok(record) => record,
        Err(e) => panic!("total {} cannot be generated: {}", total, e),
    }
}
