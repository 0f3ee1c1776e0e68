//! Variable-order Markov predictors

use super::Predictor;
use crate::ml::features::{CategoryCounts, HistoryFeatures};
use crate::types::Category;
use std::collections::HashMap;

/// Next-category counts keyed by the preceding `order` categories
#[derive(Debug, Clone)]
pub struct TransitionTable<'a> {
    order: usize,
    transitions: HashMap<&'a [Category], CategoryCounts>,
}

impl<'a> TransitionTable<'a> {
    pub fn build(categories: &'a [Category], order: usize) -> Self {
        let mut transitions: HashMap<&'a [Category], CategoryCounts> = HashMap::new();
        if order > 0 && categories.len() > order {
            for i in 0..categories.len() - order {
                transitions
                    .entry(&categories[i..i + order])
                    .or_default()
                    .add(categories[i + order]);
            }
        }
        Self { order, transitions }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn get(&self, key: &[Category]) -> Option<&CategoryCounts> {
        self.transitions.get(key)
    }

    /// Counts for the trailing `order` categories of `categories`
    pub fn lookup_tail(&self, categories: &[Category]) -> Option<&CategoryCounts> {
        if categories.len() < self.order {
            return None;
        }
        self.get(&categories[categories.len() - self.order..])
    }
}

/// Fixed orders 2-5; keeps the most confident order above 0.6.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkovPredictor;

impl Predictor for MarkovPredictor {
    fn id(&self) -> &'static str {
        "markov"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;
        if tx.len() < 20 {
            return None;
        }

        let mut best: Option<Category> = None;
        let mut best_confidence = 0.0;

        for order in 2..=5 {
            if tx.len() < order + 5 {
                continue;
            }

            let table = TransitionTable::build(tx, order);
            let Some(counts) = table.lookup_tail(tx) else {
                continue;
            };
            if counts.total() == 0 {
                continue;
            }

            let confidence = counts.imbalance();
            if confidence > best_confidence && confidence > 0.6 {
                best_confidence = confidence;
                best = Some(counts.leader());
            }
        }

        best
    }
}

/// Orders 2..=min(4, n/10) with at least two observations per state;
/// votes only when the best order clears 0.7.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdaptiveMarkovPredictor;

impl Predictor for AdaptiveMarkovPredictor {
    fn id(&self) -> &'static str {
        "adaptive_markov"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        let tx = &features.categories;
        if tx.len() < 25 {
            return None;
        }

        let max_order = (tx.len() / 10).min(4);
        let mut best: Option<Category> = None;
        let mut best_confidence = 0.0;

        for order in 2..=max_order {
            if tx.len() < order + 5 {
                continue;
            }

            let table = TransitionTable::build(tx, order);
            let Some(counts) = table.lookup_tail(tx) else {
                continue;
            };
            if counts.total() < 2 {
                continue;
            }

            let confidence = counts.imbalance();
            if confidence > best_confidence {
                best_confidence = confidence;
                best = Some(counts.leader());
            }
        }

        if best_confidence > 0.7 {
            best
        } else {
            None
        }
    }
}
