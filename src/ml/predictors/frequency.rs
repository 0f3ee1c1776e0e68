//! Frequency rebalance: bets on the under-represented category

use super::Predictor;
use crate::ml::features::{CategoryCounts, HistoryFeatures};
use crate::types::Category;

const MIN_RECORDS: usize = 15;

/// Votes against a lopsided recent or long-run frequency.
///
/// Rules, first match wins:
/// 1. 7+ of the last 10 in one category
/// 2. long-run lead > 8 confirmed by a last-30 lead > 2
/// 3. last-10 lead > 3
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyRebalancePredictor;

impl Predictor for FrequencyRebalancePredictor {
    fn id(&self) -> &'static str {
        "freq_rebalance"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        if features.len() < MIN_RECORDS {
            return None;
        }

        let overall = features.frequency;
        let recent_30 = CategoryCounts::of(features.recent(30));
        let recent_10 = CategoryCounts::of(features.recent(10));

        if recent_10.primary >= 7 {
            return Some(Category::Secondary);
        }
        if recent_10.secondary >= 7 {
            return Some(Category::Primary);
        }

        if overall.primary > overall.secondary + 8 && recent_30.primary > recent_30.secondary + 2 {
            return Some(Category::Secondary);
        }
        if overall.secondary > overall.primary + 8 && recent_30.secondary > recent_30.primary + 2 {
            return Some(Category::Primary);
        }

        if recent_10.primary > recent_10.secondary + 3 {
            return Some(Category::Secondary);
        }
        if recent_10.secondary > recent_10.primary + 3 {
            return Some(Category::Primary);
        }

        None
    }
}
