//! Run-reversal ("bridge") predictor

use super::Predictor;
use crate::ml::features::{tail, CategoryCounts, HistoryFeatures};
use crate::types::Category;

/// Which rule produced a bridge vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeRule {
    /// Latest run is 4 or longer
    LongRunReversal,
    /// Trailing singleton runs
    Alternation,
    /// Last 15 lopsided by more than 4
    RecentImbalance,
}

/// Evaluate the bridge rules in priority order.
pub fn bridge_rule(features: &HistoryFeatures) -> Option<(BridgeRule, Category)> {
    let runs = &features.runs;
    if runs.len() < 4 {
        return None;
    }

    let last_five = tail(runs, 5);
    if last_five.len() < 5 {
        return None;
    }

    let last = last_five[4];
    let second_last = last_five[3];

    if last.len >= 4 {
        return Some((BridgeRule::LongRunReversal, last.category.opposite()));
    }

    if last.len == 1 && second_last.len == 1 {
        let singletons = tail(runs, 6).iter().filter(|r| r.len == 1).count();
        if singletons >= 4 {
            return Some((BridgeRule::Alternation, last.category.opposite()));
        }
    }

    let recent = CategoryCounts::of(features.recent(15));
    if recent.primary > recent.secondary + 4 {
        return Some((BridgeRule::RecentImbalance, Category::Secondary));
    }
    if recent.secondary > recent.primary + 4 {
        return Some((BridgeRule::RecentImbalance, Category::Primary));
    }

    None
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BridgePredictor;

impl Predictor for BridgePredictor {
    fn id(&self) -> &'static str {
        "super_bridge"
    }

    fn vote(&self, features: &HistoryFeatures) -> Option<Category> {
        bridge_rule(features).map(|(_, category)| category)
    }
}
