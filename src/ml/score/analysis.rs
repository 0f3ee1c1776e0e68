//! The five per-value analyses behind the score forecast
//!
//! Each maps the history and a forecast category to a weight per candidate
//! total. All of them read the full (unfiltered) history: a Discard round
//! still occupies a position, it just never matches a live category.

use crate::ml::features::tail;
use crate::types::{Category, OutcomeRecord};
use std::collections::{BTreeMap, HashMap};

/// Weight per candidate total, ascending by total
pub type Distribution = BTreeMap<u8, f64>;

/// Floor for candidates the frequency analysis never saw (not renormalized)
pub const FREQUENCY_FLOOR: f64 = 0.1;
/// Gap weight of a candidate never seen in the category
pub const UNSEEN_GAP_WEIGHT: f64 = 0.7;
const GAP_SCALE: f64 = 15.0;
const CLUSTER_WINDOW: usize = 30;
const CLUSTER_SPREAD: u8 = 2;
const DISTRIBUTION_MIN_SAMPLES: usize = 5;

/// Blend weights: frequency, sequence, distribution, cluster, gap
pub const ANALYSIS_WEIGHTS: [f64; 5] = [0.25, 0.20, 0.20, 0.20, 0.15];

/// All five analyses for one forecast
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreAnalyses {
    pub frequency: Distribution,
    pub sequence: Distribution,
    pub distribution: Distribution,
    pub cluster: Distribution,
    pub gap: Distribution,
}

impl ScoreAnalyses {
    pub fn run(
        history: &[OutcomeRecord],
        category: Category,
        candidates: &[u8],
        decay: f64,
        lookback: usize,
    ) -> Self {
        Self {
            frequency: frequency(history, category, candidates, decay, lookback),
            sequence: sequence(history, category, candidates),
            distribution: distribution(history, category, candidates),
            cluster: cluster(history, category, candidates),
            gap: gap(history, category, candidates),
        }
    }

    /// Fixed weighted sum of the five analyses
    pub fn combine(&self, candidates: &[u8]) -> Distribution {
        let parts = [
            &self.frequency,
            &self.sequence,
            &self.distribution,
            &self.cluster,
            &self.gap,
        ];

        candidates
            .iter()
            .map(|value| {
                let score = parts
                    .iter()
                    .zip(ANALYSIS_WEIGHTS)
                    .map(|(part, w)| part.get(value).copied().unwrap_or(0.0) * w)
                    .sum::<f64>();
                (*value, score)
            })
            .collect()
    }
}

fn uniform(candidates: &[u8]) -> Distribution {
    let p = 1.0 / candidates.len().max(1) as f64;
    candidates.iter().map(|v| (*v, p)).collect()
}

fn normalize(mut dist: Distribution) -> Distribution {
    let total: f64 = dist.values().sum();
    if total > 0.0 {
        for p in dist.values_mut() {
            *p /= total;
        }
    }
    dist
}

/// Recency-decayed frequency of the total that followed each matching round
/// within the trailing `lookback` records.
pub fn frequency(
    history: &[OutcomeRecord],
    category: Category,
    candidates: &[u8],
    decay: f64,
    lookback: usize,
) -> Distribution {
    let n = history.len();
    let mut weights: HashMap<u8, f64> = HashMap::new();

    if n >= 2 {
        let start = n - lookback.min(n);
        for i in start..n - 1 {
            if history[i].category != category {
                continue;
            }
            let next = history[i + 1].total;
            if candidates.contains(&next) {
                let age = (n - 1 - i) as i32;
                *weights.entry(next).or_insert(0.0) += decay.powi(age);
            }
        }
    }

    let total: f64 = weights.values().sum();
    candidates
        .iter()
        .map(|value| {
            let p = if total > 0.0 {
                weights.get(value).copied().unwrap_or(0.0) / total
            } else {
                0.0
            };
            (*value, if p > 0.0 { p } else { FREQUENCY_FLOOR })
        })
        .collect()
}

/// Second-order transitions over runs of three matching rounds, looked up by
/// the trailing pair of totals. Unmatched candidates get the uniform share.
pub fn sequence(history: &[OutcomeRecord], category: Category, candidates: &[u8]) -> Distribution {
    let n = history.len();
    let mut transitions: HashMap<(u8, u8), BTreeMap<u8, usize>> = HashMap::new();

    for i in 2..n.saturating_sub(1) {
        let window = &history[i - 2..=i];
        if window.iter().all(|r| r.category == category) {
            *transitions
                .entry((window[0].total, window[1].total))
                .or_default()
                .entry(window[2].total)
                .or_insert(0) += 1;
        }
    }

    let mut dist = Distribution::new();
    if n >= 2 {
        if let Some(next) = transitions.get(&(history[n - 2].total, history[n - 1].total)) {
            let total: usize = next.values().sum();
            for (value, count) in next {
                if candidates.contains(value) {
                    dist.insert(*value, *count as f64 / total as f64);
                }
            }
        }
    }

    let fallback = 1.0 / candidates.len().max(1) as f64;
    for value in candidates {
        let p = dist.entry(*value).or_insert(0.0);
        if *p <= 0.0 {
            *p = fallback;
        }
    }
    dist
}

/// Add-one smoothed histogram of every matching total. Uniform below five
/// samples.
pub fn distribution(
    history: &[OutcomeRecord],
    category: Category,
    candidates: &[u8],
) -> Distribution {
    let samples: Vec<u8> = history
        .iter()
        .filter(|r| r.category == category)
        .map(|r| r.total)
        .collect();

    if samples.len() < DISTRIBUTION_MIN_SAMPLES {
        return uniform(candidates);
    }

    let denominator = (samples.len() + candidates.len()) as f64;
    candidates
        .iter()
        .map(|value| {
            let count = samples.iter().filter(|s| *s == value).count();
            (*value, (count + 1) as f64 / denominator)
        })
        .collect()
}

/// Clusters of recent matching totals, sorted and split at gaps above 2.
/// Each cluster of two or more boosts its members by `0.1 * size`.
pub fn cluster(history: &[OutcomeRecord], category: Category, candidates: &[u8]) -> Distribution {
    let mut recent: Vec<u8> = tail(history, CLUSTER_WINDOW)
        .iter()
        .filter(|r| r.category == category)
        .map(|r| r.total)
        .collect();

    if recent.len() < 3 {
        return uniform(candidates);
    }
    recent.sort_unstable();

    let clusters = group_clusters(&recent);

    let bonuses = candidates
        .iter()
        .map(|value| {
            let bonus: f64 = clusters
                .iter()
                .filter(|c| c.binary_search(value).is_ok())
                .map(|c| c.len() as f64 * 0.1)
                .sum();
            (*value, 1.0 + bonus)
        })
        .collect();

    normalize(bonuses)
}

/// Split sorted values into clusters of size >= 2. Cluster members keep
/// their multiplicity so `len()` is the cluster size.
fn group_clusters(sorted: &[u8]) -> Vec<Vec<u8>> {
    let mut clusters = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for value in sorted {
        let split = current.last().map_or(false, |last| value - last > CLUSTER_SPREAD);
        if split {
            if current.len() >= 2 {
                clusters.push(std::mem::take(&mut current));
            } else {
                current.clear();
            }
        }
        current.push(*value);
    }
    if current.len() >= 2 {
        clusters.push(current);
    }

    clusters
}

/// Rounds since each candidate last appeared in the category, scaled by 15
/// and capped at 1.
pub fn gap(history: &[OutcomeRecord], category: Category, candidates: &[u8]) -> Distribution {
    let n = history.len();
    let raw = candidates
        .iter()
        .map(|value| {
            let last_seen = history
                .iter()
                .rposition(|r| r.category == category && r.total == *value);
            let weight = match last_seen {
                None => UNSEEN_GAP_WEIGHT,
                Some(i) => ((n - i) as f64 / GAP_SCALE).min(1.0),
            };
            (*value, weight)
        })
        .collect();

    normalize(raw)
}
