//! Diversity-constrained selection of three representative totals

use super::analysis::Distribution;
use crate::types::Category;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Number of representative values offered per forecast
pub const SELECTION_SIZE: usize = 3;

/// Candidates by combined weight, descending. Ties keep ascending value order.
pub fn rank(combined: &Distribution) -> Vec<(u8, f64)> {
    let mut ranked: Vec<(u8, f64)> = combined.iter().map(|(v, p)| (*v, *p)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// First, middle and last candidate, deduplicated and ascending
pub fn default_selection(candidates: &[u8]) -> Vec<u8> {
    let Some((&first, &last)) = candidates.first().zip(candidates.last()) else {
        return Vec::new();
    };
    let mut values = vec![first, candidates[candidates.len() / 2], last];
    values.sort_unstable();
    values.dedup();
    values
}

/// Pick up to three values spread across the candidate range.
///
/// The top-ranked value goes first. Then the best value below the midpoint,
/// above it and within one of it, in that order. Gaps are filled from the
/// ranking, then from the candidates in range order.
pub fn select_diverse(combined: &Distribution, candidates: &[u8]) -> Vec<u8> {
    let ranked = rank(combined);
    let Some(&(top, _)) = ranked.first() else {
        return default_selection(candidates);
    };

    let (Some(min), Some(max)) = (candidates.iter().min(), candidates.iter().max()) else {
        return vec![top];
    };
    let mid = (i16::from(*min) + i16::from(*max)) / 2;

    let mut selected = vec![top];
    let mut best_low: Option<(u8, f64)> = None;
    let mut best_high: Option<(u8, f64)> = None;
    let mut best_mid: Option<(u8, f64)> = None;

    let better = |best: &Option<(u8, f64)>, p: f64| best.map_or(true, |(_, b)| p > b);

    for &(value, p) in ranked.iter().filter(|(v, _)| *v != top) {
        let v = i16::from(value);
        if v <= mid - 1 && better(&best_low, p) {
            best_low = Some((value, p));
        }
        if v >= mid + 1 && better(&best_high, p) {
            best_high = Some((value, p));
        }
        if (v - mid).abs() <= 1 && better(&best_mid, p) {
            best_mid = Some((value, p));
        }
    }

    for (value, _) in [best_low, best_high, best_mid].into_iter().flatten() {
        push_unique(&mut selected, value);
    }

    for (value, _) in &ranked {
        push_unique(&mut selected, *value);
    }
    for value in candidates {
        push_unique(&mut selected, *value);
    }

    selected
}

fn push_unique(selected: &mut Vec<u8>, value: u8) {
    if selected.len() < SELECTION_SIZE && !selected.contains(&value) {
        selected.push(value);
    }
}

/// Short per-category record of past selections
#[derive(Debug, Clone)]
pub struct SelectionMemory {
    capacity: usize,
    entries: HashMap<Category, VecDeque<Vec<u8>>>,
}

impl SelectionMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
        }
    }

    /// Remember a selection, evicting the oldest past `capacity`
    pub fn push(&mut self, category: Category, selection: Vec<u8>) {
        let recent = self.entries.entry(category).or_default();
        recent.push_back(selection);
        while recent.len() > self.capacity {
            recent.pop_front();
        }
    }

    fn replace_last(&mut self, category: Category, selection: Vec<u8>) {
        if let Some(last) = self.entries.get_mut(&category).and_then(|r| r.back_mut()) {
            *last = selection;
        }
    }

    pub fn recent(&self, category: Category) -> impl Iterator<Item = &Vec<u8>> {
        self.entries.get(&category).into_iter().flatten()
    }

    pub fn len(&self, category: Category) -> usize {
        self.entries.get(&category).map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(|r| r.is_empty())
    }

    /// Times each candidate appears across the remembered selections
    pub fn coverage(&self, category: Category, candidates: &[u8]) -> BTreeMap<u8, usize> {
        let mut counts: BTreeMap<u8, usize> = candidates.iter().map(|v| (*v, 0)).collect();
        for selection in self.recent(category) {
            for value in selection {
                if let Some(count) = counts.get_mut(value) {
                    *count += 1;
                }
            }
        }
        counts
    }
}

/// Record `selection` and, with probability `swap_probability`, replace a
/// random slot with a random least-selected candidate. Only swaps when
/// coverage is uneven and the incoming value is not already selected.
/// Returns the final selection, ascending.
pub fn rebalance_coverage(
    mut selection: Vec<u8>,
    category: Category,
    candidates: &[u8],
    memory: &mut SelectionMemory,
    rng: &mut StdRng,
    swap_probability: f64,
) -> Vec<u8> {
    memory.push(category, selection.clone());

    let coverage = memory.coverage(category, candidates);
    let min = coverage.values().copied().min().unwrap_or(0);
    let max = coverage.values().copied().max().unwrap_or(0);

    if min < max && !selection.is_empty() && rng.gen::<f64>() < swap_probability {
        let under: Vec<u8> = coverage
            .iter()
            .filter(|(_, count)| **count == min)
            .map(|(v, _)| *v)
            .collect();

        let slot = rng.gen_range(0..selection.len());
        let incoming = under[rng.gen_range(0..under.len())];
        if !selection.contains(&incoming) {
            selection[slot] = incoming;
        }
    }

    selection.sort_unstable();
    memory.replace_last(category, selection.clone());
    selection
}
