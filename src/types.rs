//! Core domain types shared across the predictor
//!
//! - `Category`: banded classification of a three-dice total
//! - `OutcomeRecord`: one settled round
//! - `PredictionResult`: the cached forecast for the next round
//! - `AccuracySnapshot`: live hit/total counters

use crate::error::{Result, SicboError};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Lowest possible three-dice total
pub const MIN_TOTAL: u8 = 3;
/// Highest possible three-dice total
pub const MAX_TOTAL: u8 = 18;

const SECONDARY_TOTALS: [u8; 7] = [4, 5, 6, 7, 8, 9, 10];
const PRIMARY_TOTALS: [u8; 7] = [11, 12, 13, 14, 15, 16, 17];
const DISCARD_TOTALS: [u8; 2] = [3, 18];

/// Outcome category derived from the dice total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Totals 11-17 ("tai")
    #[serde(rename = "tai")]
    Primary,
    /// Totals 4-10 ("xiu")
    #[serde(rename = "xiu")]
    Secondary,
    /// Triples at 3 or 18 ("bao"), excluded from every heuristic
    #[serde(rename = "bao")]
    Discard,
}

impl Category {
    /// Fixed banding: 4-10 Secondary, 11-17 Primary, 3 or 18 Discard.
    /// Anything outside 3..=18 is not a valid total.
    pub fn from_total(total: u8) -> Option<Self> {
        match total {
            4..=10 => Some(Self::Secondary),
            11..=17 => Some(Self::Primary),
            MIN_TOTAL | MAX_TOTAL => Some(Self::Discard),
            _ => None,
        }
    }

    /// Single-letter code used to key the fixed pattern tables
    pub fn code(&self) -> char {
        match self {
            Self::Primary => 'T',
            Self::Secondary => 'X',
            Self::Discard => 'B',
        }
    }

    /// Domain label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary => "tai",
            Self::Secondary => "xiu",
            Self::Discard => "bao",
        }
    }

    /// The other live category. Discard has no opposite.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
            Self::Discard => Self::Discard,
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, Self::Discard)
    }

    /// Representative totals a forecast in this category may offer
    pub fn candidate_totals(&self) -> &'static [u8] {
        match self {
            Self::Primary => &PRIMARY_TOTALS,
            Self::Secondary => &SECONDARY_TOTALS,
            Self::Discard => &DISCARD_TOTALS,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A settled round. Immutable once built; total and category are derived
/// from the dice and cannot disagree with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr")]
pub struct OutcomeRecord {
    pub sequence_id: u64,
    pub dice: [u8; 3],
    pub total: u8,
    pub category: Category,
}

impl OutcomeRecord {
    pub fn new(sequence_id: u64, dice: [u8; 3]) -> Result<Self> {
        if let Some(face) = dice.iter().find(|d| !(1..=6).contains(*d)) {
            return Err(SicboError::MalformedRecord(format!(
                "round {}: die face {} outside 1-6",
                sequence_id, face
            )));
        }

        let total: u8 = dice.iter().sum();
        let category = Category::from_total(total).ok_or_else(|| {
            SicboError::MalformedRecord(format!("round {}: total {}", sequence_id, total))
        })?;

        Ok(Self {
            sequence_id,
            dice,
            total,
            category,
        })
    }

    pub fn label(&self) -> &'static str {
        self.category.label()
    }
}

/// Wire shape accepted when deserializing records: `total` is optional but
/// must match the dice when present.
#[derive(Deserialize)]
struct RecordRepr {
    sequence_id: u64,
    dice: [u8; 3],
    #[serde(default)]
    total: Option<u8>,
}

impl TryFrom<RecordRepr> for OutcomeRecord {
    type Error = SicboError;

    fn try_from(repr: RecordRepr) -> Result<Self> {
        let record = OutcomeRecord::new(repr.sequence_id, repr.dice)?;
        match repr.total {
            Some(total) if total != record.total => Err(SicboError::MalformedRecord(format!(
                "round {}: total {} does not match dice sum {}",
                repr.sequence_id, total, record.total
            ))),
            _ => Ok(record),
        }
    }
}

/// One predictor's contribution to a forecast
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictorVote {
    pub predictor: &'static str,
    /// None when the predictor abstained
    pub vote: Option<Category>,
    /// Ensemble weight at the time of the vote
    pub weight: f64,
}

/// Forecast for the next round. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub category: Category,
    /// In [0.51, 0.99], or exactly 0.5 when no predictor voted
    pub confidence: f64,
    /// Up to three totals, ascending
    pub representative_values: Vec<u8>,
    /// True iff the no-consensus fallback produced the category
    pub fallback: bool,
    pub votes: Vec<PredictorVote>,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        self.category.label()
    }

    /// Confidence as a whole percentage
    pub fn confidence_pct(&self) -> Decimal {
        let pct = Decimal::from_f64(self.confidence * 100.0).unwrap_or(Decimal::ZERO);
        pct.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Representative values joined as `a-b-c`
    pub fn values_label(&self) -> String {
        self.representative_values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Cumulative live accuracy since initialization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AccuracySnapshot {
    pub hits: u64,
    pub total: u64,
}

impl AccuracySnapshot {
    pub fn record(&mut self, hit: bool) {
        self.total += 1;
        if hit {
            self.hits += 1;
        }
    }

    /// Hit rate in percent, one decimal place
    pub fn rate_pct(&self) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.hits) * dec!(100) / Decimal::from(self.total))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
    }
}
