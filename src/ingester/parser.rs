//! History page parser

use crate::error::{Result, SicboError};
use crate::types::OutcomeRecord;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Top level of the history endpoint response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub data: Option<HistoryData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryData {
    /// Kept as raw values so one bad entry does not sink the page
    #[serde(rename = "resultList", default)]
    pub result_list: Vec<serde_json::Value>,
}

/// One entry of `resultList`
#[derive(Debug, Clone, Deserialize)]
pub struct RawResult {
    /// Round number with a leading marker, e.g. `"#120345"`
    #[serde(rename = "gameNum")]
    pub game_num: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(rename = "facesList", default)]
    pub faces_list: Option<Vec<i64>>,
    /// Dice as `"d-d-d"`, used when `facesList` is absent
    #[serde(rename = "keyR", default)]
    pub key_r: Option<String>,
}

impl RawResult {
    pub fn sequence_id(&self) -> Result<u64> {
        let mut chars = self.game_num.chars();
        chars.next();
        chars.as_str().trim().parse().map_err(|_| {
            SicboError::MalformedRecord(format!("gameNum {:?} has no round number", self.game_num))
        })
    }

    pub fn dice(&self) -> Result<[u8; 3]> {
        let faces: Vec<i64> = match (&self.faces_list, &self.key_r) {
            (Some(faces), _) => faces.clone(),
            (None, Some(key)) => key
                .split('-')
                .map(|part| part.trim().parse::<i64>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| SicboError::MalformedRecord(format!("keyR {:?}", key)))?,
            (None, None) => {
                return Err(SicboError::MalformedRecord(format!(
                    "{}: no dice",
                    self.game_num
                )))
            }
        };

        match faces.as_slice() {
            [a, b, c] => {
                let face = |v: i64| {
                    u8::try_from(v).map_err(|_| {
                        SicboError::MalformedRecord(format!("{}: face {}", self.game_num, v))
                    })
                };
                Ok([face(*a)?, face(*b)?, face(*c)?])
            }
            _ => Err(SicboError::MalformedRecord(format!(
                "{}: expected 3 dice, got {}",
                self.game_num,
                faces.len()
            ))),
        }
    }

    /// Build the record. A reported score must agree with the dice.
    pub fn to_record(&self) -> Result<OutcomeRecord> {
        let record = OutcomeRecord::new(self.sequence_id()?, self.dice()?)?;
        if let Some(score) = self.score {
            if score != i64::from(record.total) {
                return Err(SicboError::MalformedRecord(format!(
                    "{}: score {} but dice sum to {}",
                    self.game_num, score, record.total
                )));
            }
        }
        Ok(record)
    }
}

/// Well-formed records of a page, ascending by id, first occurrence of each id
pub fn parse_history(page: &HistoryPage) -> Vec<OutcomeRecord> {
    let Some(data) = &page.data else {
        debug!("[Ingest] Page has no data");
        return Vec::new();
    };

    let records = data
        .result_list
        .iter()
        .filter_map(|value| {
            let parsed = RawResult::deserialize(value)
                .map_err(SicboError::from)
                .and_then(|raw| raw.to_record());
            match parsed {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("[Ingest] Skipping record: {}", e);
                    None
                }
            }
        })
        .collect();

    order_and_dedupe(records)
}

/// Decode and parse a raw history page
pub fn parse_history_json(text: &str) -> Result<Vec<OutcomeRecord>> {
    let page: HistoryPage = serde_json::from_str(text)?;
    Ok(parse_history(&page))
}

/// Plain JSON array of records, as written by `sicbo` for offline replay
pub fn parse_records_json(text: &str) -> Result<Vec<OutcomeRecord>> {
    let records: Vec<OutcomeRecord> = serde_json::from_str(text)?;
    Ok(order_and_dedupe(records))
}

fn order_and_dedupe(mut records: Vec<OutcomeRecord>) -> Vec<OutcomeRecord> {
    // stable, so the first occurrence of an id stays ahead of later copies
    records.sort_by_key(|r| r.sequence_id);
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.sequence_id));
    records
}
