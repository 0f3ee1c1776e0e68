//! Raw record ingestion
//!
//! Turns the remote history page into ordered `OutcomeRecord`s. Malformed
//! entries are logged and dropped here so the session only ever sees
//! well-formed rounds.

pub mod parser;


pub use parser::{
    parse_history, parse_history_json, parse_records_json, HistoryData, HistoryPage, RawResult,
};
