//! Testing support for the predictor
//!
//! Provides:
//! - Synthetic history generators (scripted, alternating, constant, seeded random)

pub mod generators;

pub use generators::HistoryGenerator;
