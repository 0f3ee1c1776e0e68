//! Scenario tests for the session manager

use super::*;
use crate::ml::ensemble::FALLBACK_CONFIDENCE;
use crate::testing::HistoryGenerator;
use crate::types::Category::{Primary as T, Secondary as X};

fn config() -> SessionConfig {
    SessionConfig {
        score: ScoreConfig {
            seed: Some(17),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn session(records: Vec<OutcomeRecord>) -> Session {
    Session::initialize(records, config()).unwrap()
}

#[test]
fn test_short_history_uses_fallback() {
    let s = session(HistoryGenerator::from_totals(&[12, 7, 7, 13, 9]));
    let prediction = s.current_prediction();
    assert!(prediction.fallback);
    assert_eq!(prediction.confidence, FALLBACK_CONFIDENCE);
    assert_eq!(prediction.representative_values.len(), 3);
    assert!(prediction.category.is_live());
}

#[test]
fn test_secondary_streak_hit_counter() {
    let mut s = session(HistoryGenerator::constant(X, 20));
    let predicted = s.current_prediction().category;

    let mut generator = HistoryGenerator::new(0).starting_at(21);
    s.append(generator.record(7)).unwrap();

    let accuracy = s.accuracy_snapshot();
    assert_eq!(accuracy.total, 1);
    assert_eq!(accuracy.hits, u64::from(predicted == X));
}

#[test]
fn test_discard_round_is_never_scored() {
    let history = HistoryGenerator::random(31, 60);
    let mut s = session(history);
    let stats_before = s.predictor_stats();
    let accuracy_before = s.accuracy_snapshot();

    let mut generator = HistoryGenerator::new(0).starting_at(61);
    s.append(generator.record(18)).unwrap();

    assert_eq!(s.accuracy_snapshot(), accuracy_before);
    assert_eq!(s.predictor_stats(), stats_before);
    assert_eq!(s.history().len(), 61);
    assert_eq!(s.last_record().map(|r| r.category), Some(Category::Discard));
}

#[test]
fn test_discard_round_does_not_change_votes() {
    let history = HistoryGenerator::random(32, 90);
    let with_discard = {
        let mut records = history.clone();
        let mut generator = HistoryGenerator::new(0).starting_at(91);
        records.push(generator.record(3));
        records
    };

    let ensemble = WeightedEnsemble::with_defaults();
    assert_eq!(
        ensemble.predict(&history).votes,
        ensemble.predict(&with_discard).votes
    );
}

#[test]
fn test_current_prediction_is_idempotent() {
    let s = session(HistoryGenerator::random(4, 120));
    let a = s.current_prediction().clone();
    let b = s.current_prediction().clone();
    assert_eq!(a, b);
}

#[test]
fn test_confidence_bounds_through_updates() {
    let records = HistoryGenerator::random(9, 160);
    let (head, rest) = records.split_at(40);
    let mut s = session(head.to_vec());

    for record in rest {
        let prediction = s.append(record.clone()).unwrap();
        if prediction.fallback {
            assert_eq!(prediction.confidence, 0.5);
        } else {
            assert!((0.51..=0.99).contains(&prediction.confidence));
        }
        let values = &prediction.representative_values;
        assert_eq!(values.len(), 3);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values
            .iter()
            .all(|v| prediction.category.candidate_totals().contains(v)));
        assert!((s.weight_sum() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_scoring_waits_for_ten_usable_rounds() {
    let records = HistoryGenerator::alternating(T, 14);
    let (head, rest) = records.split_at(5);
    let mut s = session(head.to_vec());

    // prefixes of 5..=9 usable rounds are not scored
    for record in &rest[..5] {
        s.append(record.clone()).unwrap();
    }
    assert_eq!(s.accuracy_snapshot().total, 0);

    s.append(rest[5].clone()).unwrap();
    assert_eq!(s.accuracy_snapshot().total, 1);
}

#[test]
fn test_initialize_matches_manual_replay() {
    let records = HistoryGenerator::random(12, 150);
    let s = session(records.clone());

    let mut ensemble = WeightedEnsemble::with_defaults();
    ensemble.fit_initial(&records);
    let live: Vec<_> = records.iter().filter(|r| r.category.is_live()).cloned().collect();
    for i in 20..live.len() {
        ensemble.update_with_outcome(&live[..i], live[i].category);
    }

    assert_eq!(s.predictor_stats(), ensemble.predictor_stats());
    assert_eq!(s.current_prediction().category, ensemble.predict(&records).category);
}

#[test]
fn test_out_of_order_append_is_rejected() {
    let mut s = session(HistoryGenerator::random(2, 30));
    let before = s.current_prediction().clone();

    let mut generator = HistoryGenerator::new(0).starting_at(30);
    let err = s.append(generator.record(12)).unwrap_err();
    assert!(matches!(
        err,
        SicboError::OutOfOrder {
            sequence_id: 30,
            last: 30
        }
    ));
    assert_eq!(s.history().len(), 30);
    assert_eq!(s.current_prediction(), &before);
}

#[test]
fn test_initialize_validates_batch() {
    assert!(matches!(
        Session::initialize(Vec::new(), config()),
        Err(SicboError::NotInitialized)
    ));

    let mut records = HistoryGenerator::random(1, 10);
    records.swap(3, 4);
    assert!(matches!(
        Session::initialize(records, config()),
        Err(SicboError::OutOfOrder {
            sequence_id: 4,
            last: 5
        })
    ));
}

#[test]
fn test_recent_history_is_capped() {
    let s = Session::initialize(
        HistoryGenerator::random(3, 40),
        SessionConfig {
            serve_limit: 25,
            ..config()
        },
    )
    .unwrap();

    assert_eq!(s.recent_history(10).len(), 10);
    assert_eq!(s.recent_history(100).len(), 25);
    assert_eq!(s.recent_history(10)[9].sequence_id, 40);
    assert_eq!(s.next_sequence_id(), Some(41));
}

#[test]
fn test_history_is_bounded_by_retention_limit() {
    let records = HistoryGenerator::random(12, 100);
    let retained = SessionConfig {
        retention_limit: 60,
        ..config()
    };
    let mut s = Session::initialize(records[..80].to_vec(), retained).unwrap();
    assert_eq!(s.history().len(), 60);
    assert_eq!(s.history()[0].sequence_id, 21);

    for record in &records[80..] {
        s.append(record.clone()).unwrap();
        assert_eq!(s.history().len(), 60);
    }
    assert_eq!(s.history()[0].sequence_id, 41);
    assert_eq!(s.last_record().map(|r| r.sequence_id), Some(100));
    assert_eq!(s.next_sequence_id(), Some(101));

    // ordering is still checked against the newest retained round
    assert!(matches!(
        s.append(records[30].clone()),
        Err(SicboError::OutOfOrder { last: 100, .. })
    ));
}

#[test]
fn test_selection_memory_tracks_forecasts() {
    let records = HistoryGenerator::random(5, 80);
    let (head, rest) = records.split_at(40);
    let mut s = session(head.to_vec());
    for record in rest {
        s.append(record.clone()).unwrap();
    }
    let remembered = s.selection_memory_len(T) + s.selection_memory_len(X);
    assert!(remembered >= 1);
    assert!(s.selection_memory_len(T) <= 10);
    assert!(s.selection_memory_len(X) <= 10);
}

#[tokio::test]
async fn test_handle_ingest_lifecycle() {
    let handle = SessionHandle::new(config());
    assert!(!handle.is_initialized().await);
    assert!(handle.prediction().await.is_none());
    assert_eq!(handle.ingest(Vec::new()).await.unwrap(), IngestOutcome::Empty);

    let records = HistoryGenerator::random(8, 50);
    let first = records[..40].to_vec();
    assert_eq!(
        handle.ingest(first.clone()).await.unwrap(),
        IngestOutcome::Initialized { records: 40 }
    );
    assert_eq!(handle.ingest(first).await.unwrap(), IngestOutcome::Unchanged);

    // overlapping page: only ids above 40 are appended
    let page = records[35..45].to_vec();
    assert_eq!(
        handle.ingest(page).await.unwrap(),
        IngestOutcome::Appended { records: 5 }
    );
    assert_eq!(handle.last_sequence_id().await, Some(45));
    assert!(handle.accuracy().await.is_some());
}

#[tokio::test]
async fn test_handle_snapshot() {
    let handle = SessionHandle::new(config());
    handle.ingest(HistoryGenerator::random(6, 30)).await.unwrap();

    let snapshot = handle.snapshot(5).await.unwrap();
    assert_eq!(snapshot.recent.len(), 5);
    assert_eq!(snapshot.recent[0].sequence_id, 30);
    assert_eq!(snapshot.next_sequence_id, Some(31));
    assert_eq!(snapshot.history_len, 30);
    assert_eq!(snapshot.prediction, handle.prediction().await.unwrap());

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json["prediction"]["category"].is_string());
}
