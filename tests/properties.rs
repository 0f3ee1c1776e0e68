//! Property tests over arbitrary outcome streams

use proptest::prelude::*;
use sicbo_predictor::ml::ensemble::FALLBACK_CONFIDENCE;
use sicbo_predictor::ml::score::{select_diverse, Distribution};
use sicbo_predictor::ml::{default_predictors, WeightedEnsemble};
use sicbo_predictor::testing::HistoryGenerator;
use sicbo_predictor::{Category, Session, SessionConfig};

fn totals(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(3u8..=18, 0..max_len)
}

fn live_category() -> impl Strategy<Value = Category> {
    prop_oneof![Just(Category::Primary), Just(Category::Secondary)]
}

fn seeded_config(seed: u64) -> SessionConfig {
    let mut config = SessionConfig::default();
    config.score.seed = Some(seed);
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn weights_always_sum_to_one(totals in totals(160)) {
        let history = HistoryGenerator::from_totals(&totals);
        let mut ensemble = WeightedEnsemble::with_defaults();
        ensemble.fit_initial(&history);
        prop_assert!((ensemble.weight_sum() - 1.0).abs() < 1e-9);

        for i in 10..history.len() {
            ensemble.update_with_outcome(&history[..i], history[i].category);
            prop_assert!((ensemble.weight_sum() - 1.0).abs() < 1e-9);
        }
        for (_, weight) in ensemble.weights() {
            prop_assert!(weight > 0.0);
        }
    }

    #[test]
    fn confidence_stays_in_bounds(totals in totals(200)) {
        let history = HistoryGenerator::from_totals(&totals);
        let vote = WeightedEnsemble::with_defaults().predict(&history);

        prop_assert!(vote.category.is_live());
        if vote.fallback {
            prop_assert_eq!(vote.confidence, FALLBACK_CONFIDENCE);
            prop_assert!(vote.votes.iter().all(|v| v.vote.is_none()));
        } else {
            prop_assert!((0.51..=0.99).contains(&vote.confidence));
        }
    }

    #[test]
    fn session_forecast_shape(totals in totals(120), seed in any::<u64>()) {
        prop_assume!(!totals.is_empty());
        let history = HistoryGenerator::from_totals(&totals);
        let session = Session::initialize(history, seeded_config(seed)).unwrap();
        let prediction = session.current_prediction();

        let values = &prediction.representative_values;
        prop_assert_eq!(values.len(), 3);
        prop_assert!(values.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(values
            .iter()
            .all(|v| prediction.category.candidate_totals().contains(v)));
    }

    #[test]
    fn diverse_selection_is_distinct(
        category in live_category(),
        weights in prop::collection::vec(0.0f64..1.0, 7),
    ) {
        let candidates = category.candidate_totals();
        let combined: Distribution = candidates.iter().copied().zip(weights).collect();
        let selected = select_diverse(&combined, candidates);

        prop_assert_eq!(selected.len(), 3);
        let mut unique = selected.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), 3);
        prop_assert!(selected.iter().all(|v| candidates.contains(v)));
    }

    #[test]
    fn predictors_are_pure_and_ignore_discards(totals in totals(150)) {
        let history = HistoryGenerator::from_totals(&totals);
        let mut with_discard = history.clone();
        with_discard.push(HistoryGenerator::new(0).starting_at(totals.len() as u64 + 1).record(18));

        for predictor in default_predictors() {
            let first = predictor.predict(&history);
            prop_assert_eq!(first, predictor.predict(&history));
            prop_assert_eq!(first, predictor.predict(&with_discard));
            prop_assert!(first.map_or(true, |c| c.is_live()));
        }
    }
}
