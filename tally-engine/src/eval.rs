//! Held-out accuracy evaluation over the most recent corpus slice.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tally_core::types::TrainingExample;

use crate::aggregator::aggregate;
use crate::merchants::MerchantMap;
use crate::rules::RuleStore;

/// Upper bound on the held-out slice
pub const MAX_TEST_SIZE: usize = 100;
/// Suggestions requested per evaluated example; only the top one counts
const EVAL_SUGGESTIONS: usize = 3;

/// Per-category accuracy breakdown
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryAccuracy {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

/// End-to-end classifier accuracy over a recent corpus slice
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccuracyReport {
    pub overall_accuracy: f64,
    pub total_test_cases: usize,
    pub correct_predictions: usize,
    pub per_category: BTreeMap<String, CategoryAccuracy>,
}

/// Run the aggregator over the most recent `test_size` examples (capped
/// at [`MAX_TEST_SIZE`]) and compare the top suggestion against the
/// recorded category. State is never mutated. Zero-filled report for an
/// empty corpus.
pub(crate) fn evaluate(
    rules: &RuleStore,
    merchants: &MerchantMap,
    corpus: &[TrainingExample],
    test_size: usize,
) -> AccuracyReport {
    let take = test_size.min(MAX_TEST_SIZE).min(corpus.len());
    if take == 0 {
        return AccuracyReport::default();
    }

    let held_out = &corpus[corpus.len() - take..];
    let mut report = AccuracyReport {
        total_test_cases: take,
        ..AccuracyReport::default()
    };

    for example in held_out {
        let outcome = aggregate(
            rules,
            merchants,
            corpus,
            &example.description,
            example.amount,
            example.merchant.as_deref().unwrap_or(""),
            EVAL_SUGGESTIONS,
        );
        let hit = outcome
            .suggestions
            .first()
            .is_some_and(|top| top.category_id == example.category_id);

        let slot = report.per_category.entry(example.category_id.clone()).or_default();
        slot.total += 1;
        if hit {
            slot.correct += 1;
            report.correct_predictions += 1;
        }
    }

    report.overall_accuracy = report.correct_predictions as f64 / take as f64;
    for slot in report.per_category.values_mut() {
        slot.accuracy = slot.correct as f64 / slot.total as f64;
    }
    report
}
