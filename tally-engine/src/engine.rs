//! Public engine facade: lock management, persistence, error collapsing.
//!
//! All three stores live behind `RwLock`s inside one [`Categorizer`].
//! Suggestion requests read a consistent snapshot; every mutation
//! (feedback, induction) runs under the write locks and persists before
//! release, so concurrent feedback cannot lose updates. Errors never
//! cross the public surface — they are logged and collapsed to empty
//! results or no-ops.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use chrono::Utc;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tally_core::extract_features;
use tally_core::types::{CategorySuggestion, Feedback, TrainingExample};

use crate::aggregator::aggregate;
use crate::eval::{AccuracyReport, evaluate};
use crate::induction::induce_rules;
use crate::merchants::MerchantMap;
use crate::rules::RuleStore;
use crate::store::DataStore;

/// Match score a rule must reach for feedback to adjust it
const FEEDBACK_MATCH_THRESHOLD: f64 = 0.5;

/// Engine configuration, read once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding `rules.json`, `merchants.json`, `corpus.json`
    pub data_dir: PathBuf,
    /// IANA timezone used for time-of-day bucketing
    pub timezone: String,
    /// Rolling-window cap on the training corpus
    pub max_examples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".tally"),
            timezone: "Asia/Taipei".to_string(),
            max_examples: 5000,
        }
    }
}

impl EngineConfig {
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: dir.into(), ..Self::default() }
    }
}

/// Store counters for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineStats {
    pub total_rules: usize,
    pub active_rules: usize,
    pub merchant_mappings: usize,
    pub corpus_size: usize,
}

/// The adaptive categorization engine
pub struct Categorizer {
    tz: Tz,
    max_examples: usize,
    store: DataStore,
    rules: RwLock<RuleStore>,
    merchants: RwLock<MerchantMap>,
    corpus: RwLock<Vec<TrainingExample>>,
}

impl Categorizer {
    /// Open the engine over a data directory, loading persisted state.
    /// Unreadable stores degrade to seeds/empty (logged), never fail.
    pub fn open(config: EngineConfig) -> Self {
        let tz: Tz = tally_core::parse_timezone(&config.timezone).unwrap_or_else(|e| {
            warn!(error = %e, "falling back to Asia/Taipei");
            chrono_tz::Asia::Taipei
        });
        let store = DataStore::new(&config.data_dir);
        let now = Utc::now();

        Self {
            tz,
            max_examples: config.max_examples.max(1),
            rules: RwLock::new(store.load_rules(now)),
            merchants: RwLock::new(store.load_merchants()),
            corpus: RwLock::new(store.load_corpus()),
            store,
        }
    }

    /// Rank category suggestions for one transaction input.
    ///
    /// Total: bad input yields an empty or low-confidence list, never an
    /// error. Identical inputs with no intervening feedback yield
    /// identical output.
    pub fn suggest_categories(
        &self,
        description: &str,
        amount: f64,
        merchant: &str,
        max_suggestions: usize,
    ) -> Vec<CategorySuggestion> {
        let outcome = {
            let rules = read(&self.rules);
            let merchants = read(&self.merchants);
            let corpus = read(&self.corpus);
            aggregate(&rules, &merchants, &corpus, description, amount, merchant, max_suggestions)
        };

        // Usage counters change under the write lock, after the read
        // snapshot is released. They do not affect suggestion output.
        if !outcome.used_rule_ids.is_empty() {
            write(&self.rules).mark_used(&outcome.used_rule_ids, Utc::now());
        }

        outcome.suggestions
    }

    /// Ingest one feedback event. Fire-and-forget: failures are logged,
    /// never surfaced.
    pub fn submit_feedback(&self, feedback: Feedback) {
        if let Err(e) = self.apply_feedback(&feedback) {
            warn!(error = %e, "feedback submission dropped");
        }
    }

    fn apply_feedback(&self, feedback: &Feedback) -> Result<()> {
        let merchant = feedback.merchant.as_deref().unwrap_or("");
        let features =
            extract_features(&feedback.description, feedback.amount, merchant, feedback.timestamp, self.tz);

        // Fixed lock order: rules, merchants, corpus.
        let mut rules = write(&self.rules);
        let mut merchants = write(&self.merchants);
        let mut corpus = write(&self.corpus);

        let example = TrainingExample {
            id: format!("ex-{}-{}", feedback.timestamp.timestamp_millis(), corpus.len()),
            description: feedback.description.clone(),
            amount: feedback.amount,
            merchant: feedback.merchant.clone(),
            category_id: feedback.category_id.clone(),
            is_correct: feedback.is_correct,
            user_id: feedback.user_id.clone(),
            timestamp: feedback.timestamp,
            features,
        };
        corpus.push(example);
        let overflow = corpus.len().saturating_sub(self.max_examples);
        if overflow > 0 {
            corpus.drain(..overflow);
        }

        let adjusted = rules.matching_ids(
            &feedback.description,
            merchant,
            feedback.amount,
            &feedback.category_id,
            FEEDBACK_MATCH_THRESHOLD,
        );
        for rule_id in &adjusted {
            if feedback.is_correct {
                rules.reinforce(rule_id);
            } else {
                rules.decay(rule_id);
            }
        }
        if feedback.is_correct && !merchant.trim().is_empty() {
            merchants.upsert(merchant, &feedback.category_id);
        }
        debug!(
            category = %feedback.category_id,
            correct = feedback.is_correct,
            rules_adjusted = adjusted.len(),
            "feedback applied"
        );

        self.store.save_corpus(&corpus)?;
        self.store.save_rules(&rules)?;
        self.store.save_merchants(&merchants)?;
        Ok(())
    }

    /// Induce new rules from the accumulated corpus (on demand, not per
    /// feedback). Returns the number of rules added; 0 on error.
    pub fn induce_rules(&self) -> usize {
        match self.try_induce() {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "rule induction failed");
                0
            }
        }
    }

    fn try_induce(&self) -> Result<usize> {
        let mut rules = write(&self.rules);
        let corpus = read(&self.corpus);

        let induced = induce_rules(&rules, &corpus, Utc::now());
        let count = induced.len();
        if count > 0 {
            rules.rules.extend(induced);
            self.store.save_rules(&rules)?;
            debug!(count, "induced new rules");
        }
        Ok(count)
    }

    /// Accuracy over the most recent `test_size` examples (≤ 100).
    /// Read-only; zero-filled report when the corpus is empty.
    pub fn evaluate_accuracy(&self, test_size: usize) -> AccuracyReport {
        let rules = read(&self.rules);
        let merchants = read(&self.merchants);
        let corpus = read(&self.corpus);
        evaluate(&rules, &merchants, &corpus, test_size)
    }

    pub fn stats(&self) -> EngineStats {
        let rules = read(&self.rules);
        EngineStats {
            total_rules: rules.rules.len(),
            active_rules: rules.active_count(),
            merchant_mappings: read(&self.merchants).mappings.len(),
            corpus_size: read(&self.corpus).len(),
        }
    }
}

// Lock poisoning cannot corrupt these stores (mutations are small and
// total), so a poisoned guard is recovered rather than propagated.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_engine(tag: &str) -> Categorizer {
        let dir = std::env::temp_dir().join(format!("tally-engine-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        Categorizer::open(EngineConfig::with_data_dir(dir))
    }

    fn feedback(description: &str, amount: f64, merchant: Option<&str>, category: &str, correct: bool) -> Feedback {
        Feedback {
            description: description.to_string(),
            amount,
            merchant: merchant.map(|m| m.to_string()),
            category_id: category.to_string(),
            is_correct: correct,
            user_id: "u1".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_suggest_never_panics_on_degenerate_input() {
        let engine = temp_engine("degenerate");
        assert!(engine.suggest_categories("", 0.0, "", 5).len() <= 5);
        engine.suggest_categories("x", -50.0, "", 1);
        engine.suggest_categories("午餐", 0.0, "", 0);
    }

    #[test]
    fn test_suggest_is_idempotent_without_feedback() {
        let engine = temp_engine("idempotent");
        let a = engine.suggest_categories("星巴克 咖啡", 150.0, "星巴克", 3);
        let b = engine.suggest_categories("星巴克 咖啡", 150.0, "星巴克", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_merchant_scenario_starbucks() {
        let engine = temp_engine("starbucks");
        let out = engine.suggest_categories("我昨天在星巴克買咖啡", 150.0, "星巴克", 5);

        let food = out
            .iter()
            .find(|s| s.category_id == "food")
            .expect("expected a food suggestion");
        assert!(food.confidence >= 0.6, "confidence = {}", food.confidence);
        assert!(food.reason.contains("merchant"), "reason = {}", food.reason);
    }

    #[test]
    fn test_feedback_reinforces_matching_rules() {
        let engine = temp_engine("reinforce");
        let before = read(&engine.rules)
            .rules
            .iter()
            .find(|r| r.id == "seed-food-meals")
            .unwrap()
            .min_confidence;

        engine.submit_feedback(feedback("公司 午餐 便當", 120.0, None, "food", true));

        let after = read(&engine.rules)
            .rules
            .iter()
            .find(|r| r.id == "seed-food-meals")
            .unwrap()
            .min_confidence;
        assert!(after > before, "expected reinforcement ({before} -> {after})");
    }

    #[test]
    fn test_feedback_decay_eventually_deactivates() {
        let engine = temp_engine("decay");
        for _ in 0..5 {
            engine.submit_feedback(feedback("公司 午餐 便當", 120.0, None, "food", false));
        }

        let rules = read(&engine.rules);
        let rule = rules.rules.iter().find(|r| r.id == "seed-food-meals").unwrap();
        assert!(!rule.is_active, "rule should deactivate after repeated decay");
        drop(rules);

        // A deactivated rule contributes no rule-based suggestion.
        let out = engine.suggest_categories("公司 午餐 便當", 120.0, "", 5);
        assert!(
            out.iter()
                .all(|s| s.source != tally_core::SuggestionSource::RuleBased)
        );
    }

    #[test]
    fn test_merchant_disagreement_last_writer_wins() {
        let engine = temp_engine("disagreement");
        engine.submit_feedback(feedback("全聯 買菜", 300.0, Some("全聯"), "shopping", true));
        engine.submit_feedback(feedback("全聯 買菜", 300.0, Some("全聯"), "food", true));

        let merchants = read(&engine.merchants);
        let mapping = merchants
            .mappings
            .iter()
            .find(|m| m.merchant_name == "全聯")
            .unwrap();
        assert_eq!(mapping.category_id, "food");
    }

    #[test]
    fn test_corpus_rolling_window_cap() {
        let dir = std::env::temp_dir().join(format!("tally-engine-cap-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let config = EngineConfig { max_examples: 3, ..EngineConfig::with_data_dir(dir) };
        let engine = Categorizer::open(config);

        for i in 0..5 {
            engine.submit_feedback(feedback(&format!("消費 {i}"), 100.0, None, "food", true));
        }

        let corpus = read(&engine.corpus);
        assert_eq!(corpus.len(), 3);
        assert!(corpus[0].description.contains('2'), "oldest examples dropped first");
    }

    #[test]
    fn test_evaluate_accuracy_empty_corpus() {
        let engine = temp_engine("eval-empty");
        let report = engine.evaluate_accuracy(50);
        assert_eq!(report.overall_accuracy, 0.0);
        assert_eq!(report.total_test_cases, 0);
    }

    #[test]
    fn test_stats_reflect_stores() {
        let engine = temp_engine("stats");
        let stats = engine.stats();
        assert!(stats.total_rules >= stats.active_rules);
        assert!(stats.merchant_mappings > 0);
        assert_eq!(stats.corpus_size, 0);
    }
}
