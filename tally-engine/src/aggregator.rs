//! Suggestion aggregator: fans out to the five signal sources and merges
//! their output into one ranked, de-duplicated list.
//!
//! Each source is fallible in isolation; a failing source is logged and
//! contributes nothing. The aggregate itself never fails.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use tracing::warn;

use tally_core::category::category_meta;
use tally_core::lexicon::{AMOUNT_RANGES, KEYWORD_CATEGORIES};
use tally_core::similarity::similarity;
use tally_core::text::normalize;
use tally_core::types::{CategorySuggestion, SuggestionSource, TrainingExample};

use crate::merchants::MerchantMap;
use crate::rules::RuleStore;

/// Weights for combining text and amount similarity in history matching
const HISTORY_TEXT_WEIGHT: f64 = 0.7;
const HISTORY_AMOUNT_WEIGHT: f64 = 0.3;
/// Combined score a historical example must clear
const HISTORY_THRESHOLD: f64 = 0.6;

/// Keyword dictionary confidence tiers
const KEYWORD_EXACT_CONFIDENCE: f64 = 0.8;
const KEYWORD_PARTIAL_STEP: f64 = 0.2;
const KEYWORD_PARTIAL_CAP: f64 = 0.6;

/// Flat confidence of the amount-range heuristic
const AMOUNT_RANGE_CONFIDENCE: f64 = 0.3;

/// Everything the aggregate pass produced: the ranked suggestions plus
/// the ids of rules that emitted (for usage bookkeeping by the caller).
pub(crate) struct AggregateOutcome {
    pub suggestions: Vec<CategorySuggestion>,
    pub used_rule_ids: Vec<String>,
}

/// Run the full fan-out/consolidate/rank pipeline over immutable store
/// snapshots. Infallible: failing sources degrade to empty.
pub(crate) fn aggregate(
    rules: &RuleStore,
    merchants: &MerchantMap,
    corpus: &[TrainingExample],
    description: &str,
    amount: f64,
    merchant: &str,
    max_suggestions: usize,
) -> AggregateOutcome {
    let mut all: Vec<CategorySuggestion> = Vec::new();
    let mut used_rule_ids = Vec::new();

    match rule_suggestions(rules, description, merchant, amount) {
        Ok((suggestions, ids)) => {
            all.extend(suggestions);
            used_rule_ids = ids;
        }
        Err(e) => warn!(error = %e, "rule source failed"),
    }
    match keyword_suggestions(description) {
        Ok(s) => all.extend(s),
        Err(e) => warn!(error = %e, "keyword source failed"),
    }
    match history_suggestions(corpus, description, amount) {
        Ok(s) => all.extend(s),
        Err(e) => warn!(error = %e, "history source failed"),
    }
    match merchant_suggestions(merchants, merchant) {
        Ok(s) => all.extend(s),
        Err(e) => warn!(error = %e, "merchant source failed"),
    }
    match amount_suggestions(amount) {
        Ok(s) => all.extend(s),
        Err(e) => warn!(error = %e, "amount source failed"),
    }

    let suggestions = consolidate(all, max_suggestions);
    AggregateOutcome { suggestions, used_rule_ids }
}

/// Signal source: the adaptive rule store.
fn rule_suggestions(
    rules: &RuleStore,
    description: &str,
    merchant: &str,
    amount: f64,
) -> Result<(Vec<CategorySuggestion>, Vec<String>)> {
    let matches = rules.matches(description, merchant, amount);
    let ids = matches.iter().map(|m| m.rule_id.clone()).collect();
    let suggestions = matches
        .into_iter()
        .map(|m| {
            CategorySuggestion::bare(
                m.category_id,
                m.score,
                format!("matched rule \"{}\"", m.rule_name),
                SuggestionSource::RuleBased,
            )
        })
        .collect();
    Ok((suggestions, ids))
}

/// Signal source: the static keyword→category dictionary. An exact token
/// hit earns full confidence; substring hits accumulate a weaker score.
fn keyword_suggestions(description: &str) -> Result<Vec<CategorySuggestion>> {
    let tokens: HashSet<String> = normalize(description).into_iter().collect();
    let lowered = description.to_lowercase();

    struct CategoryHits<'a> {
        exact: Option<&'a str>,
        partial: Vec<&'a str>,
    }
    let mut per_category: HashMap<&str, CategoryHits> = HashMap::new();

    for &(keyword, category) in KEYWORD_CATEGORIES {
        let hits = per_category
            .entry(category)
            .or_insert(CategoryHits { exact: None, partial: Vec::new() });
        if tokens.contains(keyword) {
            hits.exact.get_or_insert(keyword);
        } else if lowered.contains(keyword) {
            hits.partial.push(keyword);
        }
    }

    let mut suggestions = Vec::new();
    for (category, hits) in per_category {
        if let Some(keyword) = hits.exact {
            suggestions.push(CategorySuggestion::bare(
                category,
                KEYWORD_EXACT_CONFIDENCE,
                format!("keyword \"{keyword}\""),
                SuggestionSource::KeywordBased,
            ));
        } else if !hits.partial.is_empty() {
            let confidence =
                (KEYWORD_PARTIAL_STEP * hits.partial.len() as f64).min(KEYWORD_PARTIAL_CAP);
            suggestions.push(CategorySuggestion::bare(
                category,
                confidence,
                format!("keyword \"{}\" in description", hits.partial[0]),
                SuggestionSource::KeywordBased,
            ));
        }
    }
    Ok(suggestions)
}

/// Signal source: pairwise similarity against confirmed history.
fn history_suggestions(
    corpus: &[TrainingExample],
    description: &str,
    amount: f64,
) -> Result<Vec<CategorySuggestion>> {
    let mut suggestions = Vec::new();
    for example in corpus.iter().filter(|e| e.is_correct) {
        let text_score = similarity(description, &example.description);
        if text_score == 0.0 {
            continue;
        }
        let combined = HISTORY_TEXT_WEIGHT * text_score
            + HISTORY_AMOUNT_WEIGHT * amount_similarity(amount, example.amount);
        if combined > HISTORY_THRESHOLD {
            suggestions.push(CategorySuggestion::bare(
                example.category_id.clone(),
                combined,
                format!("similar to \"{}\"", snippet(&example.description)),
                SuggestionSource::HistoryBased,
            ));
        }
    }
    Ok(suggestions)
}

/// First few characters of a historical description, for reason strings.
fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 18;
    if text.chars().count() <= MAX_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    }
}

/// Ratio-based amount similarity with a flat 0.2 penalty. Two zero
/// amounts count as identical.
fn amount_similarity(a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi <= 0.0 {
        return 0.8;
    }
    (lo / hi - 0.2).max(0.0)
}

/// Signal source: the merchant association table.
fn merchant_suggestions(merchants: &MerchantMap, merchant: &str) -> Result<Vec<CategorySuggestion>> {
    Ok(merchants
        .lookup(merchant)
        .into_iter()
        .map(|m| {
            CategorySuggestion::bare(
                m.category_id.clone(),
                m.confidence,
                format!("merchant match \"{}\"", m.standard_name),
                SuggestionSource::MerchantBased,
            )
        })
        .collect())
}

/// Signal source: fixed amount-range heuristics.
fn amount_suggestions(amount: f64) -> Result<Vec<CategorySuggestion>> {
    Ok(AMOUNT_RANGES
        .iter()
        .filter(|range| amount >= range.min && amount < range.max)
        .map(|range| {
            CategorySuggestion::bare(
                range.category,
                AMOUNT_RANGE_CONFIDENCE,
                format!("amount typical for {}", range.category),
                SuggestionSource::AmountBased,
            )
        })
        .collect())
}

/// Keep the single best suggestion per category, rank by confidence with
/// a stable tie-break, truncate, then attach display metadata.
fn consolidate(all: Vec<CategorySuggestion>, max_suggestions: usize) -> Vec<CategorySuggestion> {
    let mut best: HashMap<String, CategorySuggestion> = HashMap::new();
    for suggestion in all {
        match best.get(&suggestion.category_id) {
            Some(existing) if existing.confidence >= suggestion.confidence => {}
            _ => {
                best.insert(suggestion.category_id.clone(), suggestion);
            }
        }
    }

    let mut ranked: Vec<CategorySuggestion> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category_id.cmp(&b.category_id))
    });
    ranked.truncate(max_suggestions);

    for suggestion in ranked.iter_mut() {
        let meta = category_meta(&suggestion.category_id);
        suggestion.category_name = meta.name.to_string();
        suggestion.icon = meta.icon.to_string();
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tally_core::features::extract_features;

    fn example(description: &str, amount: f64, category: &str) -> TrainingExample {
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap();
        let tz = "Asia/Taipei".parse().unwrap();
        TrainingExample {
            id: "ex".to_string(),
            description: description.to_string(),
            amount,
            merchant: None,
            category_id: category.to_string(),
            is_correct: true,
            user_id: "u1".to_string(),
            timestamp: at,
            features: extract_features(description, amount, "", at, tz),
        }
    }

    fn aggregate_simple(description: &str, amount: f64, merchant: &str) -> Vec<CategorySuggestion> {
        let rules = RuleStore::default();
        let merchants = MerchantMap::with_defaults();
        aggregate(&rules, &merchants, &[], description, amount, merchant, 5).suggestions
    }

    #[test]
    fn test_no_duplicate_categories_and_bounded_length() {
        let out = aggregate_simple("午餐 便當 咖啡", 120.0, "星巴克");
        assert!(out.len() <= 5);
        let ids: HashSet<&str> = out.iter().map(|s| s.category_id.as_str()).collect();
        assert_eq!(ids.len(), out.len(), "duplicate category ids in {out:?}");
    }

    #[test]
    fn test_ranked_descending() {
        let out = aggregate_simple("午餐 電影", 120.0, "");
        for pair in out.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_exact_keyword_beats_partial() {
        // "午餐" is a standalone token: exact tier.
        let out = aggregate_simple("公司 午餐", 0.0, "");
        let food = out.iter().find(|s| s.category_id == "food").unwrap();
        assert_eq!(food.confidence, KEYWORD_EXACT_CONFIDENCE);

        // Embedded in an unspaced phrase: partial tier only.
        let out = aggregate_simple("吃午餐囉", 0.0, "");
        let food = out.iter().find(|s| s.category_id == "food").unwrap();
        assert!(food.confidence <= KEYWORD_PARTIAL_CAP);
    }

    #[test]
    fn test_merchant_source_contributes() {
        let out = aggregate_simple("我昨天在星巴克買咖啡", 150.0, "星巴克");
        let food = out.iter().find(|s| s.category_id == "food").unwrap();
        assert!(food.confidence >= 0.6);
        // Display metadata attached after consolidation.
        assert_eq!(food.category_name, "餐飲美食");
        assert!(!food.icon.is_empty());
    }

    #[test]
    fn test_history_source_requires_high_combined_score() {
        let corpus = vec![example("星巴克 拿鐵 咖啡", 150.0, "food")];
        let rules = RuleStore::default();
        let merchants = MerchantMap::default();

        // Near-identical text and amount clears the bar.
        let out = aggregate(&rules, &merchants, &corpus, "星巴克 拿鐵 咖啡", 160.0, "", 5);
        let food = out.suggestions.iter().find(|s| s.category_id == "food");
        assert!(food.is_some_and(|s| s.source == SuggestionSource::HistoryBased));

        // Unrelated text does not.
        let out = aggregate(&rules, &merchants, &corpus, "電費 帳單", 160.0, "", 5);
        assert!(
            out.suggestions
                .iter()
                .all(|s| s.source != SuggestionSource::HistoryBased)
        );
    }

    #[test]
    fn test_amount_similarity_properties() {
        assert_eq!(amount_similarity(0.0, 0.0), 0.8);
        assert!((amount_similarity(100.0, 100.0) - 0.8).abs() < 1e-9);
        assert_eq!(amount_similarity(10.0, 10000.0), 0.0);
        assert_eq!(amount_similarity(100.0, 200.0), amount_similarity(200.0, 100.0));
    }

    #[test]
    fn test_unknown_category_gets_other_metadata() {
        let corpus = vec![example("客製 分類 測試", 100.0, "my-custom-cat")];
        let rules = RuleStore::default();
        let merchants = MerchantMap::default();
        let out = aggregate(&rules, &merchants, &corpus, "客製 分類 測試", 100.0, "", 5);
        let custom = out
            .suggestions
            .iter()
            .find(|s| s.category_id == "my-custom-cat")
            .expect("history should surface the custom category");
        assert_eq!(custom.category_name, "其他");
    }

    #[test]
    fn test_empty_input_yields_no_panic() {
        let out = aggregate_simple("", 0.0, "");
        assert!(out.len() <= 5);
    }

    #[test]
    fn test_amount_range_source_fires_with_flat_confidence() {
        let out = aggregate_simple("something nondescript", 90.0, "");
        let food = out.iter().find(|s| s.category_id == "food").unwrap();
        assert_eq!(food.source, SuggestionSource::AmountBased);
        assert_eq!(food.confidence, AMOUNT_RANGE_CONFIDENCE);
    }
}
