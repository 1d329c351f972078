//! Categorization rules: match scoring, confidence adaptation, seeds.
//!
//! A rule declares up to three dimensions (keywords, merchant patterns,
//! amount bounds) and emits a suggestion when its weighted match score
//! reaches its own `min_confidence`. Feedback nudges `min_confidence` up
//! or down; rules falling below the deactivation threshold are soft-
//! disabled, never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bounds for confidence adaptation
pub const CONFIDENCE_FLOOR: f64 = 0.1;
pub const CONFIDENCE_CAP: f64 = 0.95;
/// Rules whose confidence sinks below this are deactivated
pub const DEACTIVATION_THRESHOLD: f64 = 0.3;
pub const REINFORCE_STEP: f64 = 0.01;
pub const DECAY_STEP: f64 = 0.05;

/// Dimension weights for match scoring
const KEYWORD_WEIGHT: f64 = 0.4;
const MERCHANT_WEIGHT: f64 = 0.3;
const AMOUNT_WEIGHT: f64 = 0.3;

/// One categorization rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub id: String,
    pub name: String,
    pub category_id: String,
    /// Lowercase keywords matched by containment in the description
    pub keywords: Vec<String>,
    /// Lowercase substrings matched against the merchant name
    pub merchant_patterns: Vec<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Score threshold for emitting a suggestion; adapts with feedback
    pub min_confidence: f64,
    pub priority: i32,
    pub usage_count: u64,
    pub last_used: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CategoryRule {
    /// Weighted match score over the dimensions this rule declares,
    /// normalized so a full match on every declared dimension is 1.0.
    pub fn match_score(&self, description: &str, merchant: &str, amount: f64) -> f64 {
        let mut score = 0.0;
        let mut total_weight = 0.0;

        if !self.keywords.is_empty() {
            let desc = description.to_lowercase();
            let hits = self.keywords.iter().filter(|k| desc.contains(k.as_str())).count();
            score += KEYWORD_WEIGHT * hits as f64 / self.keywords.len() as f64;
            total_weight += KEYWORD_WEIGHT;
        }

        if !self.merchant_patterns.is_empty() {
            let m = merchant.to_lowercase();
            let hit = !m.is_empty() && self.merchant_patterns.iter().any(|p| m.contains(p.as_str()));
            if hit {
                score += MERCHANT_WEIGHT;
            }
            total_weight += MERCHANT_WEIGHT;
        }

        if self.min_amount.is_some() || self.max_amount.is_some() {
            let above = self.min_amount.map(|lo| amount >= lo).unwrap_or(true);
            let below = self.max_amount.map(|hi| amount <= hi).unwrap_or(true);
            if above && below {
                score += AMOUNT_WEIGHT;
            }
            total_weight += AMOUNT_WEIGHT;
        }

        if total_weight == 0.0 { 0.0 } else { score / total_weight }
    }
}

/// A rule that cleared its own threshold for some input
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub rule_id: String,
    pub rule_name: String,
    pub category_id: String,
    pub score: f64,
    pub priority: i32,
}

/// The set of categorization rules
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleStore {
    pub rules: Vec<CategoryRule>,
}

impl RuleStore {
    /// Seed rules installed when no store exists on disk yet
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        let seed = |id: &str, name: &str, category: &str, keywords: &[&str], min_amount: Option<f64>, max_amount: Option<f64>| CategoryRule {
            id: id.to_string(),
            name: name.to_string(),
            category_id: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            merchant_patterns: Vec::new(),
            min_amount,
            max_amount,
            min_confidence: 0.5,
            priority: 1,
            usage_count: 0,
            last_used: None,
            is_active: true,
            created_at: now,
        };

        RuleStore {
            rules: vec![
                seed(
                    "seed-food-meals",
                    "daily meals",
                    "food",
                    &["早餐", "午餐", "晚餐", "便當", "lunch", "dinner"],
                    Some(1.0),
                    Some(500.0),
                ),
                seed(
                    "seed-transport-commute",
                    "commute fares",
                    "transport",
                    &["捷運", "公車", "計程車", "uber", "taxi"],
                    Some(1.0),
                    Some(1000.0),
                ),
                seed(
                    "seed-utilities-bills",
                    "monthly bills",
                    "utilities",
                    &["電費", "水費", "瓦斯費", "電話費"],
                    Some(100.0),
                    Some(10000.0),
                ),
                seed(
                    "seed-housing-rent",
                    "rent",
                    "housing",
                    &["房租", "租金", "rent"],
                    Some(3000.0),
                    None,
                ),
                seed(
                    "seed-subscription-services",
                    "recurring subscriptions",
                    "subscription",
                    &["訂閱", "netflix", "spotify", "icloud"],
                    Some(30.0),
                    Some(2000.0),
                ),
            ],
        }
    }

    /// Score every active rule against the input; return those clearing
    /// their own threshold. Pure — usage bookkeeping is [`Self::mark_used`].
    pub fn matches(&self, description: &str, merchant: &str, amount: f64) -> Vec<RuleMatch> {
        self.rules
            .iter()
            .filter(|r| r.is_active)
            .filter_map(|r| {
                let score = r.match_score(description, merchant, amount);
                (score >= r.min_confidence).then(|| RuleMatch {
                    rule_id: r.id.clone(),
                    rule_name: r.name.clone(),
                    category_id: r.category_id.clone(),
                    score,
                    priority: r.priority,
                })
            })
            .collect()
    }

    /// Ids of active rules whose score reaches `threshold` and whose
    /// category matches — the candidates feedback adjusts.
    pub fn matching_ids(
        &self,
        description: &str,
        merchant: &str,
        amount: f64,
        category_id: &str,
        threshold: f64,
    ) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| r.is_active && r.category_id == category_id)
            .filter(|r| r.match_score(description, merchant, amount) >= threshold)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Bump usage counters for rules that emitted a suggestion.
    pub fn mark_used(&mut self, rule_ids: &[String], now: DateTime<Utc>) {
        for rule in self.rules.iter_mut() {
            if rule_ids.iter().any(|id| *id == rule.id) {
                rule.usage_count += 1;
                rule.last_used = Some(now);
            }
        }
    }

    /// Confirmed-correct feedback: raise the threshold slightly, capped.
    pub fn reinforce(&mut self, rule_id: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == rule_id) {
            rule.min_confidence = (rule.min_confidence + REINFORCE_STEP).min(CONFIDENCE_CAP);
        }
    }

    /// Confirmed-incorrect feedback: drop the threshold; deactivate the
    /// rule once it sinks below [`DEACTIVATION_THRESHOLD`].
    pub fn decay(&mut self, rule_id: &str) {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == rule_id) {
            rule.min_confidence = (rule.min_confidence - DECAY_STEP).max(CONFIDENCE_FLOOR);
            if rule.min_confidence < DEACTIVATION_THRESHOLD {
                rule.is_active = false;
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.rules.iter().filter(|r| r.is_active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    fn rule(keywords: &[&str], patterns: &[&str], bounds: Option<(f64, f64)>) -> CategoryRule {
        CategoryRule {
            id: "r1".to_string(),
            name: "test rule".to_string(),
            category_id: "food".to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            merchant_patterns: patterns.iter().map(|s| s.to_string()).collect(),
            min_amount: bounds.map(|(lo, _)| lo),
            max_amount: bounds.map(|(_, hi)| hi),
            min_confidence: 0.5,
            priority: 1,
            usage_count: 0,
            last_used: None,
            is_active: true,
            created_at: now(),
        }
    }

    #[test]
    fn test_match_score_full_match_is_one() {
        let r = rule(&["午餐"], &["麥當勞"], Some((1.0, 500.0)));
        let score = r.match_score("午餐 套餐", "麥當勞 南京店", 120.0);
        assert!((score - 1.0).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn test_match_score_keyword_fraction() {
        // One of two keywords present, no other dimensions declared.
        let r = rule(&["午餐", "晚餐"], &[], None);
        let score = r.match_score("公司 午餐", "", 0.0);
        assert!((score - 0.5).abs() < 1e-9, "score = {score}");
    }

    #[test]
    fn test_match_score_skips_undeclared_dimensions() {
        // Amount-only rule: in range scores 1.0 regardless of text.
        let r = rule(&[], &[], Some((100.0, 200.0)));
        assert_eq!(r.match_score("anything", "", 150.0), 1.0);
        assert_eq!(r.match_score("anything", "", 999.0), 0.0);
    }

    #[test]
    fn test_match_score_empty_merchant_never_matches_patterns() {
        let r = rule(&[], &["星巴克"], None);
        assert_eq!(r.match_score("買咖啡", "", 0.0), 0.0);
        assert_eq!(r.match_score("買咖啡", "星巴克", 0.0), 1.0);
    }

    #[test]
    fn test_matches_respects_per_rule_threshold() {
        let mut store = RuleStore::default();
        let mut strict = rule(&["午餐", "晚餐", "宵夜"], &[], None);
        strict.min_confidence = 0.9;
        store.rules.push(strict);

        // 1/3 keywords -> score 0.33, below the 0.9 threshold.
        assert!(store.matches("午餐", "", 0.0).is_empty());
    }

    #[test]
    fn test_reinforce_caps_at_ceiling() {
        let mut store = RuleStore::default();
        let mut r = rule(&["午餐"], &[], None);
        r.min_confidence = 0.949;
        store.rules.push(r);

        store.reinforce("r1");
        store.reinforce("r1");
        assert_eq!(store.rules[0].min_confidence, CONFIDENCE_CAP);
    }

    #[test]
    fn test_decay_below_threshold_deactivates() {
        let mut store = RuleStore::default();
        let mut r = rule(&["午餐"], &[], None);
        r.min_confidence = 0.32;
        store.rules.push(r);

        store.decay("r1");
        let rule = &store.rules[0];
        assert!(rule.min_confidence < DEACTIVATION_THRESHOLD);
        assert!(!rule.is_active);
        // Deactivated rules never match again.
        assert!(store.matches("午餐", "", 0.0).is_empty());
    }

    #[test]
    fn test_decay_floors_at_minimum() {
        let mut store = RuleStore::default();
        let mut r = rule(&["午餐"], &[], None);
        r.min_confidence = 0.11;
        store.rules.push(r);

        store.decay("r1");
        store.decay("r1");
        assert_eq!(store.rules[0].min_confidence, CONFIDENCE_FLOOR);
    }

    #[test]
    fn test_mark_used_updates_counters() {
        let mut store = RuleStore::with_defaults(now());
        store.mark_used(&["seed-food-meals".to_string()], now());
        let rule = store.rules.iter().find(|r| r.id == "seed-food-meals").unwrap();
        assert_eq!(rule.usage_count, 1);
        assert_eq!(rule.last_used, Some(now()));
    }

    #[test]
    fn test_default_rules_match_typical_input() {
        let store = RuleStore::with_defaults(now());
        let matches = store.matches("公司 午餐 便當", "", 120.0);
        assert!(matches.iter().any(|m| m.category_id == "food"));
    }
}
