//! Frequency-based rule induction from the confirmed training corpus.
//!
//! Groups correct examples by category and distills each large-enough
//! group into a new rule: its most recurrent keywords, its repeated
//! merchants, and the interquartile window of its amounts (outlier-proof
//! bounds). Induced rules are appended, never replace existing ones.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use tally_core::text::normalize;
use tally_core::types::TrainingExample;

use crate::rules::{CategoryRule, RuleStore};

/// Induction only runs once this many correct examples exist overall
pub const MIN_CORRECT_CORPUS: usize = 10;
/// A category group needs at least this many examples to yield a rule
pub const MIN_GROUP_SIZE: usize = 3;
const MAX_KEYWORDS: usize = 10;
const MAX_MERCHANTS: usize = 5;

/// Derive new rules from the corpus. Returns only rules not already
/// covered by an existing active induced rule with the same keyword set.
pub fn induce_rules(
    store: &RuleStore,
    corpus: &[TrainingExample],
    now: DateTime<Utc>,
) -> Vec<CategoryRule> {
    let correct: Vec<&TrainingExample> = corpus.iter().filter(|e| e.is_correct).collect();
    if correct.len() < MIN_CORRECT_CORPUS {
        return Vec::new();
    }

    // BTreeMap keeps category order stable across runs.
    let mut groups: BTreeMap<&str, Vec<&TrainingExample>> = BTreeMap::new();
    for example in correct.iter().copied() {
        groups.entry(example.category_id.as_str()).or_default().push(example);
    }

    let mut induced = Vec::new();
    for (&category, group) in &groups {
        if group.len() < MIN_GROUP_SIZE {
            continue;
        }

        let keywords = frequent_keywords(group);
        let merchants = frequent_merchants(group);
        if keywords.is_empty() && merchants.is_empty() {
            continue;
        }
        if is_duplicate(store, category, &keywords) {
            continue;
        }

        let (min_amount, max_amount) = interquartile_bounds(group);
        let samples = group.len();

        let min_confidence = match samples {
            n if n >= 20 => 0.8,
            n if n >= 10 => 0.7,
            n if n >= 5 => 0.6,
            _ => 0.5,
        };
        let priority = match samples {
            n if n >= 50 => 3,
            n if n >= 20 => 2,
            n if n >= 10 => 1,
            _ => 0,
        };

        let serial = store
            .rules
            .iter()
            .filter(|r| r.category_id == *category && r.id.starts_with("auto-"))
            .count()
            + induced.len()
            + 1;

        induced.push(CategoryRule {
            id: format!("auto-{category}-{serial}"),
            name: format!("learned {category} pattern"),
            category_id: category.to_string(),
            keywords,
            merchant_patterns: merchants,
            min_amount,
            max_amount,
            min_confidence,
            priority,
            usage_count: 0,
            last_used: None,
            is_active: true,
            created_at: now,
        });
    }

    induced
}

/// Terms present in at least `max(2, group/3)` distinct examples,
/// ranked by document frequency, top 10.
fn frequent_keywords(group: &[&TrainingExample]) -> Vec<String> {
    let mut doc_freq: HashMap<String, usize> = HashMap::new();
    for example in group {
        let unique: HashSet<String> = normalize(&example.description).into_iter().collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let needed = (group.len() / 3).max(2);
    let mut ranked: Vec<(String, usize)> = doc_freq
        .into_iter()
        .filter(|(_, count)| *count >= needed)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(MAX_KEYWORDS);
    ranked.into_iter().map(|(term, _)| term).collect()
}

/// Merchants appearing at least twice, ranked by count, top 5.
fn frequent_merchants(group: &[&TrainingExample]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for example in group {
        if let Some(merchant) = &example.merchant {
            let trimmed = merchant.trim().to_lowercase();
            if !trimmed.is_empty() {
                *counts.entry(trimmed).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, usize)> =
        counts.into_iter().filter(|(_, count)| *count >= 2).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(MAX_MERCHANTS);
    ranked.into_iter().map(|(merchant, _)| merchant).collect()
}

/// 25th–75th percentile window of the group's amounts.
fn interquartile_bounds(group: &[&TrainingExample]) -> (Option<f64>, Option<f64>) {
    let mut amounts: Vec<f64> = group.iter().map(|e| e.amount).collect();
    amounts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (Some(percentile(&amounts, 25.0)), Some(percentile(&amounts, 75.0)))
}

/// Nearest-rank percentile over a sorted slice.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// An existing active induced rule for the category with the same keyword
/// set makes re-induction a no-op for that group.
fn is_duplicate(store: &RuleStore, category: &str, keywords: &[String]) -> bool {
    store.rules.iter().any(|r| {
        r.is_active
            && r.category_id == category
            && r.id.starts_with("auto-")
            && r.keywords == keywords
    })
}
