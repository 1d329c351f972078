//! Feature extraction from (description, amount, merchant) triples.
//!
//! Produces an immutable [`FeatureRecord`] attached to each training
//! example. Extraction is a pure function of its inputs plus the fixed
//! lexicons; the entity pass never fails (a bad regex just yields no
//! entities).

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::lexicon::merchant_seed_for;
use crate::text::normalize;
use crate::time::local_hour;

/// Ordinal amount bucket over fixed thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AmountBucket {
    #[serde(rename = "micro")]
    Micro,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large")]
    Large,
    #[serde(rename = "huge")]
    Huge,
}

impl AmountBucket {
    /// Bucket thresholds: ≤100, ≤500, ≤1000, ≤3000, above
    pub fn from_amount(amount: f64) -> Self {
        if amount <= 100.0 {
            AmountBucket::Micro
        } else if amount <= 500.0 {
            AmountBucket::Small
        } else if amount <= 1000.0 {
            AmountBucket::Medium
        } else if amount <= 3000.0 {
            AmountBucket::Large
        } else {
            AmountBucket::Huge
        }
    }
}

/// Time-of-day bucket over the local hour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    #[serde(rename = "morning")]
    Morning,
    #[serde(rename = "midday")]
    Midday,
    #[serde(rename = "afternoon")]
    Afternoon,
    #[serde(rename = "evening")]
    Evening,
    #[serde(rename = "late_night")]
    LateNight,
}

impl TimeBucket {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=10 => TimeBucket::Morning,
            11..=13 => TimeBucket::Midday,
            14..=16 => TimeBucket::Afternoon,
            17..=21 => TimeBucket::Evening,
            _ => TimeBucket::LateNight,
        }
    }
}

/// Coarse script-based language guess
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Language {
    #[serde(rename = "chinese")]
    Chinese,
    #[serde(rename = "english")]
    English,
    #[serde(rename = "mixed")]
    Mixed,
    #[serde(rename = "unknown")]
    Unknown,
}

/// A tagged span found by the entity pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub kind: EntityKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityKind {
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "time")]
    Time,
}

/// Derived features for one transaction input
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureRecord {
    /// Normalized tokens, deduplicated, original order
    pub keywords: Vec<String>,
    /// Merchant class from the seed table ("cafe", "supermarket", ...);
    /// "none" when no merchant was given, "general" when unrecognized
    pub merchant_type: String,
    pub amount_bucket: AmountBucket,
    pub time_bucket: TimeBucket,
    pub text_length: usize,
    pub has_digits: bool,
    pub language: Language,
    /// Tagged spans in order of appearance
    pub entities: Vec<Entity>,
}

/// Extract a [`FeatureRecord`] for one transaction.
///
/// `at` is the event timestamp; the time bucket uses its hour in `tz`.
pub fn extract_features(
    description: &str,
    amount: f64,
    merchant: &str,
    at: DateTime<Utc>,
    tz: Tz,
) -> FeatureRecord {
    let mut keywords = normalize(description);
    keywords.dedup();

    let merchant_type = if merchant.trim().is_empty() {
        "none".to_string()
    } else {
        merchant_seed_for(merchant)
            .map(|seed| seed.merchant_type.to_string())
            .unwrap_or_else(|| "general".to_string())
    };

    FeatureRecord {
        keywords,
        merchant_type,
        amount_bucket: AmountBucket::from_amount(amount),
        time_bucket: TimeBucket::from_hour(local_hour(at, tz)),
        text_length: description.chars().count(),
        has_digits: description.chars().any(|c| c.is_ascii_digit()),
        language: guess_language(description),
        entities: extract_entities(description),
    }
}

fn guess_language(text: &str) -> Language {
    let has_cjk = text.chars().any(is_cjk);
    let has_letter = text.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = text.chars().any(|c| c.is_ascii_digit());
    match (has_cjk, has_letter || has_digit) {
        (true, true) => Language::Mixed,
        (true, false) => Language::Chinese,
        (false, _) if has_letter => Language::English,
        _ => Language::Unknown,
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn currency_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:nt\$|NT\$|\$)\s*\d+(?:\.\d+)?|\d+(?:\.\d+)?\s*(?:元|塊|dollars?)").ok()
    })
    .as_ref()
}

fn time_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{1,2}:\d{2}|[上下]午\s*\d{1,2}\s*[點时時]?").ok())
        .as_ref()
}

/// Light regex pass for currency-like and time-like spans, ordered by
/// position. Yields nothing (rather than an error) when a pattern fails
/// to compile or match.
fn extract_entities(text: &str) -> Vec<Entity> {
    let mut spans: Vec<(usize, Entity)> = Vec::new();

    if let Some(re) = currency_re() {
        for m in re.find_iter(text) {
            spans.push((
                m.start(),
                Entity { kind: EntityKind::Currency, text: m.as_str().to_string() },
            ));
        }
    }
    if let Some(re) = time_re() {
        for m in re.find_iter(text) {
            spans.push((
                m.start(),
                Entity { kind: EntityKind::Time, text: m.as_str().to_string() },
            ));
        }
    }

    spans.sort_by_key(|(start, _)| *start);
    spans.into_iter().map(|(_, e)| e).collect()
}
