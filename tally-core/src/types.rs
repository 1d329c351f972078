//! Record types shared between the engine and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::features::FeatureRecord;

/// Which signal source produced a suggestion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SuggestionSource {
    #[serde(rename = "rule_based")]
    RuleBased,
    #[serde(rename = "keyword_based")]
    KeywordBased,
    #[serde(rename = "history_based")]
    HistoryBased,
    #[serde(rename = "merchant_based")]
    MerchantBased,
    #[serde(rename = "amount_based")]
    AmountBased,
}

/// A ranked category proposal, built fresh per request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorySuggestion {
    pub category_id: String,
    /// Display name, attached after consolidation
    pub category_name: String,
    /// Icon hint for the display layer
    pub icon: String,
    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
    /// Human-readable justification, suitable for direct display
    pub reason: String,
    pub source: SuggestionSource,
}

impl CategorySuggestion {
    /// A suggestion carrying only id/confidence/reason; display metadata
    /// is filled in by the aggregator's final pass.
    pub fn bare(
        category_id: impl Into<String>,
        confidence: f64,
        reason: impl Into<String>,
        source: SuggestionSource,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            category_name: String::new(),
            icon: String::new(),
            confidence,
            reason: reason.into(),
            source,
        }
    }
}

/// One user feedback event, as submitted by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub description: String,
    pub amount: f64,
    pub merchant: Option<String>,
    pub category_id: String,
    /// Whether the user confirmed (true) or rejected (false) this category
    /// for the transaction
    pub is_correct: bool,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A labeled example in the training corpus. Append-only, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrainingExample {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub merchant: Option<String>,
    pub category_id: String,
    pub is_correct: bool,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub features: FeatureRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extract_features;
    use chrono::TimeZone;

    #[test]
    fn test_training_example_round_trips_as_json() {
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 4, 30, 0).unwrap();
        let tz = "Asia/Taipei".parse().unwrap();
        let example = TrainingExample {
            id: "ex-1".to_string(),
            description: "星巴克 咖啡".to_string(),
            amount: 150.0,
            merchant: Some("星巴克".to_string()),
            category_id: "food".to_string(),
            is_correct: true,
            user_id: "u1".to_string(),
            timestamp: at,
            features: extract_features("星巴克 咖啡", 150.0, "星巴克", at, tz),
        };

        let json = serde_json::to_string(&example).unwrap();
        let back: TrainingExample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, example);
    }

    #[test]
    fn test_suggestion_source_wire_names() {
        let json = serde_json::to_string(&SuggestionSource::MerchantBased).unwrap();
        assert_eq!(json, "\"merchant_based\"");
    }
}
