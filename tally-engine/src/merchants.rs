//! Merchant-name resolution: canonical names, aliases, learned categories.
//!
//! Mappings are keyed by merchant name. Agreement nudges confidence up;
//! disagreement replaces the stored category outright — the latest user
//! signal wins, there is no vote blending.

use serde::{Deserialize, Serialize};
use tally_core::lexicon::MERCHANT_SEEDS;

/// Confidence assigned to a mapping learned from its first feedback
pub const NEW_MAPPING_CONFIDENCE: f64 = 0.6;
/// Confidence bump on repeated agreement
pub const AGREEMENT_STEP: f64 = 0.1;

/// One merchant → category association
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerchantMapping {
    /// Raw merchant name as first seen
    pub merchant_name: String,
    /// Canonical display form, also used for matching
    pub standard_name: String,
    pub category_id: String,
    pub merchant_type: String,
    pub confidence: f64,
    /// Alternate spellings matched alongside the standard name
    pub aliases: Vec<String>,
    pub is_verified: bool,
}

/// The merchant association table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MerchantMap {
    pub mappings: Vec<MerchantMapping>,
}

impl MerchantMap {
    /// Seed mappings installed when no store exists on disk yet
    pub fn with_defaults() -> Self {
        MerchantMap {
            mappings: MERCHANT_SEEDS
                .iter()
                .map(|seed| MerchantMapping {
                    merchant_name: seed.standard_name.to_string(),
                    standard_name: seed.standard_name.to_string(),
                    category_id: seed.category.to_string(),
                    merchant_type: seed.merchant_type.to_string(),
                    confidence: seed.confidence,
                    aliases: seed.aliases.iter().map(|a| a.to_string()).collect(),
                    is_verified: true,
                })
                .collect(),
        }
    }

    /// Mappings whose standard name or any alias appears inside
    /// `merchant_text` (case-insensitive substring).
    pub fn lookup(&self, merchant_text: &str) -> Vec<&MerchantMapping> {
        let lowered = merchant_text.to_lowercase();
        if lowered.trim().is_empty() {
            return Vec::new();
        }
        self.mappings
            .iter()
            .filter(|m| {
                lowered.contains(&m.standard_name.to_lowercase())
                    || m.aliases.iter().any(|a| lowered.contains(&a.to_lowercase()))
            })
            .collect()
    }

    /// Record correct feedback for a merchant. Creates an unverified
    /// mapping on first sight; on agreement bumps confidence; on
    /// disagreement overwrites the category and restarts confidence.
    pub fn upsert(&mut self, merchant: &str, category_id: &str) {
        let trimmed = merchant.trim();
        if trimmed.is_empty() {
            return;
        }

        let key = trimmed.to_lowercase();
        match self
            .mappings
            .iter_mut()
            .find(|m| m.merchant_name.to_lowercase() == key)
        {
            Some(mapping) if mapping.category_id == category_id => {
                mapping.confidence = (mapping.confidence + AGREEMENT_STEP).min(1.0);
            }
            Some(mapping) => {
                mapping.category_id = category_id.to_string();
                mapping.confidence = NEW_MAPPING_CONFIDENCE;
                mapping.is_verified = false;
            }
            None => self.mappings.push(MerchantMapping {
                merchant_name: trimmed.to_string(),
                standard_name: trimmed.to_string(),
                category_id: category_id.to_string(),
                merchant_type: "general".to_string(),
                confidence: NEW_MAPPING_CONFIDENCE,
                aliases: Vec::new(),
                is_verified: false,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_standard_name_substring() {
        let map = MerchantMap::with_defaults();
        let hits = map.lookup("星巴克 信義門市");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].category_id, "food");
        assert!(hits[0].confidence >= 0.6);
    }

    #[test]
    fn test_lookup_matches_alias_case_insensitive() {
        let map = MerchantMap::with_defaults();
        let hits = map.lookup("STARBUCKS RESERVE");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].standard_name, "星巴克");
    }

    #[test]
    fn test_lookup_empty_merchant_yields_nothing() {
        let map = MerchantMap::with_defaults();
        assert!(map.lookup("").is_empty());
        assert!(map.lookup("   ").is_empty());
    }

    #[test]
    fn test_upsert_creates_unverified_mapping() {
        let mut map = MerchantMap::default();
        map.upsert("巷口豆漿店", "food");

        assert_eq!(map.mappings.len(), 1);
        let m = &map.mappings[0];
        assert_eq!(m.confidence, NEW_MAPPING_CONFIDENCE);
        assert!(!m.is_verified);
    }

    #[test]
    fn test_upsert_agreement_bumps_confidence_capped() {
        let mut map = MerchantMap::default();
        for _ in 0..6 {
            map.upsert("巷口豆漿店", "food");
        }
        // 0.6 + 5 * 0.1, capped at 1.0
        assert_eq!(map.mappings[0].confidence, 1.0);
    }

    #[test]
    fn test_upsert_disagreement_overwrites_not_blends() {
        let mut map = MerchantMap::default();
        map.upsert("全聯", "shopping");
        map.upsert("全聯", "food");

        assert_eq!(map.mappings.len(), 1);
        let m = &map.mappings[0];
        assert_eq!(m.category_id, "food", "later feedback wins outright");
        assert_eq!(m.confidence, NEW_MAPPING_CONFIDENCE);
        assert!(!m.is_verified);
    }
}
