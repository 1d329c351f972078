//! Process-wide fixed lexicons: the keyword→category dictionary, the
//! amount-range heuristic table, and the seed merchant list.
//!
//! These are compiled in and read-only. Learned state (rules, merchant
//! mappings, corpus) lives in the engine stores, never here.

/// Static keyword → category id associations. Keywords are lowercase;
/// Chinese entries match by containment inside unspaced descriptions.
pub const KEYWORD_CATEGORIES: &[(&str, &str)] = &[
    // food
    ("早餐", "food"),
    ("午餐", "food"),
    ("晚餐", "food"),
    ("宵夜", "food"),
    ("咖啡", "food"),
    ("便當", "food"),
    ("餐廳", "food"),
    ("飲料", "food"),
    ("火鍋", "food"),
    ("breakfast", "food"),
    ("lunch", "food"),
    ("dinner", "food"),
    ("coffee", "food"),
    ("restaurant", "food"),
    // transport
    ("捷運", "transport"),
    ("公車", "transport"),
    ("計程車", "transport"),
    ("加油", "transport"),
    ("高鐵", "transport"),
    ("火車", "transport"),
    ("停車", "transport"),
    ("taxi", "transport"),
    ("uber", "transport"),
    ("mrt", "transport"),
    ("parking", "transport"),
    // shopping
    ("衣服", "shopping"),
    ("鞋子", "shopping"),
    ("網購", "shopping"),
    ("蝦皮", "shopping"),
    ("momo", "shopping"),
    ("clothes", "shopping"),
    ("amazon", "shopping"),
    // entertainment
    ("電影", "entertainment"),
    ("遊戲", "entertainment"),
    ("唱歌", "entertainment"),
    ("ktv", "entertainment"),
    ("movie", "entertainment"),
    ("game", "entertainment"),
    ("concert", "entertainment"),
    // utilities
    ("電費", "utilities"),
    ("水費", "utilities"),
    ("瓦斯費", "utilities"),
    ("網路費", "utilities"),
    ("電話費", "utilities"),
    ("electricity", "utilities"),
    ("internet bill", "utilities"),
    // housing
    ("房租", "housing"),
    ("租金", "housing"),
    ("管理費", "housing"),
    ("rent", "housing"),
    // medical
    ("掛號", "medical"),
    ("診所", "medical"),
    ("醫院", "medical"),
    ("藥局", "medical"),
    ("pharmacy", "medical"),
    ("doctor", "medical"),
    // education
    ("學費", "education"),
    ("補習", "education"),
    ("課程", "education"),
    ("tuition", "education"),
    ("course", "education"),
    // travel
    ("機票", "travel"),
    ("飯店", "travel"),
    ("住宿", "travel"),
    ("hotel", "travel"),
    ("flight", "travel"),
    // subscription
    ("訂閱", "subscription"),
    ("netflix", "subscription"),
    ("spotify", "subscription"),
    ("icloud", "subscription"),
    ("youtube premium", "subscription"),
    // income
    ("薪水", "income"),
    ("薪資", "income"),
    ("獎金", "income"),
    ("salary", "income"),
    ("bonus", "income"),
];

/// One row of the fixed amount-range heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
    pub category: &'static str,
}

/// Typical NT$ spending ranges. Weak evidence by design — the aggregator
/// assigns these a flat low confidence.
pub const AMOUNT_RANGES: &[AmountRange] = &[
    AmountRange { min: 1.0, max: 200.0, category: "food" },
    AmountRange { min: 200.0, max: 1500.0, category: "shopping" },
    AmountRange { min: 1500.0, max: 8000.0, category: "entertainment" },
    AmountRange { min: 8000.0, max: 50000.0, category: "housing" },
];

/// A seed merchant entry installed into a fresh merchant store
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MerchantSeed {
    pub standard_name: &'static str,
    pub category: &'static str,
    pub merchant_type: &'static str,
    pub aliases: &'static [&'static str],
    pub confidence: f64,
}

/// Well-known chains. Confidence reflects how unambiguous the mapping is.
pub const MERCHANT_SEEDS: &[MerchantSeed] = &[
    MerchantSeed {
        standard_name: "星巴克",
        category: "food",
        merchant_type: "cafe",
        aliases: &["starbucks"],
        confidence: 0.85,
    },
    MerchantSeed {
        standard_name: "全聯",
        category: "food",
        merchant_type: "supermarket",
        aliases: &["pxmart", "全聯福利中心"],
        confidence: 0.8,
    },
    MerchantSeed {
        standard_name: "seven",
        category: "food",
        merchant_type: "convenience",
        aliases: &["統一超商", "7-11", "7-eleven", "7 eleven"],
        confidence: 0.65,
    },
    MerchantSeed {
        standard_name: "麥當勞",
        category: "food",
        merchant_type: "fast_food",
        aliases: &["mcdonalds"],
        confidence: 0.85,
    },
    MerchantSeed {
        standard_name: "家樂福",
        category: "food",
        merchant_type: "supermarket",
        aliases: &["carrefour"],
        confidence: 0.8,
    },
    MerchantSeed {
        standard_name: "台灣大車隊",
        category: "transport",
        merchant_type: "taxi",
        aliases: &["55688"],
        confidence: 0.9,
    },
    MerchantSeed {
        standard_name: "中油",
        category: "transport",
        merchant_type: "gas_station",
        aliases: &["台灣中油", "cpc"],
        confidence: 0.9,
    },
    MerchantSeed {
        standard_name: "屈臣氏",
        category: "shopping",
        merchant_type: "drugstore",
        aliases: &["watsons"],
        confidence: 0.75,
    },
    MerchantSeed {
        standard_name: "蝦皮",
        category: "shopping",
        merchant_type: "online",
        aliases: &["shopee"],
        confidence: 0.75,
    },
    MerchantSeed {
        standard_name: "netflix",
        category: "subscription",
        merchant_type: "online",
        aliases: &[],
        confidence: 0.95,
    },
    MerchantSeed {
        standard_name: "台電",
        category: "utilities",
        merchant_type: "utility",
        aliases: &["台灣電力"],
        confidence: 0.95,
    },
    MerchantSeed {
        standard_name: "中華電信",
        category: "utilities",
        merchant_type: "utility",
        aliases: &["cht"],
        confidence: 0.9,
    },
];

/// Find the seed entry whose standard name or alias appears inside
/// `merchant_text` (case-insensitive).
pub fn merchant_seed_for(merchant_text: &str) -> Option<&'static MerchantSeed> {
    let lowered = merchant_text.to_lowercase();
    if lowered.trim().is_empty() {
        return None;
    }
    MERCHANT_SEEDS.iter().find(|seed| {
        lowered.contains(seed.standard_name)
            || seed.aliases.iter().any(|a| lowered.contains(a))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_categories_are_known() {
        use crate::category::category_meta;
        for (kw, cat) in KEYWORD_CATEGORIES {
            assert_eq!(category_meta(cat).id, *cat, "unknown category for keyword {kw}");
        }
    }

    #[test]
    fn test_amount_ranges_are_ordered() {
        for range in AMOUNT_RANGES {
            assert!(range.min < range.max);
        }
    }

    #[test]
    fn test_merchant_seed_lookup_by_name_and_alias() {
        assert_eq!(merchant_seed_for("星巴克信義店").unwrap().category, "food");
        assert_eq!(merchant_seed_for("STARBUCKS #123").unwrap().standard_name, "星巴克");
        assert_eq!(merchant_seed_for("7-ELEVEN 市府店").unwrap().standard_name, "seven");
        assert_eq!(merchant_seed_for("55688 隊編 123").unwrap().category, "transport");
        assert!(merchant_seed_for("隔壁小吃攤").is_none());
        assert!(merchant_seed_for("").is_none());
    }

    #[test]
    fn test_seed_confidence_in_range() {
        for seed in MERCHANT_SEEDS {
            assert!(seed.confidence > 0.0 && seed.confidence <= 1.0);
        }
    }
}
