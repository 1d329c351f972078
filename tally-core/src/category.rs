//! Canonical spending categories and their display metadata.
//!
//! Category ids are opaque strings owned by the caller; this table only
//! supplies display names and icon hints. Unknown ids resolve to "other".

/// Display metadata for a category id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMeta {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

/// Fallback entry for category ids the table does not know about
pub const OTHER: CategoryMeta = CategoryMeta {
    id: "other",
    name: "其他",
    icon: "📝",
};

/// All known categories, in display order
pub const CATEGORIES: &[CategoryMeta] = &[
    CategoryMeta { id: "food", name: "餐飲美食", icon: "🍜" },
    CategoryMeta { id: "transport", name: "交通出行", icon: "🚌" },
    CategoryMeta { id: "shopping", name: "購物消費", icon: "🛍️" },
    CategoryMeta { id: "entertainment", name: "休閒娛樂", icon: "🎮" },
    CategoryMeta { id: "utilities", name: "水電帳單", icon: "💡" },
    CategoryMeta { id: "housing", name: "居住房租", icon: "🏠" },
    CategoryMeta { id: "medical", name: "醫療保健", icon: "🏥" },
    CategoryMeta { id: "education", name: "教育學習", icon: "📚" },
    CategoryMeta { id: "travel", name: "旅遊度假", icon: "✈️" },
    CategoryMeta { id: "subscription", name: "訂閱服務", icon: "📱" },
    CategoryMeta { id: "income", name: "收入", icon: "💰" },
    OTHER,
];

/// Look up display metadata for a category id, falling back to [`OTHER`].
pub fn category_meta(id: &str) -> &'static CategoryMeta {
    CATEGORIES
        .iter()
        .find(|c| c.id == id)
        .unwrap_or(&OTHER)
}
