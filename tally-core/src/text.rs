//! Text normalization and tokenization for transaction descriptions.
//!
//! Descriptions arrive as free text in Chinese, English, or a mix of both
//! (voice transcriptions, bank statement lines, manual entry). Normalization
//! is deliberately cheap and deterministic: lowercase, alias substitution,
//! punctuation stripping, whitespace split, stop-word removal.

use std::collections::HashSet;
use std::sync::OnceLock;

/// Alias substitutions applied to the lowercased text before tokenizing.
/// Maps common abbreviations/spellings to their canonical form.
const ALIASES: &[(&str, &str)] = &[
    ("7-11", "seven"),
    ("7-eleven", "seven"),
    ("小七", "seven"),
    ("mcdonald's", "mcdonalds"),
    ("ubereats", "uber eats"),
    ("星巴客", "星巴克"), // common misspelling
    ("星爸爸", "星巴克"), // colloquial
];

/// Stop-words dropped after tokenization (Chinese function words plus
/// common English fillers).
const STOP_WORDS: &[&str] = &[
    // Chinese
    "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一個",
    "今天", "昨天", "明天", "這個", "那個", "一下", "然後", "還有",
    // English
    "the", "a", "an", "of", "to", "for", "at", "in", "on", "with", "and",
    "or", "my", "was", "is", "it", "this", "that", "from",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Normalize free text into an ordered token sequence.
///
/// Lowercases, substitutes known aliases, strips punctuation (word
/// characters of any script survive, CJK included), splits on whitespace,
/// and drops single-character tokens and stop-words.
pub fn normalize(text: &str) -> Vec<String> {
    let mut lowered = text.to_lowercase();
    for (from, to) in ALIASES {
        if lowered.contains(from) {
            lowered = lowered.replace(from, to);
        }
    }

    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    stripped
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !stop_words().contains(t))
        .map(|t| t.to_string())
        .collect()
}
