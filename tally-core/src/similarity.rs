//! Pairwise TF-IDF cosine similarity between two short texts.
//!
//! The two texts form their own two-document corpus: term frequency is
//! count / document length, inverse document frequency is
//! `ln(2 / docs_containing) + 1` (the +1 keeps terms shared by both
//! documents from vanishing, so identical texts score exactly 1.0).
//! This is a deliberately local statistic — no global corpus state.

use std::collections::{HashMap, HashSet};

use crate::text::normalize;

/// Cosine similarity between two texts, in [0, 1].
///
/// Returns 0.0 when either text has no usable tokens. Symmetric, and 1.0
/// for identical non-empty texts.
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a = normalize(a);
    let tokens_b = normalize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let unique_a: HashSet<&str> = tokens_a.iter().map(String::as_str).collect();
    let unique_b: HashSet<&str> = tokens_b.iter().map(String::as_str).collect();

    // Document frequency over the two-document corpus.
    let mut idf: HashMap<&str, f64> = HashMap::new();
    for &term in unique_a.union(&unique_b) {
        let df = unique_a.contains(term) as u32 + unique_b.contains(term) as u32;
        idf.insert(term, (2.0 / df as f64).ln() + 1.0);
    }

    let vec_a = weigh(&tokens_a, &idf);
    let vec_b = weigh(&tokens_b, &idf);

    // Sum in sorted-term order: f64 addition is order-sensitive, and hash
    // iteration order would break exact symmetry in the last ULP.
    let mut shared: Vec<&str> = vec_a
        .keys()
        .copied()
        .filter(|term| vec_b.contains_key(term))
        .collect();
    shared.sort_unstable();
    let dot: f64 = shared.iter().map(|term| vec_a[term] * vec_b[term]).sum();

    let mag_a = magnitude(&vec_a);
    let mag_b = magnitude(&vec_b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    // Clamp: floating point can nudge identical vectors past 1.0.
    (dot / (mag_a * mag_b)).clamp(0.0, 1.0)
}

/// TF-IDF weight per term for one document.
fn weigh<'a>(tokens: &'a [String], idf: &HashMap<&str, f64>) -> HashMap<&'a str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0.0) += 1.0;
    }
    let len = tokens.len() as f64;
    counts
        .into_iter()
        .map(|(term, count)| {
            let tf = count / len;
            (term, tf * idf.get(term).copied().unwrap_or(1.0))
        })
        .collect()
}

fn magnitude(vec: &HashMap<&str, f64>) -> f64 {
    let mut terms: Vec<&str> = vec.keys().copied().collect();
    terms.sort_unstable();
    terms.iter().map(|term| vec[term] * vec[term]).sum::<f64>().sqrt()
}
