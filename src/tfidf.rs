//! TF-IDF term ranking over the tag text of the focus-tag corpus. Matches
//! the usual smooth-idf, l2-normalized formulation so the weights agree
//! with the familiar definition.

use crate::error::{Error, Result};
use crate::record::AnimeRecord;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct TermScore {
    pub term: String,
    /// Mean l2-normalized tf-idf weight across the corpus.
    pub weight: f64,
}

/// Lowercase the tag text, drop bracket, quote and space characters, then
/// turn the pipe separators into spaces. Spaces go first so a multi-word
/// tag collapses into one atomic token ("Male Protagonist" becomes
/// "maleprotagonist") rather than splitting into its words.
fn clean_tag_text(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '\'' | '"' | ' '))
        .map(|c| if c == '|' { ' ' } else { c })
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_string())
        .collect()
}

/// Rank tag-text terms by mean tf-idf over the records whose raw tag text
/// mentions `focus_tag` (case-insensitive). Errors with `EmptyCorpus` when
/// no record qualifies.
pub fn tfidf_ranking(
    records: &[AnimeRecord],
    focus_tag: &str,
    max_terms: usize,
) -> Result<Vec<TermScore>> {
    let needle = focus_tag.to_lowercase();
    let docs: Vec<Vec<String>> = records
        .iter()
        .filter_map(|r| r.tags_raw.as_deref())
        .filter(|raw| raw.to_lowercase().contains(&needle))
        .map(|raw| tokenize(&clean_tag_text(raw)))
        .collect();
    if docs.is_empty() {
        return Err(Error::EmptyCorpus(format!(
            "no records tagged with '{}'",
            focus_tag
        )));
    }

    // Document frequency per term.
    let mut df: HashMap<String, usize> = HashMap::new();
    for doc in &docs {
        let mut seen: Vec<&String> = Vec::new();
        for term in doc {
            if !seen.contains(&term) {
                seen.push(term);
                *df.entry(term.clone()).or_insert(0) += 1;
            }
        }
    }

    let terms: Vec<String> = {
        let mut t: Vec<String> = df.keys().cloned().collect();
        t.sort();
        t
    };
    let n = docs.len() as f64;
    let idf: Vec<f64> = terms
        .iter()
        .map(|t| ((1.0 + n) / (1.0 + df[t] as f64)).ln() + 1.0)
        .collect();

    // Accumulate l2-normalized tf-idf rows, then average over the corpus.
    let mut sums = vec![0.0f64; terms.len()];
    for doc in &docs {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for term in doc {
            *counts.entry(term.as_str()).or_insert(0) += 1;
        }
        let mut row: Vec<f64> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| counts.get(t.as_str()).copied().unwrap_or(0) as f64 * idf[i])
            .collect();
        let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut row {
                *v /= norm;
            }
        }
        for (sum, v) in sums.iter_mut().zip(&row) {
            *sum += v;
        }
    }

    let mut ranked: Vec<TermScore> = terms
        .into_iter()
        .zip(sums)
        .map(|(term, sum)| TermScore {
            term,
            weight: sum / n,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.term.cmp(&b.term))
    });
    ranked.truncate(max_terms);
    Ok(ranked)
}
