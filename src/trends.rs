//! Trend-over-time and composition analyses: studio capacity, yearly
//! industry output, source composition, overview aggregates and the tag
//! trend that tracks the focus tag.

use crate::parse::normalize_studio_name;
use crate::record::AnimeRecord;
use std::collections::{BTreeSet, HashMap, HashSet};

fn in_range(year: i32, start: i32, end: i32) -> bool {
    year >= start && year <= end
}

/// Studios are exploded and rows whose studio normalizes to `unknown` are
/// dropped before any studio-level counting.
fn known_studios(record: &AnimeRecord) -> impl Iterator<Item = &String> {
    record
        .studios
        .iter()
        .filter(|s| normalize_studio_name(s) != "unknown")
}

/// Dense year x category count matrix; every year in the range appears even
/// when empty, and every category covers every year (missing cells 0).
#[derive(Debug, Clone)]
pub struct YearCategoryMatrix {
    pub years: Vec<i32>,
    pub categories: Vec<String>,
    /// One count series per category, index-aligned with `years`.
    pub counts: Vec<Vec<usize>>,
}

pub fn category_year_counts<F>(
    records: &[AnimeRecord],
    category: F,
    year_start: i32,
    year_end: i32,
) -> YearCategoryMatrix
where
    F: Fn(&AnimeRecord) -> Option<&str>,
{
    let years: Vec<i32> = (year_start..=year_end).collect();
    let mut cells: HashMap<(String, i32), usize> = HashMap::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();
    for record in records {
        let Some(year) = record.start_year() else { continue };
        if !in_range(year, year_start, year_end) {
            continue;
        }
        let Some(cat) = category(record) else { continue };
        categories.insert(cat.to_string());
        *cells.entry((cat.to_string(), year)).or_insert(0) += 1;
    }

    let categories: Vec<String> = categories.into_iter().collect();
    let counts = categories
        .iter()
        .map(|cat| {
            years
                .iter()
                .map(|&y| cells.get(&(cat.clone(), y)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    YearCategoryMatrix {
        years,
        categories,
        counts,
    }
}

/// Output counts for the fixed canonical studios plus the rest of the
/// industry, for the capacity page.
#[derive(Debug, Clone)]
pub struct StudioCapacity {
    /// Canonical display names in their configured order.
    pub studios: Vec<String>,
    /// Works per canonical studio, index-aligned with `studios`.
    pub counts: Vec<usize>,
    /// Exploded rows matching any canonical studio.
    pub top_total: usize,
    /// Exploded rows matching none of them.
    pub other_total: usize,
}

/// Count works per canonical studio. Matching is punctuation- and
/// case-insensitive via `normalize_studio_name`, so "J.C.STAFF" and
/// "JC Staff" land on the same row.
pub fn studio_capacity(records: &[AnimeRecord], canonical: &[String]) -> StudioCapacity {
    let norms: Vec<String> = canonical.iter().map(|s| normalize_studio_name(s)).collect();
    let mut counts = vec![0usize; canonical.len()];
    let mut other_total = 0usize;
    for record in records {
        for studio in known_studios(record) {
            let norm = normalize_studio_name(studio);
            match norms.iter().position(|n| *n == norm) {
                Some(i) => counts[i] += 1,
                None => other_total += 1,
            }
        }
    }
    let top_total = counts.iter().sum();
    StudioCapacity {
        studios: canonical.to_vec(),
        counts,
        top_total,
        other_total,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioSourceCount {
    pub studio: String,
    pub source: String,
    pub count: usize,
}

/// Source composition per canonical studio, in canonical order. Sources are
/// lowercased; missing and literal "other"/"unknown" collapse into `Other`.
pub fn studio_source_composition(
    records: &[AnimeRecord],
    canonical: &[String],
) -> Vec<StudioSourceCount> {
    let norms: Vec<String> = canonical.iter().map(|s| normalize_studio_name(s)).collect();
    let mut counts: HashMap<(usize, String), usize> = HashMap::new();
    for record in records {
        let source = match record.source.as_deref() {
            Some(s) => {
                let s = s.trim().to_lowercase();
                if s == "unknown" || s == "other" {
                    "Other".to_string()
                } else {
                    s
                }
            }
            None => "Other".to_string(),
        };
        for studio in known_studios(record) {
            let norm = normalize_studio_name(studio);
            if let Some(i) = norms.iter().position(|n| *n == norm) {
                *counts.entry((i, source.clone())).or_insert(0) += 1;
            }
        }
    }

    let mut rows: Vec<StudioSourceCount> = counts
        .into_iter()
        .map(|((i, source), count)| StudioSourceCount {
            studio: canonical[i].clone(),
            source,
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        let ai = canonical.iter().position(|s| *s == a.studio);
        let bi = canonical.iter().position(|s| *s == b.studio);
        ai.cmp(&bi).then_with(|| a.source.cmp(&b.source))
    });
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearOutput {
    pub year: i32,
    /// Distinct titles released that year.
    pub titles: usize,
    /// Distinct studios active that year.
    pub studios: usize,
}

/// Yearly industry scale: distinct titles vs distinct active studios, for
/// the dual-axis trend line.
pub fn yearly_output_trend(
    records: &[AnimeRecord],
    year_start: i32,
    year_end: i32,
) -> Vec<YearOutput> {
    let mut titles: HashMap<i32, HashSet<i64>> = HashMap::new();
    let mut studios: HashMap<i32, HashSet<String>> = HashMap::new();
    for record in records {
        let Some(year) = record.start_year() else { continue };
        if !in_range(year, year_start, year_end) {
            continue;
        }
        let active: Vec<&String> = known_studios(record).collect();
        if active.is_empty() {
            continue;
        }
        titles.entry(year).or_default().insert(record.id);
        for studio in active {
            studios.entry(year).or_default().insert(studio.clone());
        }
    }

    let mut years: Vec<i32> = titles.keys().copied().collect();
    years.sort_unstable();
    years
        .into_iter()
        .map(|year| YearOutput {
            year,
            titles: titles.get(&year).map(|s| s.len()).unwrap_or(0),
            studios: studios.get(&year).map(|s| s.len()).unwrap_or(0),
        })
        .collect()
}

/// Count of titles per format, descending.
pub fn format_distribution(records: &[AnimeRecord]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        if let Some(format) = record.format.as_deref() {
            *counts.entry(format.to_string()).or_insert(0) += 1;
        }
    }
    let mut rows: Vec<(String, usize)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenrePopularity {
    pub genre: String,
    pub count: usize,
    pub mean_popularity: f64,
    pub mean_score: f64,
}

/// Top genres by mean popularity over exploded genre rows, with mean score
/// alongside. Rows missing a metric are skipped for that metric only.
pub fn genre_popularity_top(records: &[AnimeRecord], top: usize) -> Vec<GenrePopularity> {
    struct Acc {
        count: usize,
        pop_sum: f64,
        pop_n: usize,
        score_sum: f64,
        score_n: usize,
    }
    let mut genres: HashMap<String, Acc> = HashMap::new();
    for record in records {
        for genre in &record.genres {
            let acc = genres.entry(genre.clone()).or_insert(Acc {
                count: 0,
                pop_sum: 0.0,
                pop_n: 0,
                score_sum: 0.0,
                score_n: 0,
            });
            acc.count += 1;
            if let Some(p) = record.popularity {
                acc.pop_sum += p as f64;
                acc.pop_n += 1;
            }
            if let Some(s) = record.score_with_fallback() {
                acc.score_sum += s;
                acc.score_n += 1;
            }
        }
    }

    let mut rows: Vec<GenrePopularity> = genres
        .into_iter()
        .map(|(genre, acc)| GenrePopularity {
            genre,
            count: acc.count,
            mean_popularity: if acc.pop_n > 0 {
                acc.pop_sum / acc.pop_n as f64
            } else {
                0.0
            },
            mean_score: if acc.score_n > 0 {
                acc.score_sum / acc.score_n as f64
            } else {
                0.0
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.mean_popularity
            .partial_cmp(&a.mean_popularity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.genre.cmp(&b.genre))
    });
    rows.truncate(top);
    rows
}

/// Studio x streaming-platform collaboration counts for the overview
/// heatmap.
#[derive(Debug, Clone)]
pub struct PlatformMatrix {
    pub studios: Vec<String>,
    pub platforms: Vec<String>,
    /// `counts[i][j]` is studio `i` on platform `j`.
    pub counts: Vec<Vec<usize>>,
}

/// Cross the `top` studios by output with the platforms from their works'
/// external links. Rows with corrupt link JSON contribute nothing.
pub fn studio_platform_matrix(records: &[AnimeRecord], top: usize) -> PlatformMatrix {
    let mut output: HashMap<String, usize> = HashMap::new();
    for record in records {
        for studio in known_studios(record) {
            *output.entry(studio.clone()).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = output.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top);
    let studios: Vec<String> = ranked.into_iter().map(|(s, _)| s).collect();

    let mut cells: HashMap<(usize, String), usize> = HashMap::new();
    let mut platforms: BTreeSet<String> = BTreeSet::new();
    for record in records {
        if record.external_sites.is_empty() {
            continue;
        }
        for studio in known_studios(record) {
            let Some(i) = studios.iter().position(|s| s == studio) else {
                continue;
            };
            for site in &record.external_sites {
                platforms.insert(site.clone());
                *cells.entry((i, site.clone())).or_insert(0) += 1;
            }
        }
    }

    let platforms: Vec<String> = platforms.into_iter().collect();
    let counts = (0..studios.len())
        .map(|i| {
            platforms
                .iter()
                .map(|p| cells.get(&(i, p.clone())).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    PlatformMatrix {
        studios,
        platforms,
        counts,
    }
}

/// Yearly frequency series for the most common tags, with the focus tag
/// always present.
#[derive(Debug, Clone)]
pub struct TagTrend {
    pub years: Vec<i32>,
    /// Ranked tags, focus tag appended if it did not rank.
    pub tags: Vec<String>,
    /// One series per tag, index-aligned with `years`.
    pub series: Vec<Vec<usize>>,
    /// The focus tag's own yearly totals.
    pub focus_yearly: Vec<usize>,
}

fn is_stoplisted(tag: &str, stoplist: &[String]) -> bool {
    stoplist.iter().any(|stop| tag.contains(stop.as_str()))
}

/// Top `top_k` tags by global frequency, stoplist tokens excluded as
/// substrings, the focus tag force-included. Per-tag counts are exact tag
/// matches within the year range.
pub fn tag_trend(
    records: &[AnimeRecord],
    top_k: usize,
    stoplist: &[String],
    focus_tag: &str,
    year_start: i32,
    year_end: i32,
) -> TagTrend {
    let mut global: HashMap<String, usize> = HashMap::new();
    for record in records {
        for tag in &record.tags {
            if !is_stoplisted(tag, stoplist) {
                *global.entry(tag.clone()).or_insert(0) += 1;
            }
        }
    }
    let mut ranked: Vec<(String, usize)> = global.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_k);
    let mut tags: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
    if !tags.iter().any(|t| t == focus_tag) {
        tags.push(focus_tag.to_string());
    }

    let years: Vec<i32> = (year_start..=year_end).collect();
    let mut cells: HashMap<(usize, i32), usize> = HashMap::new();
    for record in records {
        let Some(year) = record.start_year() else { continue };
        if !in_range(year, year_start, year_end) {
            continue;
        }
        for tag in &record.tags {
            if let Some(i) = tags.iter().position(|t| t == tag) {
                *cells.entry((i, year)).or_insert(0) += 1;
            }
        }
    }

    let series: Vec<Vec<usize>> = (0..tags.len())
        .map(|i| {
            years
                .iter()
                .map(|&y| cells.get(&(i, y)).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    let focus_idx = tags.iter().position(|t| t == focus_tag);
    let focus_yearly = focus_idx
        .map(|i| series[i].clone())
        .unwrap_or_else(|| vec![0; years.len()]);

    TagTrend {
        years,
        tags,
        series,
        focus_yearly,
    }
}
