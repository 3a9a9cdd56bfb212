//! Popularity-driver analyses: the percentile threshold, the high/normal
//! partition, and the grouped, exploded, ranked and binned comparisons
//! built on top of it. All functions are pure over a record snapshot.

use crate::error::{Error, Result};
use crate::record::AnimeRecord;
use std::collections::HashMap;

/// Percentile with linear interpolation between order statistics, the same
/// definition numpy and pandas use. `p` is in `[0, 1]`.
pub(crate) fn percentile_linear(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        Some(sorted[lo])
    } else {
        let frac = idx - lo as f64;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
    }
}

/// High-popularity cutoff: the floor of the `quantile` percentile of
/// non-null popularity. Computed once per analysis run and shared by every
/// sub-analysis so the partitions agree.
pub fn high_popularity_threshold(records: &[AnimeRecord], quantile: f64) -> Result<f64> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.popularity.map(|p| p as f64))
        .collect();
    percentile_linear(&values, quantile)
        .map(f64::floor)
        .ok_or_else(|| {
            Error::InsufficientData("no popularity values to derive a threshold".to_string())
        })
}

fn is_high(record: &AnimeRecord, threshold: f64) -> bool {
    // Missing popularity compares false, landing the row in `normal`.
    record
        .popularity
        .map(|p| p as f64 >= threshold)
        .unwrap_or(false)
}

/// The two sides of the popularity split. Every record lands in exactly one.
#[derive(Debug)]
pub struct PopularityPartition<'a> {
    pub high: Vec<&'a AnimeRecord>,
    pub normal: Vec<&'a AnimeRecord>,
}

pub fn partition(records: &[AnimeRecord], threshold: f64) -> PopularityPartition<'_> {
    let (high, normal) = records.iter().partition(|r| is_high(r, threshold));
    PopularityPartition { high, normal }
}

/// Per-category aggregate for a single-valued categorical field.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRatio {
    pub key: String,
    pub count: usize,
    pub high_ratio: f64,
    pub mean_popularity: f64,
}

/// Group by a single-valued category and report count, high-popularity ratio
/// and mean popularity per group. Rows with a missing category are dropped;
/// categories absent from the data are omitted rather than zero-filled.
/// Sorted by high-ratio descending.
pub fn grouped_ratio_by<F>(records: &[AnimeRecord], category: F, threshold: f64) -> Vec<GroupRatio>
where
    F: Fn(&AnimeRecord) -> Option<&str>,
{
    struct Acc {
        count: usize,
        high: usize,
        pop_sum: f64,
        pop_count: usize,
    }
    let mut groups: HashMap<String, Acc> = HashMap::new();
    for record in records {
        let Some(key) = category(record) else { continue };
        let acc = groups.entry(key.to_string()).or_insert(Acc {
            count: 0,
            high: 0,
            pop_sum: 0.0,
            pop_count: 0,
        });
        acc.count += 1;
        if is_high(record, threshold) {
            acc.high += 1;
        }
        if let Some(p) = record.popularity {
            acc.pop_sum += p as f64;
            acc.pop_count += 1;
        }
    }

    let mut rows: Vec<GroupRatio> = groups
        .into_iter()
        .map(|(key, acc)| GroupRatio {
            key,
            count: acc.count,
            high_ratio: acc.high as f64 / acc.count as f64,
            mean_popularity: if acc.pop_count > 0 {
                acc.pop_sum / acc.pop_count as f64
            } else {
                0.0
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.high_ratio
            .partial_cmp(&a.high_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    rows
}

/// Relative-frequency comparison of a multi-valued field across the two
/// partitions, over a fixed vocabulary of the most frequent values.
#[derive(Debug, Clone)]
pub struct ExplodedCompare {
    pub values: Vec<String>,
    /// Percent of exploded rows per value, index-aligned with `values`.
    pub high_pct: Vec<f64>,
    pub normal_pct: Vec<f64>,
}

fn exploded_counts<'a, F>(records: &[&'a AnimeRecord], values: &F) -> (HashMap<String, usize>, usize)
where
    F: Fn(&AnimeRecord) -> &[String],
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0usize;
    for record in records {
        for value in values(record) {
            *counts.entry(value.clone()).or_insert(0) += 1;
            total += 1;
        }
    }
    (counts, total)
}

/// Explode a multi-valued field and compare its per-partition frequency
/// distributions. The vocabulary is the `top_n` most frequent values in the
/// full dataset; a value missing from one partition reads 0% there, so both
/// sides always cover the same vocabulary.
pub fn exploded_ratio_compare<F>(
    partition: &PopularityPartition<'_>,
    values: F,
    top_n: usize,
) -> ExplodedCompare
where
    F: Fn(&AnimeRecord) -> &[String],
{
    let all: Vec<&AnimeRecord> = partition
        .high
        .iter()
        .chain(partition.normal.iter())
        .copied()
        .collect();
    let (full_counts, _) = exploded_counts(&all, &values);

    let mut ranked: Vec<(String, usize)> = full_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    let vocabulary: Vec<String> = ranked.into_iter().map(|(v, _)| v).collect();

    let pct_for = |side: &[&AnimeRecord]| -> Vec<f64> {
        let (counts, total) = exploded_counts(side, &values);
        vocabulary
            .iter()
            .map(|v| {
                if total == 0 {
                    0.0
                } else {
                    100.0 * counts.get(v).copied().unwrap_or(0) as f64 / total as f64
                }
            })
            .collect()
    };

    ExplodedCompare {
        high_pct: pct_for(&partition.high),
        normal_pct: pct_for(&partition.normal),
        values: vocabulary,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioRatio {
    pub studio: String,
    pub works: usize,
    pub high_ratio: f64,
}

/// High-popularity ratio per studio, restricted to studios with at least
/// `min_sample` works, descending, truncated to `top`.
pub fn studio_ratio_ranking(
    records: &[AnimeRecord],
    threshold: f64,
    min_sample: usize,
    top: usize,
) -> Vec<StudioRatio> {
    let mut works: HashMap<String, (usize, usize)> = HashMap::new();
    for record in records {
        for studio in &record.studios {
            let acc = works.entry(studio.clone()).or_insert((0, 0));
            acc.0 += 1;
            if is_high(record, threshold) {
                acc.1 += 1;
            }
        }
    }

    let mut rows: Vec<StudioRatio> = works
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_sample)
        .map(|(studio, (count, high))| StudioRatio {
            studio,
            works: count,
            high_ratio: high as f64 / count as f64,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.high_ratio
            .partial_cmp(&a.high_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.studio.cmp(&b.studio))
    });
    rows.truncate(top);
    rows
}

#[derive(Debug, Clone)]
pub struct BinnedCompare {
    pub labels: Vec<String>,
    pub high_pct: Vec<f64>,
    pub normal_pct: Vec<f64>,
}

/// Index of the bin holding `v`, with intervals `(edges[i], edges[i+1]]`
/// so that a value sitting on an edge belongs to the lower bin (episode
/// count 12 is a "1-12 eps" show). Values at or below the first edge get
/// no bin.
fn bin_index(v: f64, edges: &[f64]) -> Option<usize> {
    for i in 0..edges.len() - 1 {
        if v > edges[i] && v <= edges[i + 1] {
            return Some(i);
        }
    }
    None
}

/// Distribution of a numeric field over explicit bins, per partition.
/// Null and zero values are excluded before binning (they mean "unknown",
/// not "zero-length"); empty bins read 0%.
pub fn binned_distribution<F>(
    partition: &PopularityPartition<'_>,
    value: F,
    edges: &[f64],
    labels: &[String],
) -> BinnedCompare
where
    F: Fn(&AnimeRecord) -> Option<i64>,
{
    let pct_for = |side: &[&AnimeRecord]| -> Vec<f64> {
        let mut counts = vec![0usize; labels.len()];
        let mut total = 0usize;
        for record in side {
            let Some(v) = value(record) else { continue };
            if v <= 0 {
                continue;
            }
            if let Some(i) = bin_index(v as f64, edges) {
                counts[i] += 1;
                total += 1;
            }
        }
        counts
            .iter()
            .map(|&c| {
                if total == 0 {
                    0.0
                } else {
                    100.0 * c as f64 / total as f64
                }
            })
            .collect()
    };

    BinnedCompare {
        labels: labels.to_vec(),
        high_pct: pct_for(&partition.high),
        normal_pct: pct_for(&partition.normal),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorePoint {
    pub score: f64,
    pub popularity: f64,
    pub is_high: bool,
}

/// Score vs popularity points for the scatter chart. `averageScore` falls
/// back to `meanScore`; rows still missing a score or popularity are
/// dropped. No sampling.
pub fn score_popularity_points(records: &[AnimeRecord], threshold: f64) -> Vec<ScorePoint> {
    records
        .iter()
        .filter_map(|r| {
            let score = r.score_with_fallback()?;
            let popularity = r.popularity? as f64;
            Some(ScorePoint {
                score,
                popularity,
                is_high: is_high(r, threshold),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64, popularity: Option<i64>) -> AnimeRecord {
        AnimeRecord {
            id,
            popularity,
            ..Default::default()
        }
    }

    #[test]
    fn percentile_uses_linear_interpolation() {
        // 0.8 * (3 - 1) = 1.6 between 50 and 90.
        let values = [10.0, 50.0, 90.0];
        let p = percentile_linear(&values, 0.8).unwrap();
        assert!((p - 74.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_floors_the_percentile() {
        let records: Vec<AnimeRecord> = [10, 50, 90].iter().map(|&p| rec(p, Some(p))).collect();
        let t = high_popularity_threshold(&records, 0.8).unwrap();
        assert_eq!(t, 74.0);
    }

    #[test]
    fn threshold_needs_popularity_values() {
        let records = vec![rec(1, None)];
        assert!(matches!(
            high_popularity_threshold(&records, 0.8),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let records: Vec<AnimeRecord> = vec![rec(1, Some(10)), rec(2, Some(74)), rec(3, None)];
        let parts = partition(&records, 74.0);
        assert_eq!(parts.high.len() + parts.normal.len(), records.len());
        assert_eq!(parts.high.len(), 1);
        assert_eq!(parts.high[0].id, 2);
    }

    #[test]
    fn grouped_ratio_drops_missing_and_sorts_by_ratio() {
        let mut a = rec(1, Some(100));
        a.source = Some("MANGA".to_string());
        let mut b = rec(2, Some(10));
        b.source = Some("MANGA".to_string());
        let mut c = rec(3, Some(100));
        c.source = Some("ORIGINAL".to_string());
        let d = rec(4, Some(100)); // no source, dropped

        let rows = grouped_ratio_by(&[a, b, c, d], |r| r.source.as_deref(), 50.0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "ORIGINAL");
        assert_eq!(rows[0].high_ratio, 1.0);
        assert_eq!(rows[1].key, "MANGA");
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].high_ratio, 0.5);
        assert_eq!(rows[1].mean_popularity, 55.0);
    }

    #[test]
    fn exploded_compare_uses_fixed_vocabulary_with_zero_fill() {
        let mut a = rec(1, Some(100));
        a.genres = vec!["Action".to_string(), "Comedy".to_string()];
        let mut b = rec(2, Some(10));
        b.genres = vec!["Action".to_string()];
        let mut c = rec(3, Some(10));
        c.genres = vec!["Action".to_string(), "Drama".to_string()];
        let records = vec![a, b, c];

        let parts = partition(&records, 50.0);
        let cmp = exploded_ratio_compare(&parts, |r| &r.genres, 2);
        assert_eq!(cmp.values, vec!["Action", "Comedy"]);
        // High side: Action + Comedy, one each.
        assert_eq!(cmp.high_pct, vec![50.0, 50.0]);
        // Normal side has no Comedy rows: 0%, not omitted.
        assert_eq!(cmp.normal_pct[0], 2.0 / 3.0 * 100.0);
        assert_eq!(cmp.normal_pct[1], 0.0);
    }

    #[test]
    fn studio_ranking_enforces_min_sample() {
        let mut records = Vec::new();
        for i in 0..20 {
            let mut r = rec(i, Some(if i < 10 { 100 } else { 0 }));
            r.studios = vec!["Bones".to_string()];
            records.push(r);
        }
        let mut small = rec(100, Some(100));
        small.studios = vec!["Tiny".to_string()];
        records.push(small);

        let rows = studio_ratio_ranking(&records, 50.0, 20, 15);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].studio, "Bones");
        assert_eq!(rows[0].works, 20);
        assert_eq!(rows[0].high_ratio, 0.5);
    }

    #[test]
    fn bin_index_keeps_edge_values_in_lower_bin() {
        let edges = [0.0, 12.0, 24.0, 48.0, 100.0, f64::INFINITY];
        assert_eq!(bin_index(5.0, &edges), Some(0));
        assert_eq!(bin_index(12.0, &edges), Some(0));
        assert_eq!(bin_index(24.0, &edges), Some(1));
        assert_eq!(bin_index(101.0, &edges), Some(4));
        assert_eq!(bin_index(0.0, &edges), None);
    }

    #[test]
    fn binned_distribution_excludes_unknown_and_sums_to_100() {
        let mut records = Vec::new();
        for (i, eps) in [Some(5i64), Some(12), Some(24), Some(0), None]
            .iter()
            .enumerate()
        {
            let mut r = rec(i as i64, Some(100));
            r.episodes = *eps;
            records.push(r);
        }
        let parts = partition(&records, 50.0);
        let labels: Vec<String> = ["1-12 eps", "13-24 eps", "25-48 eps", "49-100 eps", "100+ eps"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let edges = [0.0, 12.0, 24.0, 48.0, 100.0, f64::INFINITY];
        let dist = binned_distribution(&parts, |r| r.episodes, &edges, &labels);

        // 5 and 12 in the first bin, 24 in the second, 0 and null excluded.
        assert!((dist.high_pct[0] - 200.0 / 3.0).abs() < 1e-9);
        assert!((dist.high_pct[1] - 100.0 / 3.0).abs() < 1e-9);
        let total: f64 = dist.high_pct.iter().sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn score_points_fall_back_to_mean_score() {
        let mut a = rec(1, Some(100));
        a.average_score = Some(80.0);
        let mut b = rec(2, Some(10));
        b.mean_score = Some(55.0);
        let mut c = rec(3, Some(10)); // no score at all, dropped
        c.average_score = None;

        let points = score_popularity_points(&[a, b, c], 50.0);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].score, 80.0);
        assert!(points[0].is_high);
        assert_eq!(points[1].score, 55.0);
        assert!(!points[1].is_high);
    }
}
