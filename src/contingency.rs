//! Contingency-table construction and the Pearson chi-square test with
//! Cramér's V and standardized residuals, for the source-vs-genre analysis.

use crate::error::{Error, Result};
use crate::record::AnimeRecord;
use std::collections::BTreeSet;

/// Cross-tabulation of observed counts. Row order follows the whitelist the
/// table was built with; columns are sorted.
#[derive(Debug, Clone)]
pub struct ContingencyTable {
    pub rows: Vec<String>,
    pub cols: Vec<String>,
    pub counts: Vec<Vec<f64>>,
    pub n: f64,
}

/// Observed counts of whitelisted sources against exploded genres. Sources
/// absent from the data produce no row; genres come from the whitelisted
/// rows only.
pub fn source_genre_contingency(
    records: &[AnimeRecord],
    source_whitelist: &[String],
) -> ContingencyTable {
    let kept: Vec<&AnimeRecord> = records
        .iter()
        .filter(|r| {
            r.source
                .as_deref()
                .map(|s| source_whitelist.iter().any(|w| w == s))
                .unwrap_or(false)
        })
        .collect();

    let genres: BTreeSet<String> = kept
        .iter()
        .flat_map(|r| r.genres.iter().cloned())
        .collect();
    let cols: Vec<String> = genres.into_iter().collect();

    let rows: Vec<String> = source_whitelist
        .iter()
        .filter(|w| kept.iter().any(|r| r.source.as_deref() == Some(w.as_str())))
        .cloned()
        .collect();

    let mut counts = vec![vec![0.0; cols.len()]; rows.len()];
    let mut n = 0.0;
    for record in &kept {
        let Some(source) = record.source.as_deref() else { continue };
        let Some(ri) = rows.iter().position(|r| r == source) else { continue };
        for genre in &record.genres {
            if let Some(ci) = cols.iter().position(|c| c == genre) {
                counts[ri][ci] += 1.0;
                n += 1.0;
            }
        }
    }

    ContingencyTable { rows, cols, counts, n }
}

#[derive(Debug, Clone)]
pub struct ChiSquareResult {
    pub chi2: f64,
    pub dof: usize,
    pub p_value: f64,
    pub cramers_v: f64,
    pub expected: Vec<Vec<f64>>,
}

/// Pearson chi-square over the table. Fails with `InsufficientData` on a
/// table smaller than 2x2 or with a zero expected cell, the standard
/// precondition of the test.
pub fn chi_square_test(table: &ContingencyTable) -> Result<ChiSquareResult> {
    let r = table.rows.len();
    let c = table.cols.len();
    if r < 2 || c < 2 {
        return Err(Error::InsufficientData(format!(
            "contingency table is {}x{}, need at least 2x2",
            r, c
        )));
    }

    let row_totals: Vec<f64> = table.counts.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<f64> = (0..c)
        .map(|j| table.counts.iter().map(|row| row[j]).sum())
        .collect();

    let mut expected = vec![vec![0.0; c]; r];
    let mut chi2 = 0.0;
    for i in 0..r {
        for j in 0..c {
            let e = row_totals[i] * col_totals[j] / table.n;
            if e == 0.0 {
                return Err(Error::InsufficientData(format!(
                    "expected count is zero for ({}, {})",
                    table.rows[i], table.cols[j]
                )));
            }
            expected[i][j] = e;
            let d = table.counts[i][j] - e;
            chi2 += d * d / e;
        }
    }

    let dof = (r - 1) * (c - 1);
    let p_value = chi_square_sf(chi2, dof as f64);
    let min_dim = (r.min(c) - 1) as f64;
    let cramers_v = (chi2 / (table.n * min_dim)).sqrt();

    Ok(ChiSquareResult {
        chi2,
        dof,
        p_value,
        cramers_v,
        expected,
    })
}

/// Five-number summary of `averageScore` for one source, the data behind a
/// per-source boxplot.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceScoreSummary {
    pub source: String,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Score distributions per whitelisted source, in whitelist order. Rows
/// without an `averageScore` are dropped; sources with no scored rows
/// produce no entry.
pub fn source_score_distribution(
    records: &[AnimeRecord],
    source_whitelist: &[String],
) -> Vec<SourceScoreSummary> {
    source_whitelist
        .iter()
        .filter_map(|source| {
            let mut scores: Vec<f64> = records
                .iter()
                .filter(|r| r.source.as_deref() == Some(source.as_str()))
                .filter_map(|r| r.average_score)
                .collect();
            if scores.is_empty() {
                return None;
            }
            scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let q = |p: f64| crate::popularity::percentile_linear(&scores, p).unwrap_or(0.0);
            Some(SourceScoreSummary {
                source: source.clone(),
                count: scores.len(),
                min: scores[0],
                q1: q(0.25),
                median: q(0.5),
                q3: q(0.75),
                max: scores[scores.len() - 1],
            })
        })
        .collect()
}

/// Per-cell standardized residuals `(observed - expected) / sqrt(expected)`,
/// same shape as the table.
pub fn standardized_residuals(table: &ContingencyTable, expected: &[Vec<f64>]) -> Vec<Vec<f64>> {
    table
        .counts
        .iter()
        .zip(expected)
        .map(|(obs_row, exp_row)| {
            obs_row
                .iter()
                .zip(exp_row)
                .map(|(&o, &e)| (o - e) / e.sqrt())
                .collect()
        })
        .collect()
}

// Chi-square survival function via the regularized upper incomplete gamma
// function Q(dof/2, x/2), computed with the usual series / continued
// fraction split.

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, g = 7.
    const COEFFS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    if x < 0.5 {
        // Reflection formula.
        let pi = std::f64::consts::PI;
        pi.ln() - (pi * x).sin().ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let mut acc = COEFFS[0];
        for (i, &coef) in COEFFS.iter().enumerate().skip(1) {
            acc += coef / (x + i as f64);
        }
        let t = x + 7.5;
        0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
    }
}

fn lower_gamma_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0 / a;
    let mut sum = term;
    let mut ap = a;
    for _ in 0..500 {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * 1e-14 {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn upper_gamma_cf(a: f64, x: f64) -> f64 {
    let tiny = 1e-300;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / tiny;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..500 {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < tiny {
            d = tiny;
        }
        c = b + an / c;
        if c.abs() < tiny {
            c = tiny;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < 1e-14 {
            break;
        }
    }
    h * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn chi_square_sf(chi2: f64, dof: f64) -> f64 {
    if chi2 <= 0.0 {
        return 1.0;
    }
    let a = dof / 2.0;
    let x = chi2 / 2.0;
    let q = if x < a + 1.0 {
        1.0 - lower_gamma_series(a, x)
    } else {
        upper_gamma_cf(a, x)
    };
    q.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(source: &str, genres: &[&str]) -> AnimeRecord {
        AnimeRecord {
            id: 0,
            source: Some(source.to_string()),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    fn whitelist() -> Vec<String> {
        ["MANGA", "LIGHT_NOVEL", "ORIGINAL", "VIDEO_GAME", "VISUAL_NOVEL"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn table_follows_whitelist_order_and_sorted_genres() {
        let records = vec![
            rec("ORIGINAL", &["Drama"]),
            rec("MANGA", &["Action", "Comedy"]),
            rec("WEB_NOVEL", &["Action"]), // not whitelisted, excluded
        ];
        let table = source_genre_contingency(&records, &whitelist());
        assert_eq!(table.rows, vec!["MANGA", "ORIGINAL"]);
        assert_eq!(table.cols, vec!["Action", "Comedy", "Drama"]);
        assert_eq!(table.n, 3.0);
        assert_eq!(table.counts[0], vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn chi_square_invariants() {
        let records = vec![
            rec("MANGA", &["Action"]),
            rec("MANGA", &["Action"]),
            rec("MANGA", &["Comedy"]),
            rec("ORIGINAL", &["Action"]),
            rec("ORIGINAL", &["Comedy"]),
            rec("ORIGINAL", &["Comedy"]),
        ];
        let table = source_genre_contingency(&records, &whitelist());
        let result = chi_square_test(&table).unwrap();
        assert_eq!(result.dof, 1);
        assert!(result.chi2 >= 0.0);
        assert!((0.0..=1.0).contains(&result.p_value));
        assert!((0.0..=1.0).contains(&result.cramers_v));

        let residuals = standardized_residuals(&table, &result.expected);
        assert_eq!(residuals.len(), table.rows.len());
        assert_eq!(residuals[0].len(), table.cols.len());
    }

    #[test]
    fn degenerate_table_is_insufficient_data() {
        let records = vec![rec("MANGA", &["Action"]), rec("MANGA", &["Comedy"])];
        let table = source_genre_contingency(&records, &whitelist());
        assert!(matches!(
            chi_square_test(&table),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn score_distribution_keeps_whitelist_order_and_drops_unscored() {
        let scored = |source: &str, score: f64| AnimeRecord {
            id: 0,
            source: Some(source.to_string()),
            average_score: Some(score),
            ..Default::default()
        };
        let records = vec![
            scored("ORIGINAL", 70.0),
            scored("MANGA", 60.0),
            scored("MANGA", 80.0),
            scored("MANGA", 70.0),
            rec("MANGA", &["Action"]), // no score, dropped
            scored("WEB_NOVEL", 90.0), // not whitelisted
        ];
        let summaries = source_score_distribution(&records, &whitelist());
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].source, "MANGA");
        assert_eq!(summaries[0].count, 3);
        assert_eq!(summaries[0].min, 60.0);
        assert_eq!(summaries[0].median, 70.0);
        assert_eq!(summaries[0].max, 80.0);
        assert_eq!(summaries[1].source, "ORIGINAL");
        assert_eq!(summaries[1].count, 1);
        assert_eq!(summaries[1].q1, 70.0);
        assert_eq!(summaries[1].q3, 70.0);
    }

    #[test]
    fn sf_matches_known_values() {
        // chi2 = 3.841, dof = 1 is the 5% critical value.
        let p = chi_square_sf(3.841, 1.0);
        assert!((p - 0.05).abs() < 1e-3);
        // chi2 = 0 means no evidence at all.
        assert_eq!(chi_square_sf(0.0, 4.0), 1.0);
    }

    #[test]
    fn ln_gamma_matches_factorials() {
        // Gamma(5) = 24.
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-10);
    }
}
