//! Browse-page search over the normalized frame: every filter is optional
//! and they compose with AND semantics, plus simple pagination.

use crate::error::Result;
use polars::prelude::*;

pub const PAGE_SIZE: usize = 20;

/// Filter set for the browse page. `None` means "no constraint"; string
/// matches are case-insensitive substring matches.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Matches the native title, the studio text or the tag text.
    pub keyword: Option<String>,
    pub genre: Option<String>,
    pub season: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub studio: Option<String>,
    pub tag: Option<String>,
    pub year: Option<i64>,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    pub episodes_max: Option<i64>,
    pub duration_max: Option<i64>,
    pub min_score: Option<f64>,
}

fn ci_contains(column: &str, needle: &str) -> Expr {
    let pattern = format!("(?i){}", regex::escape(needle));
    col(column)
        .cast(DataType::String)
        .str()
        .contains(lit(pattern), false)
        .fill_null(lit(false))
}

impl SearchFilters {
    fn to_expr(&self) -> Option<Expr> {
        let mut clauses: Vec<Expr> = Vec::new();

        if let Some(kw) = self.keyword.as_deref().filter(|s| !s.is_empty()) {
            let any = ["title_native", "mainStudio", "tags"]
                .iter()
                .map(|c| ci_contains(c, kw))
                .reduce(|a, b| a.or(b));
            if let Some(expr) = any {
                clauses.push(expr);
            }
        }
        if let Some(v) = self.genre.as_deref().filter(|s| !s.is_empty()) {
            clauses.push(ci_contains("genres", v));
        }
        if let Some(v) = self.studio.as_deref().filter(|s| !s.is_empty()) {
            clauses.push(ci_contains("mainStudio", v));
        }
        if let Some(v) = self.tag.as_deref().filter(|s| !s.is_empty()) {
            clauses.push(ci_contains("tags", v));
        }
        for (column, value) in [
            ("season", &self.season),
            ("format", &self.format),
            ("status", &self.status),
            ("source", &self.source),
        ] {
            if let Some(v) = value.as_deref().filter(|s| !s.is_empty()) {
                clauses.push(col(column).cast(DataType::String).eq(lit(v)));
            }
        }
        if let Some(y) = self.year {
            clauses.push(col("seasonYear").eq(lit(y)));
        }
        if let Some(y) = self.year_min {
            clauses.push(col("seasonYear").gt_eq(lit(y)));
        }
        if let Some(y) = self.year_max {
            clauses.push(col("seasonYear").lt_eq(lit(y)));
        }
        if let Some(v) = self.episodes_max {
            clauses.push(col("episodes").lt_eq(lit(v)));
        }
        if let Some(v) = self.duration_max {
            clauses.push(col("duration").lt_eq(lit(v)));
        }
        if let Some(v) = self.min_score {
            clauses.push(col("averageScore").gt_eq(lit(v)));
        }

        clauses.into_iter().reduce(|a, b| a.and(b))
    }

    /// Apply all set filters to the frame. With no filters set, the frame
    /// comes back unchanged.
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        match self.to_expr() {
            Some(expr) => Ok(df.lazy().filter(expr).collect()?),
            None => Ok(df),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub rows: DataFrame,
    /// Zero-based page index.
    pub page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
}

/// Slice out one page of results. A page index past the end yields an empty
/// page rather than an error.
pub fn paginate(df: &DataFrame, page: usize, page_size: usize) -> Page {
    let total_rows = df.height();
    let total_pages = total_rows.div_ceil(page_size).max(1);
    let offset = page * page_size;
    let rows = df.slice(offset as i64, page_size);
    Page {
        rows,
        page,
        total_pages,
        total_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> DataFrame {
        df! {
            "id" => [1i64, 2, 3],
            "title_native" => ["ソードアート", "進撃の巨人", "ワンピース"],
            "title_romaji" => ["Sword Art Online", "Shingeki no Kyojin", "One Piece"],
            "title_english" => ["Sword Art Online", "Attack on Titan", "One Piece"],
            "mainStudio" => ["A-1 Pictures", "MAPPA", "Toei Animation"],
            "genres" => ["Action|Fantasy", "Action|Drama", "Action|Adventure"],
            "tags" => ["Isekai|Video Games", "Military", "Pirates"],
            "season" => ["SUMMER", "SPRING", "FALL"],
            "format" => ["TV", "TV", "TV"],
            "status" => ["FINISHED", "FINISHED", "RELEASING"],
            "source" => ["LIGHT_NOVEL", "MANGA", "MANGA"],
            "seasonYear" => [2017i64, 2023, 2016],
            "episodes" => [24i64, 12, 1000],
            "duration" => [24i64, 24, 24],
            "averageScore" => [75.0f64, 90.0, 85.0],
        }
        .unwrap()
    }

    #[test]
    fn no_filters_returns_everything() {
        let df = fixture();
        let out = SearchFilters::default().apply(df.clone()).unwrap();
        assert_eq!(out.height(), df.height());
    }

    #[test]
    fn keyword_searches_native_title_studio_and_tags() {
        let filters = SearchFilters {
            keyword: Some("mappa".to_string()),
            ..Default::default()
        };
        let out = filters.apply(fixture()).unwrap();
        assert_eq!(out.height(), 1);
        let ids = out.column("id").unwrap().i64().unwrap();
        assert_eq!(ids.get(0), Some(2));
    }

    #[test]
    fn keyword_ignores_romaji_and_english_titles() {
        let filters = SearchFilters {
            keyword: Some("titan".to_string()),
            ..Default::default()
        };
        let out = filters.apply(fixture()).unwrap();
        assert_eq!(out.height(), 0);

        let filters = SearchFilters {
            keyword: Some("巨人".to_string()),
            ..Default::default()
        };
        let out = filters.apply(fixture()).unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn filters_compose_with_and_semantics() {
        let filters = SearchFilters {
            source: Some("MANGA".to_string()),
            year_min: Some(2020),
            ..Default::default()
        };
        let out = filters.apply(fixture()).unwrap();
        assert_eq!(out.height(), 1);
        let ids = out.column("id").unwrap().i64().unwrap();
        assert_eq!(ids.get(0), Some(2));
    }

    #[test]
    fn genre_and_score_filters() {
        let filters = SearchFilters {
            genre: Some("action".to_string()),
            min_score: Some(80.0),
            ..Default::default()
        };
        let out = filters.apply(fixture()).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn pagination_covers_all_rows() {
        let df = fixture();
        let p0 = paginate(&df, 0, 2);
        let p1 = paginate(&df, 1, 2);
        assert_eq!(p0.total_rows, 3);
        assert_eq!(p0.total_pages, 2);
        assert_eq!(p0.rows.height() + p1.rows.height(), 3);

        let past_end = paginate(&df, 5, 2);
        assert_eq!(past_end.rows.height(), 0);
    }
}
