//! Typed record view of the dataset. The analytics path works over
//! `Vec<AnimeRecord>` with the multi-valued columns parsed exactly once,
//! while the browse path stays on the polars `DataFrame`.

use crate::error::Result;
use crate::parse::{parse_external_links, split_multi};
use polars::prelude::*;

/// One row of the snapshot, with optional fields for everything except `id`.
///
/// `genres`, `studios` and `tags` are the parsed forms of the pipe-delimited
/// CSV columns; `tags_raw` keeps the original tag text because TF-IDF
/// tokenizes it differently.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimeRecord {
    pub id: i64,
    pub id_mal: Option<i64>,
    pub title_native: Option<String>,
    pub title_romaji: Option<String>,
    pub title_english: Option<String>,
    pub format: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub season: Option<String>,
    pub season_year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub episodes: Option<i64>,
    pub duration: Option<i64>,
    pub average_score: Option<f64>,
    pub mean_score: Option<f64>,
    pub popularity: Option<i64>,
    pub favourites: Option<i64>,
    pub genres: Vec<String>,
    pub studios: Vec<String>,
    pub tags: Vec<String>,
    pub tags_raw: Option<String>,
    pub external_sites: Vec<String>,
}

impl AnimeRecord {
    /// Release year, preferring `seasonYear` and falling back to the leading
    /// year of `startDate` (`YYYY-MM-DD` or `YYYY/...`).
    pub fn start_year(&self) -> Option<i32> {
        if let Some(y) = self.season_year {
            return Some(y);
        }
        let date = self.start_date.as_deref()?;
        let head: String = date.chars().take_while(|c| c.is_ascii_digit()).collect();
        if head.len() == 4 {
            head.parse().ok()
        } else {
            None
        }
    }

    /// Score used for the score/popularity scatter: `averageScore` with a
    /// `meanScore` fallback.
    pub fn score_with_fallback(&self) -> Option<f64> {
        self.average_score.or(self.mean_score)
    }
}

// Column extraction helpers. A column missing from the CSV reads as all-null
// rather than failing the load.

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    match df.column(name) {
        Ok(col) => {
            let casted = col.cast(&DataType::String)?;
            let ca = casted.str()?;
            Ok(ca
                .iter()
                .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn i64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    match df.column(name) {
        Ok(col) => {
            let casted = col.cast(&DataType::Int64)?;
            Ok(casted.i64()?.iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(col) => {
            let casted = col.cast(&DataType::Float64)?;
            Ok(casted.f64()?.iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

/// Build typed records from the raw frame. Rows without a usable `id`
/// are dropped.
pub fn records_from_frame(df: &DataFrame) -> Result<Vec<AnimeRecord>> {
    let ids = i64_column(df, "id")?;
    let id_mals = i64_column(df, "idMal")?;
    let title_natives = str_column(df, "title_native")?;
    let title_romajis = str_column(df, "title_romaji")?;
    let title_englishes = str_column(df, "title_english")?;
    let formats = str_column(df, "format")?;
    let statuses = str_column(df, "status")?;
    let sources = str_column(df, "source")?;
    let seasons = str_column(df, "season")?;
    let season_years = i64_column(df, "seasonYear")?;
    let start_dates = str_column(df, "startDate")?;
    let end_dates = str_column(df, "endDate")?;
    let episodes = i64_column(df, "episodes")?;
    let durations = i64_column(df, "duration")?;
    let average_scores = f64_column(df, "averageScore")?;
    let mean_scores = f64_column(df, "meanScore")?;
    let popularities = i64_column(df, "popularity")?;
    let favourites = i64_column(df, "favourites")?;
    let genres = str_column(df, "genres")?;
    let studios = str_column(df, "mainStudio")?;
    let tags = str_column(df, "tags")?;
    let links = str_column(df, "externalLinks_json")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let Some(id) = ids[i] else { continue };
        let tags_raw = tags[i].clone();
        records.push(AnimeRecord {
            id,
            id_mal: id_mals[i],
            title_native: title_natives[i].clone(),
            title_romaji: title_romajis[i].clone(),
            title_english: title_englishes[i].clone(),
            format: formats[i].clone(),
            status: statuses[i].clone(),
            source: sources[i].clone(),
            season: seasons[i].clone(),
            season_year: season_years[i].map(|y| y as i32),
            start_date: start_dates[i].clone(),
            end_date: end_dates[i].clone(),
            episodes: episodes[i],
            duration: durations[i],
            average_score: average_scores[i],
            mean_score: mean_scores[i],
            popularity: popularities[i],
            favourites: favourites[i],
            genres: genres[i].as_deref().map(|g| split_multi(g, "|")).unwrap_or_default(),
            studios: studios[i].as_deref().map(|s| split_multi(s, "|")).unwrap_or_default(),
            tags: tags_raw.as_deref().map(|t| split_multi(t, "|")).unwrap_or_default(),
            tags_raw,
            external_sites: links[i]
                .as_deref()
                .map(parse_external_links)
                .unwrap_or_default(),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_records_and_parses_multivalue_fields() {
        let df = df! {
            "id" => [1i64, 2],
            "title_romaji" => ["Alpha", "Beta"],
            "genres" => [Some("Action | Comedy"), None],
            "mainStudio" => ["MAPPA", "Bones"],
            "tags" => ["Isekai|Magic", "Mecha"],
            "popularity" => [Some(100i64), None],
            "averageScore" => [75.0, 60.0],
        }
        .unwrap();

        let records = records_from_frame(&df).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].genres, vec!["Action", "Comedy"]);
        assert!(records[1].genres.is_empty());
        assert_eq!(records[0].tags_raw.as_deref(), Some("Isekai|Magic"));
        assert_eq!(records[1].popularity, None);
    }

    #[test]
    fn missing_columns_read_as_null() {
        let df = df! { "id" => [7i64] }.unwrap();
        let records = records_from_frame(&df).unwrap();
        assert_eq!(records[0].season_year, None);
        assert!(records[0].external_sites.is_empty());
    }

    #[test]
    fn start_year_falls_back_to_start_date() {
        let rec = AnimeRecord {
            id: 1,
            start_date: Some("2019-04-01".to_string()),
            ..Default::default()
        };
        assert_eq!(rec.start_year(), Some(2019));

        let rec = AnimeRecord {
            id: 2,
            season_year: Some(2021),
            start_date: Some("2019-04-01".to_string()),
            ..Default::default()
        };
        assert_eq!(rec.start_year(), Some(2021));
    }
}
