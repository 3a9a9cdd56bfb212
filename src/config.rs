//! Application configuration: the dataset location plus the analysis
//! constants that are tied to the 2016-2025 snapshot (canonical studio list,
//! source whitelist, bin edges, thresholds). These are deliberately
//! configuration data rather than values inferred from the dataset.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_TEMPLATE: &str = r##"# anilens configuration
# Analysis constants default to values matching the 2016-2025 AniList snapshot.

# data_path = "public/data/anilist_anime_2016_2025.csv"

[analysis]
# high_popularity_quantile = 0.8
# min_studio_sample = 20
# top_genres = 15
# overview_top_genres = 10
# top_ranked_studios = 15
# top_tags = 10
# max_tfidf_terms = 500
# year_start = 2016
# year_end = 2025
# focus_tag = "Isekai"
# tag_stoplist = ["Male", "Female", "Cast"]
# source_whitelist = ["MANGA", "LIGHT_NOVEL", "ORIGINAL", "VIDEO_GAME", "VISUAL_NOVEL"]
"##;

/// Complete application configuration, loaded from TOML with defaults for
/// every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Location of the CSV snapshot.
    pub data_path: PathBuf,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Quantile of `popularity` defining the high-popularity partition.
    pub high_popularity_quantile: f64,
    /// Minimum number of works a studio needs before its ratio is reported.
    pub min_studio_sample: usize,
    /// Size of the common genre vocabulary in the partition comparison.
    pub top_genres: usize,
    /// How many genres the overview ranks by mean popularity.
    pub overview_top_genres: usize,
    /// How many studios to keep in the ratio ranking.
    pub top_ranked_studios: usize,
    /// Number of tags (besides the focus tag) in the trend chart.
    pub top_tags: usize,
    /// Cap on ranked TF-IDF terms.
    pub max_tfidf_terms: usize,
    pub year_start: i32,
    pub year_end: i32,
    /// Tag whose rise the trend analysis centers on.
    pub focus_tag: String,
    /// Structural tag tokens excluded from trend counting; matched as
    /// substrings of the whole tag, not exact names.
    pub tag_stoplist: Vec<String>,
    /// Row dimension of the source x genre contingency table.
    pub source_whitelist: Vec<String>,
    /// The fixed top-10 studio list for the capacity analysis, in display
    /// order. Matching is punctuation- and case-insensitive.
    pub canonical_studios: Vec<String>,
    /// Right-exclusive episode-count bin edges; the last bin is open-ended.
    pub episode_bin_edges: Vec<f64>,
    pub episode_bin_labels: Vec<String>,
    /// Right-exclusive per-episode duration bin edges (minutes).
    pub duration_bin_edges: Vec<f64>,
    pub duration_bin_labels: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("public/data/anilist_anime_2016_2025.csv"),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            high_popularity_quantile: 0.8,
            min_studio_sample: 20,
            top_genres: 15,
            overview_top_genres: 10,
            top_ranked_studios: 15,
            top_tags: 10,
            max_tfidf_terms: 500,
            year_start: 2016,
            year_end: 2025,
            focus_tag: "Isekai".to_string(),
            tag_stoplist: vec!["Male".into(), "Female".into(), "Cast".into()],
            source_whitelist: vec![
                "MANGA".into(),
                "LIGHT_NOVEL".into(),
                "ORIGINAL".into(),
                "VIDEO_GAME".into(),
                "VISUAL_NOVEL".into(),
            ],
            canonical_studios: vec![
                "J.C.STAFF".into(),
                "Toei Animation".into(),
                "TMS Entertainment".into(),
                "OLM".into(),
                "A-1 Pictures".into(),
                "Sunrise".into(),
                "Studio DEEN".into(),
                "Production I.G".into(),
                "LIDENFILMS".into(),
                "MAPPA".into(),
            ],
            episode_bin_edges: vec![0.0, 12.0, 24.0, 48.0, 100.0, f64::INFINITY],
            episode_bin_labels: vec![
                "1-12 eps".into(),
                "13-24 eps".into(),
                "25-48 eps".into(),
                "49-100 eps".into(),
                "100+ eps".into(),
            ],
            duration_bin_edges: vec![0.0, 15.0, 25.0, 45.0, f64::INFINITY],
            duration_bin_labels: vec![
                "<=15 min".into(),
                "16-25 min".into(),
                "26-45 min".into(),
                ">45 min".into(),
            ],
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit path, or fall back to
    /// `<config_dir>/anilens/config.toml` when present, or defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(p.to_path_buf()),
            None => dirs::config_dir().map(|d| d.join(crate::APP_NAME).join("config.toml")),
        };

        match candidate {
            Some(p) if p.exists() => Self::from_file(&p),
            // An explicitly named config file must exist.
            Some(p) if path.is_some() => Err(Error::Config(format!(
                "config file not found: {}",
                p.display()
            ))),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}
