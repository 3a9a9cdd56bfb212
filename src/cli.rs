//! Command-line surface: one subcommand per dashboard page.

use crate::search::SearchFilters;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "anilens - anime dataset analytics in the terminal")]
pub struct Args {
    /// Path to a config file (defaults to the user config directory)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override the dataset CSV path from the config
    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Write PNG charts into this directory in addition to printing tables
    #[arg(long = "chart-dir", global = true)]
    pub chart_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search and page through titles
    Search(SearchArgs),
    /// Dataset overview: formats, genre popularity, studio platforms
    Overview,
    /// Popularity drivers: threshold, partitions and comparisons
    Popularity,
    /// Studio capacity and industry scale trends
    Capacity,
    /// Source material analysis with the chi-square test
    Source,
    /// Isekai tag trend and TF-IDF term ranking
    Isekai,
    /// Print the pre-trained prediction report
    Report,
    /// Export the normalized dataset as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long = "output")]
        output: Option<PathBuf>,
    },
    /// Print the default configuration template
    Config,
}

#[derive(ClapArgs, Debug, Default)]
pub struct SearchArgs {
    /// Keyword matched against titles, studios and tags
    pub keyword: Option<String>,

    #[arg(long)]
    pub genre: Option<String>,
    #[arg(long)]
    pub season: Option<String>,
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub source: Option<String>,
    #[arg(long)]
    pub studio: Option<String>,
    #[arg(long)]
    pub tag: Option<String>,
    #[arg(long)]
    pub year: Option<i64>,
    #[arg(long = "year-min")]
    pub year_min: Option<i64>,
    #[arg(long = "year-max")]
    pub year_max: Option<i64>,
    #[arg(long = "episodes-max")]
    pub episodes_max: Option<i64>,
    #[arg(long = "duration-max")]
    pub duration_max: Option<i64>,
    #[arg(long = "min-score")]
    pub min_score: Option<f64>,

    /// Zero-based result page
    #[arg(long, default_value_t = 0)]
    pub page: usize,
}

impl From<&SearchArgs> for SearchFilters {
    fn from(args: &SearchArgs) -> Self {
        SearchFilters {
            keyword: args.keyword.clone(),
            genre: args.genre.clone(),
            season: args.season.clone(),
            format: args.format.clone(),
            status: args.status.clone(),
            source: args.source.clone(),
            studio: args.studio.clone(),
            tag: args.tag.clone(),
            year: args.year,
            year_min: args.year_min,
            year_max: args.year_max,
            episodes_max: args.episodes_max,
            duration_max: args.duration_max,
            min_score: args.min_score,
        }
    }
}
