use clap::Parser;
use color_eyre::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

use anilens::chart_export::{
    write_category_bars_png, write_line_series_png, write_scatter_png, ChartSeries,
};
use anilens::cli::{Args, Command};
use anilens::config::{AppConfig, DEFAULT_CONFIG_TEMPLATE};
use anilens::search::{paginate, SearchFilters, PAGE_SIZE};
use anilens::{contingency, normalize, popularity, report, store, tfidf, trends};
use anilens::{AnalysisConfig, DatasetStore};

/// Run one section of a page. A failing section reports its error and the
/// remaining sections still render.
fn section(name: &str, body: impl FnOnce() -> Result<()>) {
    if let Err(e) = body() {
        eprintln!("[{}] unavailable: {}", name, e);
    }
}

fn chart_path(dir: Option<&Path>, file: &str) -> Option<PathBuf> {
    dir.map(|d| d.join(file))
}

fn print_rule(title: &str) {
    println!("\n== {} ==", title);
}

fn run_search(store: &DatasetStore, filters: &SearchFilters, page: usize) -> Result<()> {
    let browsable = normalize::fill_missing_for_browse(store.frame())?;
    let matched = filters.apply(browsable)?;
    let result = paginate(&matched, page, PAGE_SIZE);
    println!(
        "{} matches, page {}/{}",
        result.total_rows,
        result.page + 1,
        result.total_pages
    );
    let shown = result.rows.select(["id", "title_romaji", "format", "seasonYear", "averageScore"]);
    match shown {
        Ok(df) => println!("{}", df),
        Err(_) => println!("{}", result.rows),
    }
    Ok(())
}

fn run_overview(store: &DatasetStore, cfg: &AnalysisConfig, charts: Option<&Path>) -> Result<()> {
    let records = store.records();
    println!("{} titles in the snapshot", records.len());

    print_rule("Format distribution");
    let formats = trends::format_distribution(&records);
    for (format, count) in &formats {
        println!("{:<12} {}", format, count);
    }
    if let Some(path) = chart_path(charts, "overview_formats.png") {
        let labels: Vec<String> = formats.iter().map(|(f, _)| f.clone()).collect();
        let series = vec![ChartSeries {
            name: "titles".to_string(),
            points: formats
                .iter()
                .enumerate()
                .map(|(i, (_, c))| (i as f64, *c as f64))
                .collect(),
        }];
        write_category_bars_png(&path, &labels, &series, "titles")?;
        println!("chart written to {}", path.display());
    }

    print_rule("Top genres by mean popularity");
    for row in trends::genre_popularity_top(&records, cfg.overview_top_genres) {
        println!(
            "{:<16} popularity {:>9.1}  score {:>5.1}  ({} works)",
            row.genre, row.mean_popularity, row.mean_score, row.count
        );
    }

    print_rule("Studio x platform collaborations");
    let matrix = trends::studio_platform_matrix(&records, 10);
    for (i, studio) in matrix.studios.iter().enumerate() {
        let total: usize = matrix.counts[i].iter().sum();
        println!("{:<20} {} platform links", studio, total);
    }
    Ok(())
}

fn run_popularity(store: &DatasetStore, cfg: &AnalysisConfig, charts: Option<&Path>) -> Result<()> {
    let records = store.records();
    let threshold = popularity::high_popularity_threshold(&records, cfg.high_popularity_quantile)?;
    let parts = popularity::partition(&records, threshold);
    println!(
        "high-popularity threshold: {} ({} high / {} normal)",
        threshold,
        parts.high.len(),
        parts.normal.len()
    );

    section("formats", || {
        print_rule("High-popularity ratio by format");
        for row in popularity::grouped_ratio_by(&records, |r| r.format.as_deref(), threshold) {
            println!(
                "{:<12} {:>5.1}% high  mean popularity {:>9.1}  ({} works)",
                row.key,
                row.high_ratio * 100.0,
                row.mean_popularity,
                row.count
            );
        }
        Ok(())
    });

    section("sources", || {
        print_rule("High-popularity ratio by source");
        for row in popularity::grouped_ratio_by(&records, |r| r.source.as_deref(), threshold) {
            println!(
                "{:<14} {:>5.1}% high  mean popularity {:>9.1}  ({} works)",
                row.key,
                row.high_ratio * 100.0,
                row.mean_popularity,
                row.count
            );
        }
        Ok(())
    });

    section("genres", || {
        print_rule("Genre share: high vs normal");
        let cmp = popularity::exploded_ratio_compare(&parts, |r| &r.genres, cfg.top_genres);
        for (i, genre) in cmp.values.iter().enumerate() {
            println!(
                "{:<16} high {:>5.1}%  normal {:>5.1}%",
                genre, cmp.high_pct[i], cmp.normal_pct[i]
            );
        }
        if let Some(path) = chart_path(charts, "popularity_genres.png") {
            let series = vec![
                ChartSeries {
                    name: "high".to_string(),
                    points: cmp
                        .high_pct
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| (i as f64, v))
                        .collect(),
                },
                ChartSeries {
                    name: "normal".to_string(),
                    points: cmp
                        .normal_pct
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| (i as f64, v))
                        .collect(),
                },
            ];
            write_category_bars_png(&path, &cmp.values, &series, "percent of exploded rows")?;
            println!("chart written to {}", path.display());
        }
        Ok(())
    });

    section("studios", || {
        print_rule("Studio high-popularity ranking");
        for row in popularity::studio_ratio_ranking(
            &records,
            threshold,
            cfg.min_studio_sample,
            cfg.top_ranked_studios,
        ) {
            println!(
                "{:<24} {:>5.1}% high  ({} works)",
                row.studio,
                row.high_ratio * 100.0,
                row.works
            );
        }
        Ok(())
    });

    for (name, file, accessor, edges, labels) in [
        (
            "episode bins",
            "popularity_episodes.png",
            (|r: &anilens::AnimeRecord| r.episodes) as fn(&anilens::AnimeRecord) -> Option<i64>,
            &cfg.episode_bin_edges,
            &cfg.episode_bin_labels,
        ),
        (
            "duration bins",
            "popularity_duration.png",
            |r: &anilens::AnimeRecord| r.duration,
            &cfg.duration_bin_edges,
            &cfg.duration_bin_labels,
        ),
    ] {
        section(name, || {
            print_rule(name);
            let dist = popularity::binned_distribution(&parts, accessor, edges, labels);
            for (i, label) in dist.labels.iter().enumerate() {
                println!(
                    "{:<12} high {:>5.1}%  normal {:>5.1}%",
                    label, dist.high_pct[i], dist.normal_pct[i]
                );
            }
            if let Some(path) = chart_path(charts, file) {
                let series = vec![
                    ChartSeries {
                        name: "high".to_string(),
                        points: dist
                            .high_pct
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| (i as f64, v))
                            .collect(),
                    },
                    ChartSeries {
                        name: "normal".to_string(),
                        points: dist
                            .normal_pct
                            .iter()
                            .enumerate()
                            .map(|(i, &v)| (i as f64, v))
                            .collect(),
                    },
                ];
                write_category_bars_png(&path, &dist.labels, &series, "percent")?;
                println!("chart written to {}", path.display());
            }
            Ok(())
        });
    }

    section("score scatter", || {
        let points = popularity::score_popularity_points(&records, threshold);
        print_rule("Score vs popularity");
        println!("{} scored titles", points.len());
        if let Some(path) = chart_path(charts, "popularity_scatter.png") {
            let split = |high: bool| -> Vec<(f64, f64)> {
                points
                    .iter()
                    .filter(|p| p.is_high == high)
                    .map(|p| (p.score, p.popularity))
                    .collect()
            };
            let series = vec![
                ChartSeries {
                    name: "high".to_string(),
                    points: split(true),
                },
                ChartSeries {
                    name: "normal".to_string(),
                    points: split(false),
                },
            ];
            write_scatter_png(&path, &series, "score", "popularity")?;
            println!("chart written to {}", path.display());
        }
        Ok(())
    });

    Ok(())
}

fn run_capacity(store: &DatasetStore, cfg: &AnalysisConfig, charts: Option<&Path>) -> Result<()> {
    let records = store.records();

    print_rule("Top studio output");
    let capacity = trends::studio_capacity(&records, &cfg.canonical_studios);
    for (studio, count) in capacity.studios.iter().zip(&capacity.counts) {
        println!("{:<20} {}", studio, count);
    }
    println!(
        "top studios {} works, rest of industry {}",
        capacity.top_total, capacity.other_total
    );

    print_rule("Source composition of top studios");
    for row in trends::studio_source_composition(&records, &cfg.canonical_studios) {
        println!("{:<20} {:<14} {}", row.studio, row.source, row.count);
    }

    print_rule("Industry scale trend");
    let trend = trends::yearly_output_trend(&records, cfg.year_start, cfg.year_end);
    for row in &trend {
        println!(
            "{}  {:>4} titles  {:>4} active studios",
            row.year, row.titles, row.studios
        );
    }
    if let Some(path) = chart_path(charts, "capacity_trend.png") {
        let series = vec![
            ChartSeries {
                name: "titles".to_string(),
                points: trend
                    .iter()
                    .map(|r| (r.year as f64, r.titles as f64))
                    .collect(),
            },
            ChartSeries {
                name: "active studios".to_string(),
                points: trend
                    .iter()
                    .map(|r| (r.year as f64, r.studios as f64))
                    .collect(),
            },
        ];
        write_line_series_png(&path, &series, "year", "count")?;
        println!("chart written to {}", path.display());
    }
    Ok(())
}

fn run_source(store: &DatasetStore, cfg: &AnalysisConfig, charts: Option<&Path>) -> Result<()> {
    let records = store.records();

    section("chi-square", || {
        let table = contingency::source_genre_contingency(&records, &cfg.source_whitelist);
        let result = contingency::chi_square_test(&table)?;
        print_rule("Source x genre association");
        println!(
            "chi2 = {:.2}, dof = {}, p = {:.4}, Cramér's V = {:.3}",
            result.chi2, result.dof, result.p_value, result.cramers_v
        );

        let residuals = contingency::standardized_residuals(&table, &result.expected);
        println!("\nstandardized residuals (|r| > 2 marks a strong cell):");
        for (i, source) in table.rows.iter().enumerate() {
            let strong: Vec<String> = table
                .cols
                .iter()
                .zip(&residuals[i])
                .filter(|(_, &r)| r.abs() > 2.0)
                .map(|(genre, &r)| format!("{} ({:+.1})", genre, r))
                .collect();
            println!("{:<14} {}", source, strong.join(", "));
        }
        Ok(())
    });

    section("source trend", || {
        print_rule("Titles per source per year");
        let matrix = trends::category_year_counts(
            &records,
            |r| r.source.as_deref(),
            cfg.year_start,
            cfg.year_end,
        );
        for (i, category) in matrix.categories.iter().enumerate() {
            let total: usize = matrix.counts[i].iter().sum();
            println!("{:<14} {} titles", category, total);
        }
        if let Some(path) = chart_path(charts, "source_trend.png") {
            let series: Vec<ChartSeries> = matrix
                .categories
                .iter()
                .enumerate()
                .map(|(i, category)| ChartSeries {
                    name: category.clone(),
                    points: matrix
                        .years
                        .iter()
                        .zip(&matrix.counts[i])
                        .map(|(&y, &c)| (y as f64, c as f64))
                        .collect(),
                })
                .collect();
            write_line_series_png(&path, &series, "year", "titles")?;
            println!("chart written to {}", path.display());
        }
        Ok(())
    });

    section("score distribution", || {
        print_rule("Score distribution by source");
        let summaries = contingency::source_score_distribution(&records, &cfg.source_whitelist);
        if summaries.is_empty() {
            return Err(anilens::Error::InsufficientData(
                "no scored titles among the whitelisted sources".to_string(),
            )
            .into());
        }
        for s in &summaries {
            println!(
                "{:<14} n={:<5} min {:>5.1}  q1 {:>5.1}  median {:>5.1}  q3 {:>5.1}  max {:>5.1}",
                s.source, s.count, s.min, s.q1, s.median, s.q3, s.max
            );
        }
        Ok(())
    });

    Ok(())
}

fn run_isekai(store: &DatasetStore, cfg: &AnalysisConfig, charts: Option<&Path>) -> Result<()> {
    let records = store.records();

    section("tag trend", || {
        let trend = trends::tag_trend(
            &records,
            cfg.top_tags,
            &cfg.tag_stoplist,
            &cfg.focus_tag,
            cfg.year_start,
            cfg.year_end,
        );
        print_rule("Tag trend");
        for (i, tag) in trend.tags.iter().enumerate() {
            let total: usize = trend.series[i].iter().sum();
            println!("{:<20} {} tagged titles", tag, total);
        }
        println!(
            "\n{} per year: {:?}",
            cfg.focus_tag,
            trend
                .years
                .iter()
                .zip(&trend.focus_yearly)
                .collect::<Vec<_>>()
        );
        if let Some(path) = chart_path(charts, "tag_trend.png") {
            let series: Vec<ChartSeries> = trend
                .tags
                .iter()
                .enumerate()
                .map(|(i, tag)| ChartSeries {
                    name: tag.clone(),
                    points: trend
                        .years
                        .iter()
                        .zip(&trend.series[i])
                        .map(|(&y, &c)| (y as f64, c as f64))
                        .collect(),
                })
                .collect();
            write_line_series_png(&path, &series, "year", "tagged titles")?;
            println!("chart written to {}", path.display());
        }
        Ok(())
    });

    section("tf-idf", || {
        let ranked = tfidf::tfidf_ranking(&records, &cfg.focus_tag, cfg.max_tfidf_terms)?;
        print_rule("Top co-occurring terms");
        for term in ranked.iter().take(20) {
            println!("{:<24} {:.4}", term.term, term.weight);
        }
        Ok(())
    });

    Ok(())
}

fn run_export(store: &DatasetStore, output: Option<&Path>) -> Result<()> {
    let normalized = normalize::fill_missing_for_browse(store.frame())?;
    match output {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            store::export_csv(&normalized, file)?;
            println!("{} rows written to {}", normalized.height(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            store::export_csv(&normalized, stdout.lock())?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    if let Command::Config = args.command {
        let mut stdout = std::io::stdout();
        stdout.write_all(DEFAULT_CONFIG_TEMPLATE.as_bytes())?;
        return Ok(());
    }
    if let Command::Report = args.command {
        println!("{}", report::PREDICTION_REPORT);
        return Ok(());
    }

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(data) = &args.data {
        config.data_path = data.clone();
    }
    if let Some(dir) = &args.chart_dir {
        std::fs::create_dir_all(dir)?;
    }
    let charts = args.chart_dir.as_deref();

    let store = DatasetStore::shared(&config)?;
    let cfg = &config.analysis;

    match &args.command {
        Command::Search(search_args) => {
            run_search(store, &search_args.into(), search_args.page)
        }
        Command::Overview => run_overview(store, cfg, charts),
        Command::Popularity => run_popularity(store, cfg, charts),
        Command::Capacity => run_capacity(store, cfg, charts),
        Command::Source => run_source(store, cfg, charts),
        Command::Isekai => run_isekai(store, cfg, charts),
        Command::Export { output } => run_export(store, output.as_deref()),
        Command::Report | Command::Config => unreachable!(),
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
