//! Chart rendering to PNG via the plotters bitmap backend. The binary feeds
//! aggregation results in here; nothing in this module computes statistics.

use color_eyre::Result;
use plotters::prelude::*;
use std::path::Path;

const CHART_SIZE: (u32, u32) = (640, 480);

const PALETTE: [RGBColor; 7] = [
    CYAN,
    MAGENTA,
    GREEN,
    YELLOW,
    BLUE,
    RED,
    RGBColor(128, 255, 255),
];

/// One named series of (x, y) points.
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

fn y_span(series: &[ChartSeries]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for s in series {
        for &(_, y) in &s.points {
            min = min.min(y);
            max = max.max(y);
        }
    }
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min.min(0.0), max * 1.05)
    }
}

/// Grouped bars over a categorical x-axis: one bar per series per category,
/// category labels drawn on the axis.
pub fn write_category_bars_png(
    path: &Path,
    labels: &[String],
    series: &[ChartSeries],
    y_label: &str,
) -> Result<()> {
    if labels.is_empty() || series.iter().all(|s| s.points.is_empty()) {
        return Err(color_eyre::eyre::eyre!("No data to render"));
    }

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (_, y_max) = y_span(series);
    let labels = labels.to_vec();
    let n = labels.len();

    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| {
            let i = v.round() as i64;
            if i >= 0 && (i as usize) < labels.len() && (v - i as f64).abs() < 0.25 {
                labels[i as usize].clone()
            } else {
                String::new()
            }
        })
        .y_desc(y_label)
        .draw()?;

    // Bars for each series sit side by side within the category slot.
    let group_width = 0.8 / series.len() as f64;
    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let offset = -0.4 + idx as f64 * group_width;
        chart
            .draw_series(s.points.iter().map(|&(x, y)| {
                let x0 = x + offset;
                let x1 = x0 + group_width * 0.9;
                Rectangle::new([(x0, 0.0), (x1, y)], color.filled())
            }))?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 12, y + 4)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Line chart of one or more series over a numeric x-axis (years, scores).
pub fn write_line_series_png(
    path: &Path,
    series: &[ChartSeries],
    x_label: &str,
    y_label: &str,
) -> Result<()> {
    if series.iter().all(|s| s.points.is_empty()) {
        return Err(color_eyre::eyre::eyre!("No data to render"));
    }

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for s in series {
        for &(x, _) in &s.points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
        }
    }
    if x_min == x_max {
        x_min -= 0.5;
        x_max += 0.5;
    }
    let (y_min, y_max) = y_span(series);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_label_formatter(&|v| format!("{:.0}", v))
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = PALETTE[idx % PALETTE.len()];
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Scatter of (x, y) points, one color per series.
pub fn write_scatter_png(
    path: &Path,
    series: &[ChartSeries],
    x_label: &str,
    y_label: &str,
) -> Result<()> {
    if series.iter().all(|s| s.points.is_empty()) {
        return Err(color_eyre::eyre::eyre!("No data to render"));
    }

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    for s in series {
        for &(x, _) in &s.points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
        }
    }
    if x_min == x_max {
        x_min -= 0.5;
        x_max += 0.5;
    }
    let (y_min, y_max) = y_span(series);

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        if s.points.is_empty() {
            continue;
        }
        let color = PALETTE[idx % PALETTE.len()];
        chart
            .draw_series(PointSeries::of_element(
                s.points.iter().copied(),
                3,
                color,
                &|c, size, _| EmptyElement::at(c) + Circle::new((0, 0), size, color.filled()),
            ))?
            .label(s.name.as_str())
            .legend(move |(x, y)| Circle::new((x + 10, y), 3, color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("chart.png");
        let result = write_line_series_png(&path, &[], "x", "y");
        assert!(result.is_err());
    }

    #[test]
    fn writes_a_png_file() {
        let series = vec![ChartSeries {
            name: "s1".to_string(),
            points: vec![(2016.0, 1.0), (2017.0, 2.0), (2018.0, 1.5)],
        }];
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("chart.png");
        write_line_series_png(&path, &series, "year", "count").expect("write png");

        let bytes = std::fs::read(&path).expect("read");
        // PNG magic number.
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn category_bars_render_grouped_series() {
        let labels: Vec<String> = ["1-12 eps", "13-24 eps"].iter().map(|s| s.to_string()).collect();
        let series = vec![
            ChartSeries {
                name: "high".to_string(),
                points: vec![(0.0, 40.0), (1.0, 60.0)],
            },
            ChartSeries {
                name: "normal".to_string(),
                points: vec![(0.0, 70.0), (1.0, 30.0)],
            },
        ];
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bars.png");
        write_category_bars_png(&path, &labels, &series, "percent").expect("write png");
        assert!(path.exists());
    }
}
