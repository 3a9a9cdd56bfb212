//! Missing-value normalization for the browse/search path. This fill policy
//! substitutes sentinels so that every row stays searchable; the analytics
//! path drops unusable rows instead, and the two policies stay separate.

use crate::error::{Error, Result};
use polars::prelude::*;

const CATEGORICAL_FILL: [&str; 5] = ["genres", "season", "format", "status", "source"];
const NUMERIC_FILL: [&str; 3] = ["seasonYear", "episodes", "duration"];
const TEXT_FILL: [&str; 2] = ["tags", "mainStudio"];

/// Fill missing values per the browse policy: categoricals become `"Any"`,
/// numerics `0`, free text `""`, and `averageScore` falls back to
/// `meanScore` before defaulting to `0`.
pub fn fill_missing_for_browse(df: DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Err(Error::InvalidInput("dataset is empty".to_string()));
    }

    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let has = |name: &str| columns.iter().any(|c| c == name);

    let mut exprs: Vec<Expr> = Vec::new();
    for name in CATEGORICAL_FILL {
        if has(name) {
            exprs.push(col(name).cast(DataType::String).fill_null(lit("Any")));
        }
    }
    for name in NUMERIC_FILL {
        if has(name) {
            exprs.push(col(name).cast(DataType::Int64).fill_null(lit(0i64)));
        }
    }
    for name in TEXT_FILL {
        if has(name) {
            exprs.push(col(name).cast(DataType::String).fill_null(lit("")));
        }
    }
    if has("averageScore") {
        let score = if has("meanScore") {
            coalesce(&[col("averageScore"), col("meanScore")])
        } else {
            col("averageScore")
        };
        exprs.push(
            score
                .cast(DataType::Float64)
                .fill_null(lit(0.0))
                .alias("averageScore"),
        );
    }

    let filled = df.lazy().with_columns(exprs).collect()?;
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_invalid_input() {
        let df = df! { "id" => Vec::<i64>::new() }.unwrap();
        assert!(matches!(
            fill_missing_for_browse(df),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn fills_sentinels_per_column_class() {
        let df = df! {
            "id" => [1i64, 2],
            "format" => [Some("TV"), None],
            "seasonYear" => [Some(2020i64), None],
            "tags" => [None::<&str>, Some("Isekai")],
            "averageScore" => [None::<f64>, None],
            "meanScore" => [Some(61.0), None],
        }
        .unwrap();

        let filled = fill_missing_for_browse(df).unwrap();
        let formats = filled.column("format").unwrap().str().unwrap();
        assert_eq!(formats.get(1), Some("Any"));
        let years = filled.column("seasonYear").unwrap().i64().unwrap();
        assert_eq!(years.get(1), Some(0));
        let tags = filled.column("tags").unwrap().str().unwrap();
        assert_eq!(tags.get(0), Some(""));
        let scores = filled.column("averageScore").unwrap().f64().unwrap();
        assert_eq!(scores.get(0), Some(61.0));
        assert_eq!(scores.get(1), Some(0.0));
    }
}
