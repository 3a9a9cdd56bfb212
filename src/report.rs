//! The pre-trained prediction report, bundled as a fixed narrative artifact.
//! It reflects a one-time offline modeling run and is never recomputed.

pub const PREDICTION_REPORT: &str = include_str!("../assets/prediction_report.md");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_bundled() {
        assert!(PREDICTION_REPORT.contains("Random Forest Regressor"));
        assert!(PREDICTION_REPORT.contains("Top 10 Predicted Popularity"));
    }
}
