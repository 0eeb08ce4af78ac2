//! Outlier handling module.
//!
//! Detects values outside the Tukey fences `[Q1 - m*IQR, Q3 + m*IQR]` in
//! numeric columns and flags, caps or removes them.

use crate::config::OutlierStrategy;
use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use crate::utils::{finite_values, numeric_column_names, quantile_sorted};
use polars::prelude::*;
use tracing::{debug, warn};

/// Suffix of the boolean column added by the flag strategy.
pub const OUTLIER_FLAG_SUFFIX: &str = "_outlier";

/// Lower and upper IQR fences of a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Compute fences from raw values; `None` when there are no values.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Per-row outlier flags; missing cells are never outliers.
    pub fn outlier_mask(&self, series: &Series) -> Result<Vec<bool>> {
        let floats = series.cast(&DataType::Float64)?;
        Ok(floats
            .f64()?
            .into_iter()
            .map(|v| v.is_some_and(|x| !x.is_nan() && !self.contains(x)))
            .collect())
    }
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Apply `strategy` to every numeric column present when the stage
    /// starts. Later columns see rows already removed by earlier ones.
    pub fn handle_outliers(
        df: &mut DataFrame,
        strategy: OutlierStrategy,
        multiplier: f64,
        log: &mut CleaningLog,
    ) -> Result<()> {
        if strategy == OutlierStrategy::None {
            debug!("Outlier handling disabled");
            return Ok(());
        }

        for col_name in numeric_column_names(df) {
            if let Err(e) = Self::handle_column(df, &col_name, strategy, multiplier, log) {
                warn!("Failed to handle outliers in '{}': {}", col_name, e);
            }
        }

        Ok(())
    }

    fn handle_column(
        df: &mut DataFrame,
        col_name: &str,
        strategy: OutlierStrategy,
        multiplier: f64,
        log: &mut CleaningLog,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let values = finite_values(&series)?;
        let Some(bounds) = IqrBounds::from_values(&values, multiplier) else {
            return Ok(());
        };

        let mask = bounds.outlier_mask(&series)?;
        let count = mask.iter().filter(|m| **m).count();
        debug!(
            "'{}': Q1={}, Q3={}, bounds=[{}, {}], outliers={}",
            col_name, bounds.q1, bounds.q3, bounds.lower, bounds.upper, count
        );

        match strategy {
            OutlierStrategy::Flag => {
                if count > 0 {
                    Self::flag_outliers(df, col_name, &mask)?;
                    log.info(
                        CleaningStage::OutlierHandling,
                        format!(
                            "'{}': {} outlier(s) outside [{}, {}] flagged in '{}{}'",
                            col_name, count, bounds.lower, bounds.upper, col_name, OUTLIER_FLAG_SUFFIX
                        ),
                    );
                }
            }
            OutlierStrategy::Remove => {
                if count > 0 {
                    let keep: Vec<bool> = mask.iter().map(|m| !m).collect();
                    let keep = BooleanChunked::from_slice("mask".into(), &keep);
                    *df = df.filter(&keep)?;
                    log.important(
                        CleaningStage::OutlierHandling,
                        format!(
                            "'{}': {} row(s) with outliers outside [{}, {}] removed",
                            col_name, count, bounds.lower, bounds.upper
                        ),
                    );
                }
            }
            OutlierStrategy::Cap => {
                if count > 0 {
                    let floats = series.cast(&DataType::Float64)?;
                    let capped = floats
                        .f64()?
                        .apply(|v| v.map(|x| if x.is_nan() { x } else { x.clamp(bounds.lower, bounds.upper) }));
                    df.replace(col_name, capped.into_series())?;
                    log.info(
                        CleaningStage::OutlierHandling,
                        format!(
                            "'{}': {} outlier(s) capped to [{}, {}]",
                            col_name, count, bounds.lower, bounds.upper
                        ),
                    );
                }
            }
            OutlierStrategy::None => {}
        }

        Ok(())
    }

    /// Add or overwrite the `<name>_outlier` boolean column.
    fn flag_outliers(df: &mut DataFrame, col_name: &str, mask: &[bool]) -> Result<()> {
        let flag_name = format!("{}{}", col_name, OUTLIER_FLAG_SUFFIX);
        let flags = Series::new(flag_name.into(), mask);
        df.with_column(flags)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn values_frame() -> DataFrame {
        df![
            "value" => [1i64, 2, 3, 4, 5, 100],
            "label" => ["a", "b", "c", "d", "e", "f"],
        ]
        .unwrap()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    // ==================== IqrBounds tests ====================

    #[test]
    fn test_iqr_bounds_match_linear_quartiles() {
        let bounds = IqrBounds::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0], 1.5).unwrap();
        assert!((bounds.q1 - 2.25).abs() < 1e-12);
        assert!((bounds.q3 - 4.75).abs() < 1e-12);
        assert!((bounds.lower - -1.5).abs() < 1e-12);
        assert!((bounds.upper - 8.5).abs() < 1e-12);
    }

    #[test]
    fn test_iqr_bounds_unsorted_input() {
        let bounds = IqrBounds::from_values(&[100.0, 3.0, 1.0, 5.0, 2.0, 4.0], 1.5).unwrap();
        assert!((bounds.upper - 8.5).abs() < 1e-12);
        assert!(IqrBounds::from_values(&[], 1.5).is_none());
    }

    #[test]
    fn test_outlier_mask_ignores_missing() {
        let bounds = IqrBounds::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0], 1.5).unwrap();
        let series = Series::new("v".into(), &[Some(1.0), None, Some(100.0)]);
        assert_eq!(bounds.outlier_mask(&series).unwrap(), vec![false, false, true]);
    }

    // ==================== handle_outliers tests ====================

    #[test]
    fn test_flag_adds_boolean_column() {
        let mut df = values_frame();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Flag, 1.5, &mut log).unwrap();

        let flags: Vec<Option<bool>> = df
            .column("value_outlier")
            .unwrap()
            .as_materialized_series()
            .bool()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            flags,
            vec![Some(false), Some(false), Some(false), Some(false), Some(false), Some(true)]
        );
        assert_eq!(floats(&df, "value"), vec![1.0, 2.0, 3.0, 4.0, 5.0, 100.0]);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_cap_clamps_to_upper_bound() {
        let mut df = values_frame();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Cap, 1.5, &mut log).unwrap();

        assert_eq!(df.shape(), (6, 2));
        assert_eq!(floats(&df, "value"), vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.5]);
        assert_eq!(log.entries()[0].severity, Severity::Info);
    }

    #[test]
    fn test_remove_drops_outlier_rows() {
        let mut df = values_frame();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Remove, 1.5, &mut log).unwrap();

        assert_eq!(df.height(), 5);
        assert_eq!(floats(&df, "value"), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(log.entries()[0].severity, Severity::Important);
    }

    #[test]
    fn test_remove_applies_columns_in_sequence() {
        let mut df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 3.0],
            "b" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 50.0],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Remove, 1.5, &mut log).unwrap();

        // Fences for 'b' come from the five rows left after 'a' dropped one
        assert_eq!(df.height(), 5);
        assert_eq!(floats(&df, "b"), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(log.len(), 2);
        assert!(log.entries().iter().all(|e| e.severity == Severity::Important));
        assert!(log.entries()[0].message.contains("'a': 1 row(s)"));
        assert!(log.entries()[0].message.contains("[-0.5, 7.5]"));
        assert!(log.entries()[1].message.contains("'b': 1 row(s)"));
        assert!(log.entries()[1].message.contains("[-1.5, 8.5]"));
    }

    #[test]
    fn test_remove_keeps_rows_with_missing_values() {
        let mut df = df!["v" => [Some(1.0), None, Some(2.0), Some(3.0), Some(1000.0)]].unwrap();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Remove, 1.5, &mut log).unwrap();

        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_none_strategy_is_noop() {
        let mut df = values_frame();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::None, 1.5, &mut log).unwrap();

        assert_eq!(df.shape(), (6, 2));
        assert!(log.is_empty());
    }

    #[test]
    fn test_no_log_without_outliers() {
        let mut df = df!["v" => [1.0, 2.0, 3.0]].unwrap();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Cap, 1.5, &mut log).unwrap();

        assert!(log.is_empty());
        assert_eq!(df.column("v").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_flag_skipped_without_outliers() {
        let mut df = df!["v" => [1.0, 2.0, 3.0]].unwrap();
        let mut log = CleaningLog::new();

        OutlierHandler::handle_outliers(&mut df, OutlierStrategy::Flag, 1.5, &mut log).unwrap();

        assert_eq!(df.width(), 1);
    }
}
