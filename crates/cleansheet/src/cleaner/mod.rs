//! Table-level cleaning stages.
//!
//! This module provides the stages that run before outlier handling:
//! - Dropping all-missing rows and columns
//! - Column-name normalization
//! - Text trimming and null-spelling standardization
//! - Exact duplicate removal
//! - Sparse column removal
//! - Type inference

pub mod converters;
mod names;
mod sanitizers;
mod type_corrector;

pub use names::{normalize_column_name, normalize_column_names};
pub use sanitizers::{NULL_SPELLINGS, standardize_cell, standardize_text};
pub use type_corrector::{ColumnInference, SUCCESS_THRESHOLD, TypeCorrector};

use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use crate::utils::first_occurrence_mask;
use polars::prelude::*;
use tracing::debug;

/// Structural cleaning operations on whole rows and columns.
pub struct DataCleaner;

impl DataCleaner {
    /// Drop rows where every cell is missing, then columns where every cell
    /// is missing. Logs the shape change, if any.
    pub fn trim_empty(&self, df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
        let before = df.shape();
        let mut df = df;

        if df.width() > 0 && df.height() > 0 {
            let mut null_counts = vec![0usize; df.height()];
            for col in df.get_columns() {
                let nulls = col.as_materialized_series().is_null();
                for (count, is_null) in null_counts.iter_mut().zip(nulls.into_iter()) {
                    if is_null.unwrap_or(false) {
                        *count += 1;
                    }
                }
            }

            let width = df.width();
            let keep: Vec<bool> = null_counts.iter().map(|&n| n < width).collect();
            if keep.iter().any(|k| !k) {
                let mask = BooleanChunked::from_slice("mask".into(), &keep);
                df = df.filter(&mask)?;
            }
        }

        let height = df.height();
        let empty_columns: Vec<PlSmallStr> = df
            .get_columns()
            .iter()
            .filter(|c| c.null_count() == height)
            .map(|c| c.name().clone())
            .collect();
        if !empty_columns.is_empty() {
            debug!("Dropping empty columns: {:?}", empty_columns);
            df = df.drop_many(empty_columns);
        }

        let after = df.shape();
        if after != before {
            log.info(
                CleaningStage::StructuralTrim,
                format!(
                    "Empty rows and columns removed: shape {:?} -> {:?}",
                    before, after
                ),
            );
        }

        Ok(df)
    }

    /// Remove exact duplicate rows, keeping the first occurrence in order.
    pub fn remove_duplicates(&self, df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
        let keep = first_occurrence_mask(&df)?;
        let duplicates = keep.iter().filter(|k| !**k).count();

        if duplicates == 0 {
            debug!("No duplicate rows found");
            return Ok(df);
        }

        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        let df = df.filter(&mask)?;

        log.important(
            CleaningStage::Deduplication,
            format!("{} duplicate row(s) removed", duplicates),
        );
        debug!("Removed {} duplicate rows", duplicates);

        Ok(df)
    }

    /// Drop columns whose missing fraction is strictly above `threshold`.
    pub fn drop_sparse_columns(
        &self,
        df: DataFrame,
        threshold: f64,
        log: &mut CleaningLog,
    ) -> Result<DataFrame> {
        let height = df.height();
        if height == 0 {
            return Ok(df);
        }

        let sparse: Vec<PlSmallStr> = df
            .get_columns()
            .iter()
            .filter(|c| c.null_count() as f64 / height as f64 > threshold)
            .map(|c| c.name().clone())
            .collect();

        if sparse.is_empty() {
            return Ok(df);
        }

        let names: Vec<String> = sparse.iter().map(|s| s.to_string()).collect();
        log.warning(
            CleaningStage::SparseColumns,
            format!(
                "{} column(s) with more than {:.0}% missing values removed: {}",
                names.len(),
                threshold * 100.0,
                names.join(", ")
            ),
        );
        debug!("Dropping sparse columns: {:?}", names);

        Ok(df.drop_many(sparse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;
    use pretty_assertions::assert_eq;

    // ==================== trim_empty tests ====================

    #[test]
    fn test_trim_empty_rows_then_columns() {
        let df = df![
            "a" => [Some(1), None, Some(3)],
            "b" => [Some("x"), None, None],
            "c" => [None::<f64>, None, None],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.trim_empty(df, &mut log).unwrap();

        assert_eq!(df.shape(), (2, 2));
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].message.contains("(3, 3) -> (2, 2)"));
    }

    #[test]
    fn test_trim_empty_no_change_no_log() {
        let df = df!["a" => [1, 2]].unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.trim_empty(df, &mut log).unwrap();

        assert_eq!(df.shape(), (2, 1));
        assert!(log.is_empty());
    }

    // ==================== remove_duplicates tests ====================

    #[test]
    fn test_remove_duplicates_keeps_first_in_order() {
        let df = df![
            "id" => [1, 2, 1, 3, 2],
            "v" => ["a", "b", "a", "c", "b"],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.remove_duplicates(df, &mut log).unwrap();

        let ids: Vec<Option<i32>> = df
            .column("id")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);
        assert_eq!(log.entries()[0].severity, Severity::Important);
        assert!(log.entries()[0].message.starts_with("2 duplicate"));
    }

    #[test]
    fn test_rows_differing_only_by_missing_are_distinct() {
        let df = df!["a" => [Some(1), None], "b" => [Some(2), Some(2)]].unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.remove_duplicates(df, &mut log).unwrap();

        assert_eq!(df.height(), 2);
        assert!(log.is_empty());
    }

    // ==================== drop_sparse_columns tests ====================

    #[test]
    fn test_sparse_column_above_threshold_dropped() {
        let mostly_missing: Vec<Option<f64>> = (0..10)
            .map(|i| if i == 0 { Some(1.0) } else { None })
            .collect();
        let df = df![
            "keep" => (0..10).collect::<Vec<i32>>(),
            "notes" => mostly_missing,
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.drop_sparse_columns(df, 0.8, &mut log).unwrap();

        assert_eq!(df.width(), 1);
        assert_eq!(log.entries()[0].severity, Severity::Warning);
        assert!(log.entries()[0].message.contains("notes"));
    }

    #[test]
    fn test_sparse_threshold_is_strict() {
        // exactly 80% missing stays at threshold 0.8
        let values: Vec<Option<i32>> = (0..10).map(|i| if i < 2 { Some(i) } else { None }).collect();
        let df = df!["x" => values].unwrap();
        let mut log = CleaningLog::new();

        let df = DataCleaner.drop_sparse_columns(df, 0.8, &mut log).unwrap();

        assert_eq!(df.width(), 1);
        assert!(log.is_empty());
    }
}
