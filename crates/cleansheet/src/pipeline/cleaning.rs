//! The eight-stage cleaning pipeline.

use crate::cleaner::{DataCleaner, TypeCorrector, normalize_column_names, standardize_text};
use crate::config::CleaningConfig;
use crate::error::{Result, ResultExt};
use crate::imputers::StatisticalImputer;
use crate::pipeline::outliers::OutlierHandler;
use crate::types::{CleaningLog, CleaningOutcome, CleaningStage};
use polars::prelude::*;
use tracing::{debug, info, warn};

/// Runs the cleaning stages in order over one table.
///
/// The pipeline holds only its configuration, so one instance can clean any
/// number of tables, from any thread.
///
/// # Example
///
/// ```rust,ignore
/// use cleansheet::{CleaningConfig, CleaningPipeline};
///
/// let outcome = CleaningPipeline::new(CleaningConfig::default()).clean(df)?;
/// for entry in &outcome.log {
///     println!("{}", entry);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CleaningPipeline {
    config: CleaningConfig,
}

static_assertions::assert_impl_all!(CleaningPipeline: Send, Sync);

impl CleaningPipeline {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a table that may be absent.
    pub fn clean_optional(&self, df: Option<DataFrame>) -> Result<CleaningOutcome> {
        match df {
            Some(df) => self.clean(df),
            None => Ok(Self::empty_outcome(0, 0)),
        }
    }

    /// Clean `df` and return the cleaned table with its log.
    ///
    /// An input without rows or without columns yields an empty table and a
    /// single log entry. Only dataframe-engine failures are errors.
    pub fn clean(&self, df: DataFrame) -> Result<CleaningOutcome> {
        let (rows_before, columns_before) = df.shape();
        if rows_before == 0 || columns_before == 0 {
            warn!("Input table is empty ({} x {})", rows_before, columns_before);
            return Ok(Self::empty_outcome(rows_before, columns_before));
        }

        info!(
            "Cleaning table with {} rows and {} columns",
            rows_before, columns_before
        );
        debug!("Config: {:?}", self.config);

        let mut log = CleaningLog::new();
        let cleaner = DataCleaner;

        info!("Step 1: {}", CleaningStage::StructuralTrim.display_name());
        let df = cleaner
            .trim_empty(df, &mut log)
            .context("Structural trim")?;

        info!("Step 2: {}", CleaningStage::ColumnNames.display_name());
        let df = normalize_column_names(df, &mut log).context("Column-name normalization")?;

        info!("Step 3: {}", CleaningStage::TextStandardization.display_name());
        let df = standardize_text(df, &mut log).context("Text standardization")?;

        info!("Step 4: {}", CleaningStage::Deduplication.display_name());
        let df = cleaner
            .remove_duplicates(df, &mut log)
            .context("Duplicate removal")?;

        info!("Step 5: {}", CleaningStage::SparseColumns.display_name());
        let df = cleaner
            .drop_sparse_columns(df, self.config.missing_col_threshold, &mut log)
            .context("Sparse column removal")?;

        info!("Step 6: {}", CleaningStage::TypeInference.display_name());
        let mut df = TypeCorrector
            .correct_column_types(df, &mut log)
            .context("Type inference")?;

        info!("Step 7: {}", CleaningStage::OutlierHandling.display_name());
        OutlierHandler::handle_outliers(
            &mut df,
            self.config.outlier_strategy,
            self.config.iqr_multiplier,
            &mut log,
        )
        .context("Outlier handling")?;

        info!("Step 8: {}", CleaningStage::Imputation.display_name());
        StatisticalImputer::impute(&mut df, self.config.missing_value_strategy, &mut log)
            .context("Imputation")?;

        log.success(
            CleaningStage::Complete,
            format!("Cleaning complete. Final table shape: {:?}", df.shape()),
        );
        info!(
            "Cleaning complete: {:?} -> {:?}, {} log entries",
            (rows_before, columns_before),
            df.shape(),
            log.len()
        );

        Ok(CleaningOutcome {
            table: df,
            log,
            rows_before,
            columns_before,
        })
    }

    fn empty_outcome(rows_before: usize, columns_before: usize) -> CleaningOutcome {
        let mut log = CleaningLog::new();
        log.warning(
            CleaningStage::Input,
            "The input table is empty; nothing to clean",
        );
        CleaningOutcome {
            table: DataFrame::empty(),
            log,
            rows_before,
            columns_before,
        }
    }
}

/// Clean `df` with `config`.
pub fn clean(df: DataFrame, config: &CleaningConfig) -> Result<CleaningOutcome> {
    CleaningPipeline::new(config.clone()).clean(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MissingValueStrategy, OutlierStrategy};
    use crate::types::Severity;
    use pretty_assertions::assert_eq;

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_empty_table_gives_single_log_entry() {
        let outcome = CleaningPipeline::default().clean(DataFrame::empty()).unwrap();
        assert_eq!(outcome.table.shape(), (0, 0));
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn test_absent_table_gives_single_log_entry() {
        let outcome = CleaningPipeline::default().clean_optional(None).unwrap();
        assert_eq!(outcome.table.height(), 0);
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn test_zero_row_table_is_empty_input() {
        let df = df!["a" => Vec::<i64>::new()].unwrap();
        let outcome = CleaningPipeline::default().clean(df).unwrap();
        assert_eq!(outcome.table.width(), 0);
        assert_eq!(outcome.log.len(), 1);
    }

    #[test]
    fn test_full_run_orders_log_and_ends_with_success() {
        let df = df![
            " Product Name " => ["Widget", "widget ", "Gadget", "N/A", "Gizmo"],
            "Price" => ["10", "10", "12.5", "11", "1000"],
            "In Stock" => [Some("yes"), Some("yes"), Some("no"), Some("yes"), None],
        ]
        .unwrap();
        let config = CleaningConfig::builder()
            .outlier_strategy(OutlierStrategy::Cap)
            .build()
            .unwrap();

        let outcome = clean(df, &config).unwrap();

        assert_eq!(column_names(&outcome.table), vec!["product_name", "price", "in_stock"]);
        // "widget " duplicates "Widget" only after standardization
        assert_eq!(outcome.table.height(), 4);
        assert_eq!(outcome.table.column("price").unwrap().dtype(), &DataType::Float64);
        assert_eq!(outcome.table.column("in_stock").unwrap().dtype(), &DataType::Boolean);

        let last = outcome.log.entries().last().unwrap();
        assert_eq!(last.severity, Severity::Success);
        assert!(last.message.contains("(4, 3)"));

        let stages: Vec<CleaningStage> = outcome.log.iter().map(|e| e.stage).collect();
        let mut sorted = stages.clone();
        sorted.sort_by_key(|s| *s as u8);
        assert_eq!(stages, sorted);
    }

    #[test]
    fn test_none_strategies_keep_missing_values() {
        let df = df!["v" => [Some(1.0), None, Some(2.0), Some(3.0)]].unwrap();
        let config = CleaningConfig::builder()
            .missing_value_strategy(MissingValueStrategy::None)
            .outlier_strategy(OutlierStrategy::None)
            .build()
            .unwrap();

        let outcome = clean(df, &config).unwrap();

        assert_eq!(outcome.table.column("v").unwrap().null_count(), 1);
    }
}
