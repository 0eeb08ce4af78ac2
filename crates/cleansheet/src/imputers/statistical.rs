//! Statistical imputation methods.
//!
//! Median for numeric columns, first-seen mode for everything else, or row
//! removal.

use crate::config::MissingValueStrategy;
use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use crate::utils::{
    DtypeCategory, fill_boolean_nulls, fill_integer_nulls, fill_numeric_nulls, fill_string_nulls,
    first_mode, get_dtype_category, is_integer_dtype,
};
use polars::prelude::*;
use tracing::{debug, warn};

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Apply `strategy` to every column that still has missing values, in
    /// column order.
    pub fn impute(
        df: &mut DataFrame,
        strategy: MissingValueStrategy,
        log: &mut CleaningLog,
    ) -> Result<()> {
        if strategy == MissingValueStrategy::None {
            debug!("Imputation disabled");
            return Ok(());
        }

        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        for col_name in &column_names {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            if column.null_count() == 0 {
                continue;
            }

            let result = match strategy {
                MissingValueStrategy::RemoveRow => Self::apply_remove_row(df, col_name, log),
                MissingValueStrategy::Auto => {
                    if get_dtype_category(column.dtype()) == DtypeCategory::Numeric {
                        Self::apply_numeric_median(df, col_name, log)
                    } else {
                        Self::apply_mode_imputation(df, col_name, log)
                    }
                }
                MissingValueStrategy::None => Ok(()),
            };

            if let Err(e) = result {
                warn!("Failed to impute '{}': {}", col_name, e);
            }
        }

        Ok(())
    }

    /// Drop rows missing a value in `col_name`.
    pub fn apply_remove_row(
        df: &mut DataFrame,
        col_name: &str,
        log: &mut CleaningLog,
    ) -> Result<()> {
        let mask = df.column(col_name)?.as_materialized_series().is_not_null();
        let before = df.height();
        *df = df.filter(&mask)?;

        log.info(
            CleaningStage::Imputation,
            format!(
                "'{}': {} row(s) with missing values removed (strategy: remove_row)",
                col_name,
                before - df.height()
            ),
        );
        Ok(())
    }

    /// Fill with the median. Integer columns stay integer when the median is
    /// integral.
    pub fn apply_numeric_median(
        df: &mut DataFrame,
        col_name: &str,
        log: &mut CleaningLog,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let Some(median) = series.median() else {
            return Ok(());
        };

        let filled = if is_integer_dtype(series.dtype()) && median.fract() == 0.0 {
            fill_integer_nulls(&series, median as i64)?
        } else {
            fill_numeric_nulls(&series, median)?
        };
        df.replace(col_name, filled)?;

        log.info(
            CleaningStage::Imputation,
            format!(
                "'{}': missing values filled with median ({:.2}) (strategy: auto)",
                col_name, median
            ),
        );
        Ok(())
    }

    /// Fill with the most frequent value; ties go to the value seen first.
    pub fn apply_mode_imputation(
        df: &mut DataFrame,
        col_name: &str,
        log: &mut CleaningLog,
    ) -> Result<()> {
        let series = df.column(col_name)?.as_materialized_series().clone();

        let filled = match get_dtype_category(series.dtype()) {
            DtypeCategory::Text => {
                let Some(mode) = first_mode(series.str()?) else {
                    return Ok(());
                };
                Some((fill_string_nulls(&series, mode)?, format!("'{}'", mode)))
            }
            DtypeCategory::Boolean => {
                let Some(mode) = first_mode(series.bool()?) else {
                    return Ok(());
                };
                Some((fill_boolean_nulls(&series, mode)?, mode.to_string()))
            }
            DtypeCategory::Temporal => {
                let physical = series.cast(&DataType::Int64)?;
                let Some(mode) = first_mode(physical.i64()?) else {
                    return Ok(());
                };
                let filled = fill_integer_nulls(&physical, mode)?.cast(series.dtype())?;
                let shown = Series::new("mode".into(), [mode])
                    .cast(series.dtype())?
                    .get(0)?
                    .to_string();
                Some((filled, shown))
            }
            DtypeCategory::Numeric | DtypeCategory::Other => None,
        };

        let Some((filled, shown)) = filled else {
            debug!("No mode imputation for '{}' ({})", col_name, series.dtype());
            return Ok(());
        };
        df.replace(col_name, filled)?;

        log.info(
            CleaningStage::Imputation,
            format!(
                "'{}': missing values filled with most frequent value ({}) (strategy: auto)",
                col_name, shown
            ),
        );
        Ok(())
    }
}
