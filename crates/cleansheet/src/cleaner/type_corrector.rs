//! Type inference: ordered typed attempts with a success threshold.

use super::converters::{Conversion, to_boolean, to_numeric, to_timestamp};
use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use crate::utils::is_temporal_dtype;
use polars::prelude::*;
use tracing::{debug, warn};

/// A conversion is committed only when strictly more than this share of the
/// non-missing cells convert.
pub const SUCCESS_THRESHOLD: f64 = 0.8;

/// Outcome of inferring one column.
#[derive(Debug, Clone)]
pub enum ColumnInference {
    Numeric(Series),
    Timestamp(Series),
    Boolean(Series),
    /// No attempt cleared the threshold; the column stays as it is.
    Text,
}

impl ColumnInference {
    pub fn into_series(self) -> Option<Series> {
        match self {
            Self::Numeric(s) | Self::Timestamp(s) | Self::Boolean(s) => Some(s),
            Self::Text => None,
        }
    }
}

fn passes(conversion: &Conversion) -> bool {
    conversion.success_ratio > SUCCESS_THRESHOLD
}

/// Infers and converts column types.
pub struct TypeCorrector;

impl TypeCorrector {
    /// Run the attempts on a single column, numeric then timestamp then
    /// boolean. Native boolean and temporal columns are left alone.
    pub fn infer_column(&self, series: &Series) -> Result<ColumnInference> {
        let dtype = series.dtype();
        if dtype == &DataType::Boolean || is_temporal_dtype(dtype) {
            return Ok(ColumnInference::Text);
        }

        let numeric = to_numeric(series)?;
        if passes(&numeric) {
            return Ok(ColumnInference::Numeric(numeric.series));
        }

        let timestamp = to_timestamp(series)?;
        if passes(&timestamp) {
            return Ok(ColumnInference::Timestamp(timestamp.series));
        }

        if let Some(boolean) = to_boolean(series)?
            && passes(&boolean)
        {
            return Ok(ColumnInference::Boolean(boolean.series));
        }

        Ok(ColumnInference::Text)
    }

    /// Convert every column whose inferred type differs from its dtype.
    ///
    /// Logs the number of changed columns with one `old -> new` example.
    pub fn correct_column_types(&self, mut df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
        let column_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut changes: Vec<(String, DataType, DataType)> = Vec::new();

        for col_name in &column_names {
            let series = df.column(col_name)?.as_materialized_series().clone();
            let inferred = match self.infer_column(&series) {
                Ok(inferred) => inferred,
                Err(e) => {
                    warn!("Failed to infer type of '{}': {}", col_name, e);
                    continue;
                }
            };

            let Some(converted) = inferred.into_series() else {
                continue;
            };
            if converted.dtype() == series.dtype() {
                continue;
            }

            let new_dtype = converted.dtype().clone();
            df.replace(col_name, converted)?;
            debug!(
                "Corrected '{}' from {} to {}",
                col_name,
                series.dtype(),
                new_dtype
            );
            changes.push((col_name.clone(), series.dtype().clone(), new_dtype));
        }

        if let Some((name, old, new)) = changes.first() {
            log.info(
                CleaningStage::TypeInference,
                format!(
                    "{} column(s) changed type (e.g. '{}': {} -> {})",
                    changes.len(),
                    name,
                    old,
                    new
                ),
            );
        }
        Ok(df)
    }
}
