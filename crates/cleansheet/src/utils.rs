//! Shared helpers for the cleaning stages and the report builder.

use polars::prelude::*;
use std::collections::HashMap;
use std::hash::Hash;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for cleaning purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date, datetime, duration or time
    Temporal,
    /// Boolean type
    Boolean,
    /// String/text type
    Text,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    is_integer_dtype(dtype) || matches!(dtype, DataType::Float32 | DataType::Float64)
}

#[inline]
pub fn is_integer_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Check if a DataType is temporal.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time | DataType::Duration(_)
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_temporal_dtype(dtype) {
        DtypeCategory::Temporal
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String) {
        DtypeCategory::Text
    } else {
        DtypeCategory::Other
    }
}

/// Names of the numeric columns, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<PlSmallStr> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().clone())
        .collect()
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Quantile of already sorted data with linear interpolation between the two
/// nearest order statistics.
///
/// For `[1, 2, 3, 4, 5, 100]` this gives Q1 = 2.25 and Q3 = 4.75.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = pos - lower as f64;
        sorted[lower] + (sorted[upper] - sorted[lower]) * weight
    }
}

/// Non-missing, non-NaN values of a numeric series as `f64`.
pub fn finite_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let floats = series.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .into_iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Most frequent value; ties go to the value seen first.
///
/// Missing values are skipped. Returns `None` when nothing is present.
pub fn first_mode<T, I>(values: I) -> Option<T>
where
    T: Hash + Eq + Clone,
    I: IntoIterator<Item = Option<T>>,
{
    // value -> (count, first position)
    let mut counts: HashMap<T, (usize, usize)> = HashMap::new();
    for (idx, value) in values.into_iter().enumerate() {
        if let Some(value) = value {
            counts.entry(value).or_insert((0, idx)).0 += 1;
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(value, _)| value)
}

// =============================================================================
// Row Utilities
// =============================================================================

/// One string key per row, equal exactly when the rows are identical.
///
/// Each cell is rendered as text and length-prefixed so that values
/// containing the separator can not collide; missing cells get their own
/// marker distinct from any text.
pub fn row_fingerprints(df: &DataFrame) -> PolarsResult<Vec<String>> {
    let mut keys = vec![String::new(); df.height()];
    for column in df.get_columns() {
        let rendered = column.as_materialized_series().cast(&DataType::String)?;
        for (key, value) in keys.iter_mut().zip(rendered.str()?) {
            match value {
                Some(v) => {
                    key.push_str(&v.len().to_string());
                    key.push(':');
                    key.push_str(v);
                }
                None => key.push('\u{0}'),
            }
            key.push('\u{1f}');
        }
    }
    Ok(keys)
}

/// Mask marking the first occurrence of every distinct row.
pub fn first_occurrence_mask(df: &DataFrame) -> PolarsResult<Vec<bool>> {
    let mut seen = std::collections::HashSet::new();
    Ok(row_fingerprints(df)?
        .into_iter()
        .map(|key| seen.insert(key))
        .collect())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a float, producing `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in an integer Series, producing `Int64`.
pub fn fill_integer_nulls(series: &Series, fill_value: i64) -> PolarsResult<Series> {
    let ints = series.cast(&DataType::Int64)?;
    let values: Vec<Option<i64>> = ints
        .i64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let values: Vec<Option<&str>> = series
        .str()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a boolean Series with a specific value.
pub fn fill_boolean_nulls(series: &Series, fill_value: bool) -> PolarsResult<Series> {
    let values: Vec<Option<bool>> = series
        .bool()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Up to `max_samples` distinct non-null values, in first-seen order.
pub fn distinct_sample_values(series: &Series, max_samples: usize) -> Vec<String> {
    let mut samples: Vec<String> = Vec::with_capacity(max_samples);
    let Ok(rendered) = series.cast(&DataType::String) else {
        return samples;
    };
    let Ok(values) = rendered.str() else {
        return samples;
    };
    for value in values.into_iter().flatten() {
        if samples.len() >= max_samples {
            break;
        }
        if !samples.iter().any(|s| s == value) {
            samples.push(value.to_string());
        }
    }
    samples
}

// =============================================================================
// Tests
// =============================================================================
