//! Typed conversion attempts used by type inference.
//!
//! Every attempt returns the converted series together with its success
//! ratio: converted non-missing cells over original non-missing cells.
//! Cells that fail to convert become missing in the converted series.

use crate::error::Result;
use crate::utils::is_numeric_dtype;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::HashSet;

/// Tokens accepted as boolean true, compared after trim + lower-case.
pub const BOOLEAN_TRUE_TOKENS: [&str; 4] = ["true", "1", "yes", "oui"];
/// Tokens accepted as boolean false, compared after trim + lower-case.
pub const BOOLEAN_FALSE_TOKENS: [&str; 4] = ["false", "0", "no", "non"];

const DATETIME_FORMATS: [&str; 14] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y",
];

/// A column converted by one typed attempt.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub series: Series,
    /// Converted non-missing / original non-missing, `0.0` when the column
    /// holds no values.
    pub success_ratio: f64,
}

fn ratio(converted: usize, original: usize) -> f64 {
    if original == 0 {
        0.0
    } else {
        converted as f64 / original as f64
    }
}

fn non_null(series: &Series) -> usize {
    series.len() - series.null_count()
}

// ============================================================================
// Numeric
// ============================================================================

/// Parse a decimal or scientific number. Infinities and NaN are rejected.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Narrow floats to `Int64` when every present value is integral.
fn narrow_numeric(name: PlSmallStr, values: Vec<Option<f64>>) -> Series {
    let all_integral = values.iter().flatten().all(|v| {
        v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64
    });

    if all_integral {
        let ints: Vec<Option<i64>> = values.iter().map(|v| v.map(|x| x as i64)).collect();
        Series::new(name, ints)
    } else {
        Series::new(name, values)
    }
}

/// Convert a column to numbers, `Int64` when every value is integral and
/// `Float64` otherwise.
///
/// Numeric columns pass trivially; text columns are parsed cell by cell.
/// Any other dtype has a success ratio of zero.
pub fn to_numeric(series: &Series) -> Result<Conversion> {
    let original = non_null(series);

    let values: Vec<Option<f64>> = if is_numeric_dtype(series.dtype()) {
        series.cast(&DataType::Float64)?.f64()?.into_iter().collect()
    } else if series.dtype() == &DataType::String {
        series
            .str()?
            .into_iter()
            .map(|opt| opt.and_then(parse_number))
            .collect()
    } else {
        return Ok(Conversion {
            series: series.clone(),
            success_ratio: 0.0,
        });
    };

    let converted = values.iter().flatten().count();
    Ok(Conversion {
        series: narrow_numeric(series.name().clone(), values),
        success_ratio: ratio(converted, original),
    })
}

// ============================================================================
// Timestamp
// ============================================================================

/// Parse a date or date-time to epoch milliseconds (naive values are UTC).
pub fn parse_timestamp_millis(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format)
            && let Some(dt) = date.and_hms_opt(0, 0, 0)
        {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    None
}

/// Convert a text column to `Datetime(ms)`.
pub fn to_timestamp(series: &Series) -> Result<Conversion> {
    if series.dtype() != &DataType::String {
        return Ok(Conversion {
            series: series.clone(),
            success_ratio: 0.0,
        });
    }

    let original = non_null(series);
    let millis: Vec<Option<i64>> = series
        .str()?
        .into_iter()
        .map(|opt| opt.and_then(parse_timestamp_millis))
        .collect();
    let converted = millis.iter().flatten().count();

    let timestamps = Series::new(series.name().clone(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

    Ok(Conversion {
        series: timestamps,
        success_ratio: ratio(converted, original),
    })
}

// ============================================================================
// Boolean
// ============================================================================

/// Map a boolean token to its value.
pub fn parse_boolean_token(value: &str) -> Option<bool> {
    let cleaned = value.trim().to_lowercase();
    if BOOLEAN_TRUE_TOKENS.contains(&cleaned.as_str()) {
        Some(true)
    } else if BOOLEAN_FALSE_TOKENS.contains(&cleaned.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Convert a text column to `Boolean`.
///
/// Returns `None` when the column has more than two distinct values or any
/// value outside the token sets; there is no partial boolean conversion.
pub fn to_boolean(series: &Series) -> Result<Option<Conversion>> {
    if series.dtype() != &DataType::String {
        return Ok(None);
    }

    let str_series = series.str()?;
    let distinct: HashSet<String> = str_series
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_lowercase())
        .collect();

    if distinct.is_empty()
        || distinct.len() > 2
        || distinct.iter().any(|v| parse_boolean_token(v).is_none())
    {
        return Ok(None);
    }

    let values: Vec<Option<bool>> = str_series
        .into_iter()
        .map(|opt| opt.and_then(parse_boolean_token))
        .collect();

    Ok(Some(Conversion {
        series: Series::new(series.name().clone(), values),
        success_ratio: 1.0,
    }))
}
