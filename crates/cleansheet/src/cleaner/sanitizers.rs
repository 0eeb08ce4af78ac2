//! Text and null-spelling standardization.

use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use polars::prelude::*;
use tracing::debug;

/// Textual spellings of an absent value, compared after trim + lower-case.
pub const NULL_SPELLINGS: [&str; 7] = ["", "nan", "na", "none", "null", "n/a", "--"];

/// Trim and lower-case a cell; `None` when it spells a missing value.
pub fn standardize_cell(value: &str) -> Option<String> {
    let cleaned = value.trim().to_lowercase();
    if NULL_SPELLINGS.contains(&cleaned.as_str()) {
        None
    } else {
        Some(cleaned)
    }
}

/// Standardize one text column. Returns the new series and how many cells
/// became missing.
pub(crate) fn standardize_text_series(series: &Series) -> Result<(Series, usize)> {
    let str_series = series.str()?;
    let mut replaced = 0;
    let mut values: Vec<Option<String>> = Vec::with_capacity(str_series.len());

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) => {
                let cleaned = standardize_cell(val);
                if cleaned.is_none() {
                    replaced += 1;
                }
                values.push(cleaned);
            }
            None => values.push(None),
        }
    }

    Ok((Series::new(series.name().clone(), values), replaced))
}

/// Trim + lower-case every text column and turn null spellings into missing
/// values. Always logs exactly one entry.
pub fn standardize_text(mut df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
    let text_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect();

    let mut total_replaced = 0;
    for col_name in &text_columns {
        let (cleaned, replaced) = {
            let series = df.column(col_name)?.as_materialized_series();
            standardize_text_series(series)?
        };
        df.replace(col_name, cleaned)?;
        if replaced > 0 {
            debug!("Replaced {} null spellings in '{}'", replaced, col_name);
        }
        total_replaced += replaced;
    }

    log.info(
        CleaningStage::TextStandardization,
        format!(
            "Text standardized in {} text column(s) (trimmed, lower-cased); {} null spelling(s) {:?} converted to missing values",
            text_columns.len(),
            total_replaced,
            NULL_SPELLINGS
        ),
    );

    Ok(df)
}
