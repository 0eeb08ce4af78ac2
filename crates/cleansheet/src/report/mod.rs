//! Analysis report built from a cleaned table.
//!
//! The report carries everything a consumer needs to render a summary of
//! the data: shape, per-variable examples, missing values, descriptive
//! statistics, frequencies, correlations and bivariate significance tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use cleansheet::report::ReportBuilder;
//!
//! let report = ReportBuilder::build(&outcome.table);
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

mod statistics;

pub use statistics::{
    NumericSummary, SIGNIFICANCE_LEVEL, SignificanceTest, chi_square_test, one_way_anova, pearson,
    students_t_test,
};

use crate::utils::{distinct_sample_values, finite_values, first_occurrence_mask, is_numeric_dtype};
use anyhow::Result;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Example values listed per variable.
const EXAMPLE_VALUES: usize = 3;
/// Values listed per categorical column before the rest is folded.
const TOP_VALUES: usize = 5;
/// Correlation pairs kept, strongest first.
const TOP_CORRELATIONS: usize = 5;
/// Minimum pairwise-complete rows for a correlation.
const MIN_CORRELATION_ROWS: usize = 3;

// ============================================================================
// Report Types
// ============================================================================

/// Full analysis of one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Local time the report was generated, RFC 3339
    pub generated_at: String,
    pub rows: usize,
    pub columns: usize,
    pub variables: Vec<VariableInfo>,
    /// Rows repeating an earlier row
    pub duplicate_rows: usize,
    /// Columns with at least one missing value
    pub missing_values: BTreeMap<String, MissingValues>,
    pub numeric_summary: Vec<ColumnSummary>,
    pub categorical_frequencies: Vec<CategoricalFrequencies>,
    pub correlations: Vec<Correlation>,
    pub significance_tests: Vec<SignificanceTest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub dtype: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValues {
    pub count: usize,
    /// Share of rows, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub column: String,
    #[serde(flatten)]
    pub summary: NumericSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrequency {
    pub value: String,
    pub count: usize,
    /// Share of non-missing values, 0-1
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalFrequencies {
    pub column: String,
    pub top_values: Vec<ValueFrequency>,
    /// Number of distinct values beyond the top ones
    pub other_values: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub column_x: String,
    pub column_y: String,
    pub r: f64,
}

// ============================================================================
// Report Builder
// ============================================================================

/// Builds [`AnalysisReport`]s. Columns that cannot be analysed are skipped.
pub struct ReportBuilder;

impl ReportBuilder {
    pub fn build(df: &DataFrame) -> AnalysisReport {
        let (rows, columns) = df.shape();
        debug!("Building report for table of shape {:?}", (rows, columns));

        let numeric = numeric_columns(df);
        let text = text_columns(df);

        let mut significance_tests = Vec::new();
        for (num_name, num_values) in &numeric {
            for (cat_name, cat_values) in &text {
                significance_tests.extend(group_test(num_name, num_values, cat_name, cat_values));
            }
        }
        for (i, (name_a, values_a)) in text.iter().enumerate() {
            for (name_b, values_b) in &text[i + 1..] {
                let table = contingency_table(values_a, values_b);
                significance_tests.extend(chi_square_test((name_a.as_str(), name_b.as_str()), &table));
            }
        }

        AnalysisReport {
            generated_at: Local::now().to_rfc3339(),
            rows,
            columns,
            variables: variables(df),
            duplicate_rows: duplicate_rows(df),
            missing_values: missing_values(df),
            numeric_summary: numeric_summary(df),
            categorical_frequencies: text
                .iter()
                .map(|(name, values)| categorical_frequencies(name, values))
                .collect(),
            correlations: correlations(&numeric),
            significance_tests,
        }
    }

    /// Write `report` as pretty JSON, creating parent directories.
    pub fn write_report_to_file(report: &AnalysisReport, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(report)?)?;
        info!("Report saved: {}", path.display());
        Ok(())
    }
}

type NumericValues = Vec<Option<f64>>;
type TextValues = Vec<Option<String>>;

/// Numeric columns as nullable floats; NaN counts as missing.
fn numeric_columns(df: &DataFrame) -> Vec<(String, NumericValues)> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .filter_map(|c| {
            let floats = c.as_materialized_series().cast(&DataType::Float64).ok()?;
            let values = floats
                .f64()
                .ok()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            Some((c.name().to_string(), values))
        })
        .collect()
}

fn text_columns(df: &DataFrame) -> Vec<(String, TextValues)> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .filter_map(|c| {
            let values = c
                .as_materialized_series()
                .str()
                .ok()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            Some((c.name().to_string(), values))
        })
        .collect()
}

fn variables(df: &DataFrame) -> Vec<VariableInfo> {
    df.get_columns()
        .iter()
        .map(|c| VariableInfo {
            name: c.name().to_string(),
            dtype: c.dtype().to_string(),
            examples: distinct_sample_values(c.as_materialized_series(), EXAMPLE_VALUES),
        })
        .collect()
}

fn duplicate_rows(df: &DataFrame) -> usize {
    match first_occurrence_mask(df) {
        Ok(mask) => mask.iter().filter(|first| !**first).count(),
        Err(e) => {
            warn!("Could not count duplicate rows: {}", e);
            0
        }
    }
}

fn missing_values(df: &DataFrame) -> BTreeMap<String, MissingValues> {
    let height = df.height().max(1) as f64;
    df.get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| {
            let count = c.null_count();
            (
                c.name().to_string(),
                MissingValues {
                    count,
                    percentage: count as f64 / height * 100.0,
                },
            )
        })
        .collect()
}

fn numeric_summary(df: &DataFrame) -> Vec<ColumnSummary> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .filter_map(|c| {
            let values = finite_values(c.as_materialized_series()).ok()?;
            Some(ColumnSummary {
                column: c.name().to_string(),
                summary: NumericSummary::from_values(&values)?,
            })
        })
        .collect()
}

/// Distinct values with their counts, in first-seen order.
fn value_counts(values: &[Option<String>]) -> Vec<(&str, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for value in values.iter().flatten() {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push((value.as_str(), 1));
            }
        }
    }
    counts
}

fn categorical_frequencies(name: &str, values: &[Option<String>]) -> CategoricalFrequencies {
    let mut counts = value_counts(values);
    // stable: ties keep first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let present: usize = counts.iter().map(|(_, c)| c).sum();
    let top_values = counts
        .iter()
        .take(TOP_VALUES)
        .map(|(value, count)| ValueFrequency {
            value: value.to_string(),
            count: *count,
            share: *count as f64 / present.max(1) as f64,
        })
        .collect();

    CategoricalFrequencies {
        column: name.to_string(),
        top_values,
        other_values: counts.len().saturating_sub(TOP_VALUES),
    }
}

fn correlations(numeric: &[(String, NumericValues)]) -> Vec<Correlation> {
    let mut pairs = Vec::new();
    for (i, (name_x, values_x)) in numeric.iter().enumerate() {
        for (name_y, values_y) in &numeric[i + 1..] {
            let (x, y): (Vec<f64>, Vec<f64>) = values_x
                .iter()
                .zip(values_y)
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .unzip();
            if x.len() < MIN_CORRELATION_ROWS {
                continue;
            }
            if let Some(r) = pearson(&x, &y) {
                pairs.push(Correlation {
                    column_x: name_x.clone(),
                    column_y: name_y.clone(),
                    r,
                });
            }
        }
    }

    pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
    pairs.truncate(TOP_CORRELATIONS);
    pairs
}

/// t-test for two-level categories, ANOVA for more.
fn group_test(
    num_name: &str,
    num_values: &[Option<f64>],
    cat_name: &str,
    cat_values: &[Option<String>],
) -> Option<SignificanceTest> {
    let levels = value_counts(cat_values);
    let mut groups: Vec<Vec<f64>> = vec![Vec::new(); levels.len()];
    let position: HashMap<&str, usize> = levels
        .iter()
        .enumerate()
        .map(|(i, (level, _))| (*level, i))
        .collect();

    for (num, cat) in num_values.iter().zip(cat_values) {
        if let (Some(num), Some(cat)) = (num, cat)
            && let Some(&i) = position.get(cat.as_str())
        {
            groups[i].push(*num);
        }
    }

    let variables = (num_name, cat_name);
    match levels.len() {
        2 if groups.iter().all(|g| g.len() > 1) => {
            students_t_test(variables, &groups[0], &groups[1])
        }
        n if n > 2 => {
            let groups: Vec<Vec<f64>> = groups.into_iter().filter(|g| g.len() > 1).collect();
            if groups.len() > 2 {
                one_way_anova(variables, &groups)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Counts of co-occurring values, rows missing either value skipped.
fn contingency_table(values_a: &[Option<String>], values_b: &[Option<String>]) -> Vec<Vec<usize>> {
    let mut rows: HashMap<&str, usize> = HashMap::new();
    let mut cols: HashMap<&str, usize> = HashMap::new();
    let mut cells: Vec<(usize, usize)> = Vec::new();

    for (a, b) in values_a.iter().zip(values_b) {
        let (Some(a), Some(b)) = (a, b) else {
            continue;
        };
        let next_row = rows.len();
        let i = *rows.entry(a.as_str()).or_insert(next_row);
        let next_col = cols.len();
        let j = *cols.entry(b.as_str()).or_insert(next_col);
        cells.push((i, j));
    }

    let mut table = vec![vec![0usize; cols.len()]; rows.len()];
    for (i, j) in cells {
        table[i][j] += 1;
    }
    table
}
