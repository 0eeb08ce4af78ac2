//! Column-name normalization.

use crate::error::Result;
use crate::types::{CleaningLog, CleaningStage};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace run"));
static NON_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("Invalid regex: identifier chars"));

/// Normalize a single column name.
///
/// Trims, lower-cases, turns whitespace runs into one underscore and strips
/// anything outside `[a-z0-9_]`. Applying it twice gives the same result as
/// applying it once.
pub fn normalize_column_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lowered, "_");
    NON_IDENTIFIER.replace_all(&underscored, "").into_owned()
}

/// Normalize every column name, suffixing `_2`, `_3`, ... on collisions.
///
/// A name that normalizes to nothing becomes `column_<position>`.
pub fn normalize_column_names(df: DataFrame, log: &mut CleaningLog) -> Result<DataFrame> {
    let originals: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut taken: HashSet<String> = HashSet::with_capacity(originals.len());
    let mut renamed: Vec<String> = Vec::with_capacity(originals.len());
    let mut collisions: Vec<(String, String)> = Vec::new();

    for (idx, original) in originals.iter().enumerate() {
        let mut base = normalize_column_name(original);
        if base.is_empty() {
            base = format!("column_{}", idx + 1);
        }

        let mut candidate = base.clone();
        let mut suffix = 2;
        while taken.contains(&candidate) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        if candidate != base {
            collisions.push((original.clone(), candidate.clone()));
        }

        taken.insert(candidate.clone());
        renamed.push(candidate);
    }

    let changed: Vec<(&String, &String)> = originals
        .iter()
        .zip(renamed.iter())
        .filter(|(old, new)| old != new)
        .collect();

    if changed.is_empty() {
        debug!("Column names already normalized");
        return Ok(df);
    }

    if let Some((old, new)) = changed.first() {
        log.info(
            CleaningStage::ColumnNames,
            format!(
                "{} column name(s) normalized (e.g. '{}' -> '{}')",
                changed.len(),
                old,
                new
            ),
        );
    }
    for (original, suffixed) in &collisions {
        log.warning(
            CleaningStage::ColumnNames,
            format!(
                "Column '{}' collides with another column after normalization, renamed to '{}'",
                original, suffixed
            ),
        );
    }
    debug!("Renamed {} columns", changed.len());

    let columns: Vec<Column> = df
        .take_columns()
        .into_iter()
        .zip(renamed)
        .map(|(mut column, name)| {
            column.rename(name.into());
            column
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  First Name "), "first_name");
        assert_eq!(normalize_column_name("Unit\tPrice (€)"), "unit_price_");
        assert_eq!(normalize_column_name("Total   Sales"), "total_sales");
        assert_eq!(normalize_column_name("Prénom"), "prnom");
        assert_eq!(normalize_column_name("already_ok_1"), "already_ok_1");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["  A  B ", "Ça va?", "x-y z", "", "Mixed_CASE 2"] {
            let once = normalize_column_name(raw);
            assert_eq!(normalize_column_name(&once), once);
        }
    }

    #[test]
    fn test_stage_renames_and_logs_example() {
        let df = df![
            " Customer ID " => [1, 2],
            "amount" => [3.0, 4.0],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = normalize_column_names(df, &mut log).unwrap();

        assert_eq!(names(&df), vec!["customer_id", "amount"]);
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].message.contains("'customer_id'"));
    }

    #[test]
    fn test_collisions_get_suffixes() {
        let df = df![
            "Name" => ["a"],
            "name " => ["b"],
            "NAME" => ["c"],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = normalize_column_names(df, &mut log).unwrap();

        assert_eq!(names(&df), vec!["name", "name_2", "name_3"]);
        assert_eq!(log.warnings().count(), 2);
    }

    #[test]
    fn test_empty_name_gets_positional_fallback() {
        let df = df![
            "id" => [1],
            "???" => [2],
        ]
        .unwrap();
        let mut log = CleaningLog::new();

        let df = normalize_column_names(df, &mut log).unwrap();

        assert_eq!(names(&df), vec!["id", "column_2"]);
    }

    #[test]
    fn test_no_log_when_nothing_changes() {
        let df = df!["a" => [1], "b_c" => [2]].unwrap();
        let mut log = CleaningLog::new();

        let df = normalize_column_names(df, &mut log).unwrap();

        assert_eq!(names(&df), vec!["a", "b_c"]);
        assert!(log.is_empty());
    }
}
