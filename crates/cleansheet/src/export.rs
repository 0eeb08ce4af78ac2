//! CSV export of cleaned tables.

use crate::error::{Result, ResultExt};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write `df` as comma-separated UTF-8 with a header row.
pub fn write_csv<W: Write>(df: &mut DataFrame, mut writer: W) -> Result<()> {
    CsvWriter::new(&mut writer)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context("Writing CSV")?;
    Ok(())
}

/// Render `df` as a CSV string.
pub fn to_csv_string(df: &mut DataFrame) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(df, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Save `df` to `path`, creating parent directories as needed.
pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    write_csv(df, file)?;
    info!("Dataset saved: {}", path.display());
    Ok(())
}
