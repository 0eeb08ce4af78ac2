//! Turning uploaded bytes into a table.
//!
//! Delimited text goes through polars' CSV reader after decoding and
//! separator sniffing. Spreadsheets are read with `calamine` when the
//! `spreadsheet` feature is enabled.

use crate::error::LoadError;
use encoding_rs::WINDOWS_1252;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Separators tried when sniffing the header line, in tie-break order.
const SEPARATOR_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// How a file's bytes are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `.csv`, `.tsv` or `.txt`
    DelimitedText,
    /// `.xlsx`, `.xls`, `.xlsm`, `.xlsb` or `.ods`
    Spreadsheet,
}

impl FileKind {
    /// Map a file name to its kind by extension, ignoring case.
    pub fn from_file_name(file_name: &str) -> Result<Self, LoadError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "tsv" | "txt" => Ok(Self::DelimitedText),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(Self::Spreadsheet),
            _ => Err(LoadError::UnsupportedExtension(extension)),
        }
    }
}

/// Loads tables from raw file contents.
pub struct TableLoader;

impl TableLoader {
    /// Read the file at `path`, picking the file kind from its name.
    pub fn load_path(path: impl AsRef<Path>) -> Result<DataFrame, LoadError> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let kind = FileKind::from_file_name(file_name)?;

        info!("Loading {:?} file: {}", kind, path.display());
        let bytes = std::fs::read(path)?;
        Self::load(&bytes, kind)
    }

    /// Parse `bytes` as a table of the given kind.
    pub fn load(bytes: &[u8], kind: FileKind) -> Result<DataFrame, LoadError> {
        let df = match kind {
            FileKind::DelimitedText => Self::load_delimited(bytes)?,
            FileKind::Spreadsheet => Self::load_spreadsheet(bytes)?,
        };
        debug!("Loaded table with shape {:?}", df.shape());
        Ok(df)
    }

    fn load_delimited(bytes: &[u8]) -> Result<DataFrame, LoadError> {
        let text = decode_text(bytes);
        let separator = sniff_separator(&text);
        debug!("Using separator {:?}", separator as char);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .with_parse_options(
                CsvParseOptions::default()
                    .with_separator(separator)
                    .with_quote_char(Some(b'"')),
            )
            .into_reader_with_file_handle(Cursor::new(text.into_owned()))
            .finish()?;
        Ok(df)
    }

    #[cfg(feature = "spreadsheet")]
    fn load_spreadsheet(bytes: &[u8]) -> Result<DataFrame, LoadError> {
        spreadsheet::read_first_sheet(bytes)
    }

    #[cfg(not(feature = "spreadsheet"))]
    fn load_spreadsheet(_bytes: &[u8]) -> Result<DataFrame, LoadError> {
        Err(LoadError::UnsupportedExtension(
            "spreadsheet support is not compiled in".to_string(),
        ))
    }
}

/// Decode as UTF-8, falling back to windows-1252 where every byte maps to a
/// character.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            warn!("File is not valid UTF-8 ({}), decoding as windows-1252", e);
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text
        }
    }
}

/// Pick the most frequent candidate separator on the header line, outside
/// quotes. Comma wins ties and the no-match case.
fn sniff_separator(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    let mut counts = [0usize; SEPARATOR_CANDIDATES.len()];
    let mut in_quotes = false;

    for byte in header.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = SEPARATOR_CANDIDATES.iter().position(|c| *c == byte) {
            counts[idx] += 1;
        }
    }

    let mut best = 0;
    for idx in 1..counts.len() {
        if counts[idx] > counts[best] {
            best = idx;
        }
    }
    SEPARATOR_CANDIDATES[best]
}

#[cfg(feature = "spreadsheet")]
mod spreadsheet {
    use super::*;
    use calamine::{Data as Cell, DataType as _, Reader, open_workbook_auto_from_rs};
    use std::collections::HashSet;

    pub(super) fn read_first_sheet(bytes: &[u8]) -> Result<DataFrame, LoadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| LoadError::Parse(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| LoadError::Parse("workbook has no sheets".to_string()))?
            .map_err(|e| LoadError::Parse(e.to_string()))?;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| LoadError::Parse("sheet has no header row".to_string()))?;
        let names = header_names(header);
        let body: Vec<&[Cell]> = rows.collect();

        let columns = names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let cells: Vec<&Cell> = body.iter().map(|row| row.get(idx).unwrap_or(&Cell::Empty)).collect();
                typed_column(name, &cells).map(Column::from)
            })
            .collect::<PolarsResult<Vec<Column>>>()?;

        Ok(DataFrame::new(columns)?)
    }

    /// Header cells rendered as text. Blank cells become `Unnamed: <i>` and
    /// repeats get `.1`, `.2` suffixes.
    pub(super) fn header_names(header: &[Cell]) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        header
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                let base = match render_cell(cell) {
                    Some(text) if !text.trim().is_empty() => text,
                    _ => format!("Unnamed: {}", idx),
                };
                let mut name = base.clone();
                let mut suffix = 0;
                while seen.contains(&name) {
                    suffix += 1;
                    name = format!("{}.{}", base, suffix);
                }
                seen.insert(name.clone());
                name
            })
            .collect()
    }

    /// Build one column, typed by what all of its non-empty cells agree on.
    pub(super) fn typed_column(name: &str, cells: &[&Cell]) -> PolarsResult<Series> {
        let present: Vec<&Cell> = cells.iter().copied().filter(|c| !is_missing(c)).collect();
        let name: PlSmallStr = name.into();

        if !present.is_empty() && present.iter().all(|c| matches!(c, Cell::Int(_))) {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            return Ok(Series::new(name, values));
        }

        if !present.is_empty()
            && present
                .iter()
                .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_)))
        {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(v) => Some(*v as f64),
                    Cell::Float(v) => Some(*v),
                    _ => None,
                })
                .collect();
            return Ok(Series::new(name, values));
        }

        if !present.is_empty() && present.iter().all(|c| matches!(c, Cell::Bool(_))) {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(v) => Some(*v),
                    _ => None,
                })
                .collect();
            return Ok(Series::new(name, values));
        }

        if !present.is_empty() && present.iter().all(|c| matches!(c, Cell::DateTime(_))) {
            let millis: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.as_datetime().map(|dt| dt.and_utc().timestamp_millis()))
                .collect();
            return Series::new(name, millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None));
        }

        let values: Vec<Option<String>> = cells.iter().map(|c| render_cell(c)).collect();
        Ok(Series::new(name, values))
    }

    fn is_missing(cell: &Cell) -> bool {
        matches!(cell, Cell::Empty | Cell::Error(_))
    }

    fn render_cell(cell: &Cell) -> Option<String> {
        match cell {
            Cell::Empty | Cell::Error(_) => None,
            Cell::String(s) | Cell::DateTimeIso(s) | Cell::DurationIso(s) => Some(s.clone()),
            Cell::Int(v) => Some(v.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Bool(v) => Some(v.to_string()),
            Cell::DateTime(_) => cell
                .as_datetime()
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
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

    // ==================== FileKind tests ====================

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(FileKind::from_file_name("data.csv").unwrap(), FileKind::DelimitedText);
        assert_eq!(FileKind::from_file_name("DATA.TSV").unwrap(), FileKind::DelimitedText);
        assert_eq!(FileKind::from_file_name("notes.txt").unwrap(), FileKind::DelimitedText);
        assert_eq!(FileKind::from_file_name("book.XLSX").unwrap(), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_file_name("book.ods").unwrap(), FileKind::Spreadsheet);
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = FileKind::from_file_name("report.pdf").unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_EXTENSION");
        assert!(FileKind::from_file_name("no_extension").is_err());
    }

    // ==================== decoding / sniffing tests ====================

    #[test]
    fn test_latin1_fallback() {
        let bytes = b"name,city\nJos\xe9,Paris\n";
        let df = TableLoader::load(bytes, FileKind::DelimitedText).unwrap();
        let value = df
            .column("name")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .get(0)
            .map(|s| s.to_string());
        assert_eq!(value, Some("José".to_string()));
    }

    #[test]
    fn test_bom_stripped_from_header() {
        let bytes = b"\xEF\xBB\xBFid,value\n1,2\n";
        let df = TableLoader::load(bytes, FileKind::DelimitedText).unwrap();
        assert_eq!(names(&df), vec!["id", "value"]);
    }

    #[test]
    fn test_semicolon_separator_sniffed() {
        let bytes = b"a;b;c\n1;2;3\n4;5;6\n";
        let df = TableLoader::load(bytes, FileKind::DelimitedText).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(names(&df), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sniff_ignores_quoted_separators() {
        assert_eq!(sniff_separator("\"a;b;c\",d\n"), b',');
        assert_eq!(sniff_separator("x\ty\tz\n"), b'\t');
        assert_eq!(sniff_separator("single\n"), b',');
    }

    #[test]
    fn test_header_kept_verbatim() {
        let bytes = b" Product Name ,Price\nWidget,10\n";
        let df = TableLoader::load(bytes, FileKind::DelimitedText).unwrap();
        assert_eq!(names(&df), vec![" Product Name ", "Price"]);
    }

    #[test]
    fn test_late_text_value_does_not_fail() {
        let mut csv = String::from("v\n");
        for i in 0..200 {
            csv.push_str(&format!("{}\n", i));
        }
        csv.push_str("abc\n");
        let df = TableLoader::load(csv.as_bytes(), FileKind::DelimitedText).unwrap();
        assert_eq!(df.height(), 201);
    }

    #[test]
    fn test_empty_file_is_parse_error() {
        let err = TableLoader::load(b"", FileKind::DelimitedText).unwrap_err();
        assert_eq!(err.error_code(), "PARSE_FAILED");
    }

    #[test]
    fn test_load_path_missing_file_is_io_error() {
        let err = TableLoader::load_path("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    // ==================== spreadsheet tests ====================

    #[cfg(feature = "spreadsheet")]
    mod spreadsheet_cells {
        use super::super::spreadsheet::{header_names, typed_column};
        use calamine::Data as Cell;
        use polars::prelude::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_header_names_mangled() {
            let header = vec![
                Cell::String("a".to_string()),
                Cell::Empty,
                Cell::String("a".to_string()),
                Cell::String("a".to_string()),
            ];
            assert_eq!(header_names(&header), vec!["a", "Unnamed: 1", "a.1", "a.2"]);
        }

        #[test]
        fn test_integer_cells_give_int64() {
            let cells = [Cell::Int(1), Cell::Empty, Cell::Int(3)];
            let refs: Vec<&Cell> = cells.iter().collect();
            let series = typed_column("n", &refs).unwrap();
            assert_eq!(series.dtype(), &DataType::Int64);
            assert_eq!(series.null_count(), 1);
        }

        #[test]
        fn test_mixed_numeric_cells_give_float64() {
            let cells = [Cell::Int(1), Cell::Float(2.5)];
            let refs: Vec<&Cell> = cells.iter().collect();
            assert_eq!(typed_column("n", &refs).unwrap().dtype(), &DataType::Float64);
        }

        #[test]
        fn test_mixed_cells_fall_back_to_text() {
            let cells = [Cell::Int(1), Cell::String("x".to_string()), Cell::Bool(true)];
            let refs: Vec<&Cell> = cells.iter().collect();
            let series = typed_column("m", &refs).unwrap();
            assert_eq!(series.dtype(), &DataType::String);
            let values: Vec<Option<&str>> = series.str().unwrap().into_iter().collect();
            assert_eq!(values, vec![Some("1"), Some("x"), Some("true")]);
        }
    }
}
