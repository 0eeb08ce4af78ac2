use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Cleaning Log Types
// ============================================================================

/// Severity tag of a cleaning log entry.
///
/// `Important` and `Warning` are both warning-level; the UI renders them the
/// same way and only the label differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Important,
    Warning,
    Success,
}

impl Severity {
    /// Label shown in front of the message.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Important => "IMPORTANT",
            Self::Warning => "AVERTISSEMENT",
            Self::Success => "SUCCÈS",
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Important | Self::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stage of the cleaning pipeline that produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Input validation (empty table check)
    Input,
    /// Stage 1: all-missing rows and columns
    StructuralTrim,
    /// Stage 2: column-name normalization
    ColumnNames,
    /// Stage 3: text trimming and null spellings
    TextStandardization,
    /// Stage 4: exact duplicate rows
    Deduplication,
    /// Stage 5: columns above the missing threshold
    SparseColumns,
    /// Stage 6: numeric, timestamp and boolean inference
    TypeInference,
    /// Stage 7: IQR outliers
    OutlierHandling,
    /// Stage 8: missing-value imputation
    Imputation,
    /// Final shape summary
    Complete,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Input => "Checking Input",
            Self::StructuralTrim => "Trimming Empty Rows and Columns",
            Self::ColumnNames => "Normalizing Column Names",
            Self::TextStandardization => "Standardizing Text",
            Self::Deduplication => "Removing Duplicates",
            Self::SparseColumns => "Dropping Sparse Columns",
            Self::TypeInference => "Inferring Types",
            Self::OutlierHandling => "Handling Outliers",
            Self::Imputation => "Imputing Values",
            Self::Complete => "Complete",
        }
    }
}

/// One record of the cleaning audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub stage: CleaningStage,
    /// Human-readable description of what was done.
    pub message: String,
}

impl LogEntry {
    pub fn new(severity: Severity, stage: CleaningStage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity.label(), self.message)
    }
}

/// Ordered audit trail of every pipeline decision.
///
/// The log is for display only; nothing downstream parses the messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CleaningLog {
    entries: Vec<LogEntry>,
}

impl CleaningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, stage: CleaningStage, message: impl Into<String>) {
        self.entries.push(LogEntry::new(severity, stage, message));
    }

    pub fn info(&mut self, stage: CleaningStage, message: impl Into<String>) {
        self.push(Severity::Info, stage, message);
    }

    pub fn important(&mut self, stage: CleaningStage, message: impl Into<String>) {
        self.push(Severity::Important, stage, message);
    }

    pub fn warning(&mut self, stage: CleaningStage, message: impl Into<String>) {
        self.push(Severity::Warning, stage, message);
    }

    pub fn success(&mut self, stage: CleaningStage, message: impl Into<String>) {
        self.push(Severity::Success, stage, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    /// Entries tagged `IMPORTANT` or `AVERTISSEMENT`.
    pub fn warnings(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|e| e.severity.is_warning())
    }

    /// Entries produced by a given stage.
    pub fn for_stage(&self, stage: CleaningStage) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| e.stage == stage)
    }
}

impl<'a> IntoIterator for &'a CleaningLog {
    type Item = &'a LogEntry;
    type IntoIter = std::slice::Iter<'a, LogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ============================================================================
// Pipeline Result
// ============================================================================

/// Cleaned table plus the audit trail that produced it.
#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub table: DataFrame,
    pub log: CleaningLog,
    /// Number of rows handed to the pipeline.
    pub rows_before: usize,
    /// Number of columns handed to the pipeline.
    pub columns_before: usize,
}

impl CleaningOutcome {
    /// Final `(rows, columns)` shape.
    pub fn shape(&self) -> (usize, usize) {
        self.table.shape()
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.table.height())
    }
}
