//! Tabular Data Cleaning Library
//!
//! Turns an uploaded CSV or spreadsheet into a cleaned table plus a
//! human-readable log of everything that was changed, built with Rust and
//! Polars.
//!
//! # Overview
//!
//! - **Loading**: UTF-8 with a windows-1252 fallback, separator sniffing,
//!   spreadsheets through the `spreadsheet` feature
//! - **Cleaning**: empty rows and columns, column names, null spellings,
//!   duplicates, sparse columns, type inference, outliers, imputation
//! - **Audit log**: one ordered entry per action, tagged with a severity
//! - **Export**: CSV output and a JSON-serializable analysis report
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cleansheet::{CleaningConfig, CleaningPipeline, TableLoader};
//!
//! let df = TableLoader::load_path("data.csv")?;
//!
//! let config = CleaningConfig::builder()
//!     .missing_col_threshold(0.5)
//!     .build()?;
//!
//! let outcome = CleaningPipeline::new(config).clean(df)?;
//! for entry in &outcome.log {
//!     println!("{}", entry);
//! }
//! println!("Final shape: {:?}", outcome.shape());
//! ```
//!
//! # Configuration
//!
//! Use [`CleaningConfig`] to choose how missing values and outliers are
//! treated:
//!
//! ```rust,ignore
//! use cleansheet::config::*;
//!
//! let config = CleaningConfig::builder()
//!     .missing_value_strategy(MissingValueStrategy::RemoveRow)
//!     .outlier_strategy(OutlierStrategy::Cap)
//!     .iqr_multiplier(3.0)
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod export;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{DataCleaner, TypeCorrector};
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ConfigValidationError, MissingValueStrategy,
    OutlierMethod, OutlierStrategy,
};
pub use error::{CleaningError, LoadError, Result as CleaningResult, ResultExt};
pub use export::{save_csv, to_csv_string, write_csv};
pub use imputers::StatisticalImputer;
pub use loader::{FileKind, TableLoader};
pub use pipeline::{CleaningPipeline, IqrBounds, OutlierHandler, clean};
pub use report::{AnalysisReport, ReportBuilder};
pub use types::{CleaningLog, CleaningOutcome, CleaningStage, LogEntry, Severity};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
