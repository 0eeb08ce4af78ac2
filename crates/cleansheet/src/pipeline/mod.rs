//! Pipeline module.
//!
//! This module provides the cleaning pipeline and its outlier stage.

mod cleaning;
pub mod outliers;

pub use cleaning::{CleaningPipeline, clean};
pub use outliers::{IqrBounds, OUTLIER_FLAG_SUFFIX, OutlierHandler};
