//! Configuration for the cleaning pipeline.
//!
//! The configuration is immutable once built and always supplied by the
//! caller; the pipeline reads no files or environment variables.

use serde::{Deserialize, Serialize};

/// Default fraction of missing cells above which a column is dropped.
pub const DEFAULT_MISSING_COL_THRESHOLD: f64 = 0.8;

/// Default Tukey fence multiplier.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// How stage 8 deals with cells that are still missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingValueStrategy {
    /// Median for numeric columns, mode for everything else.
    #[default]
    Auto,
    /// Drop every row that is missing a value in the column.
    RemoveRow,
    /// Leave missing cells alone.
    None,
}

/// What to do with values outside the IQR fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierStrategy {
    /// Add a `<name>_outlier` boolean column, values untouched.
    #[default]
    Flag,
    /// Clamp values to the nearest fence (winsorize).
    Cap,
    /// Drop rows holding an outlier.
    Remove,
    /// Skip outlier handling.
    None,
}

/// Outlier detection method. Only IQR fences are implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    #[default]
    Iqr,
}

/// Configuration for [`CleaningPipeline`](crate::pipeline::CleaningPipeline).
///
/// # Example
///
/// ```rust,ignore
/// use cleansheet::config::{CleaningConfig, OutlierStrategy};
///
/// let config = CleaningConfig::builder()
///     .missing_col_threshold(0.5)
///     .outlier_strategy(OutlierStrategy::Cap)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Strategy for stage 8 imputation.
    /// Default: Auto
    pub missing_value_strategy: MissingValueStrategy,

    /// Columns whose missing fraction is strictly above this value are
    /// dropped (0.0 - 1.0).
    /// Default: 0.8
    pub missing_col_threshold: f64,

    /// Strategy for stage 7 outlier handling.
    /// Default: Flag
    pub outlier_strategy: OutlierStrategy,

    /// Default: Iqr
    pub outlier_method: OutlierMethod,

    /// Fence multiplier `m` in `[Q1 - m*IQR, Q3 + m*IQR]`.
    /// Default: 1.5
    pub iqr_multiplier: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing_value_strategy: MissingValueStrategy::default(),
            missing_col_threshold: DEFAULT_MISSING_COL_THRESHOLD,
            outlier_strategy: OutlierStrategy::default(),
            outlier_method: OutlierMethod::default(),
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !self.missing_col_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.missing_col_threshold)
        {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_col_threshold".to_string(),
                value: self.missing_col_threshold,
            });
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier <= 0.0 {
            return Err(ConfigValidationError::InvalidMultiplier(
                self.iqr_multiplier,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid IQR multiplier: {0} (must be a positive number)")]
    InvalidMultiplier(f64),
}

/// Builder for [`CleaningConfig`].
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    missing_value_strategy: Option<MissingValueStrategy>,
    missing_col_threshold: Option<f64>,
    outlier_strategy: Option<OutlierStrategy>,
    outlier_method: Option<OutlierMethod>,
    iqr_multiplier: Option<f64>,
}

impl CleaningConfigBuilder {
    /// Set the imputation strategy.
    pub fn missing_value_strategy(mut self, strategy: MissingValueStrategy) -> Self {
        self.missing_value_strategy = Some(strategy);
        self
    }

    /// Set the threshold for dropping sparse columns.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.8 = 80%)
    pub fn missing_col_threshold(mut self, threshold: f64) -> Self {
        self.missing_col_threshold = Some(threshold);
        self
    }

    /// Set the strategy for handling outliers.
    pub fn outlier_strategy(mut self, strategy: OutlierStrategy) -> Self {
        self.outlier_strategy = Some(strategy);
        self
    }

    /// Set the outlier detection method.
    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let config = CleaningConfig {
            missing_value_strategy: self.missing_value_strategy.unwrap_or_default(),
            missing_col_threshold: self
                .missing_col_threshold
                .unwrap_or(DEFAULT_MISSING_COL_THRESHOLD),
            outlier_strategy: self.outlier_strategy.unwrap_or_default(),
            outlier_method: self.outlier_method.unwrap_or_default(),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(DEFAULT_IQR_MULTIPLIER),
        };

        config.validate()?;
        Ok(config)
    }
}
