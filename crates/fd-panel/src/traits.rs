//! Core trait definitions for factor groups.
//!
//! All factor groups implement the [`FactorGroup`] trait, which derives a set of
//! named factor columns from one symbol's joined monthly table.

use crate::{FactorCategory, Result, frame::ensure_columns};
use derive_more::Display;
use polars::prelude::*;

/// Data frequency of a source or of a factor group's inputs.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFrequency {
    /// Daily frequency - prices and valuation metrics
    Daily,
    /// Quarterly frequency - financial statements
    Quarterly,
}

/// A named group of factors derived from one symbol's monthly table.
///
/// Groups are computed independently and inner-joined on `date` to form the
/// symbol's factor table.
pub trait FactorGroup: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this group.
    ///
    /// Should be snake_case and stable across versions.
    fn name(&self) -> &str;

    /// Human-readable description of what this group measures.
    fn description(&self) -> &str;

    /// Factor category for grouping and analysis.
    fn category(&self) -> FactorCategory;

    /// Columns required in the input DataFrame, besides `date`.
    ///
    /// Columns only read by a fallback formula are checked when the fallback
    /// is taken.
    fn required_columns(&self) -> &[&str];

    /// Names of the columns this group produces, besides `date`.
    fn output_columns(&self) -> Vec<String>;

    /// Number of monthly periods needed before outputs are defined.
    fn lookback(&self) -> usize;

    /// Native frequency of the source data this group reads.
    fn frequency(&self) -> DataFrequency;

    /// Compute the group without validating the input schema.
    ///
    /// Returns a DataFrame with `date` followed by [`Self::output_columns`].
    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame>;

    /// Validate required columns, then compute the group.
    fn compute(&self, data: &DataFrame) -> Result<DataFrame> {
        ensure_columns(data, &[crate::frame::DATE])?;
        ensure_columns(data, self.required_columns())?;
        self.compute_raw(data)
    }
}

/// Marker trait for factor group configuration types.
///
/// All config types should implement Default, Clone, Send, Sync, and Debug.
pub trait FactorConfig: Default + Clone + Send + Sync + std::fmt::Debug {}

/// A factor group that supports runtime configuration.
pub trait ConfigurableFactor: FactorGroup {
    /// Configuration type for this group.
    type Config: FactorConfig;

    /// Create a new group with the given configuration.
    fn with_config(config: Self::Config) -> Self;

    /// Returns the current configuration.
    fn config(&self) -> &Self::Config;
}

/// Blanket implementation for any type that satisfies the trait bounds.
impl<T: Default + Clone + Send + Sync + std::fmt::Debug> FactorConfig for T {}
