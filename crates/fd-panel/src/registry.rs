//! Factor group registry for discovery and introspection.
//!
//! The registry holds factor groups in join order and computes all of them for
//! one symbol's joined monthly table.

use crate::{
    FactorGroup, PanelError, Result,
    factors::{
        FinancialFactors, GrowthFactors, LeverageFactors, PredictValue, TechnicalConfig,
        TechnicalFactors, ValueFactors,
    },
    frame::inner_join_on_date,
    traits::{ConfigurableFactor, DataFrequency},
};
use derive_more::Display;
use polars::prelude::*;
use std::sync::Arc;

/// Factor category for grouping related factors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactorCategory {
    /// Value - relative valuation factors
    Value,
    /// Growth - growth rates and returns on capital
    Growth,
    /// Financial - balance sheet size and margins
    Financial,
    /// Leverage - indebtedness factors
    Leverage,
    /// Technical - price trend and oscillator factors
    Technical,
    /// Target - forward return used as the learning target
    Target,
}

/// Metadata for factor group introspection.
#[derive(Debug, Clone)]
pub struct FactorInfo {
    /// Group name (unique identifier)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factor category
    pub category: FactorCategory,
    /// Required input columns
    pub required_columns: Vec<String>,
    /// Produced columns
    pub output_columns: Vec<String>,
    /// Lookback period
    pub lookback: usize,
    /// Data frequency
    pub frequency: DataFrequency,
}

/// Ordered registry of factor groups.
#[derive(Debug, Default, Clone)]
pub struct FactorRegistry {
    groups: Vec<Arc<dyn FactorGroup>>,
}

impl FactorRegistry {
    /// Create a new empty registry.
    pub const fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register the six standard groups with default configuration.
    pub fn with_defaults() -> Self {
        Self::with_technical(TechnicalConfig::default())
    }

    /// Register the six standard groups with a custom technical configuration.
    pub fn with_technical(config: TechnicalConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ValueFactors));
        registry.register(Arc::new(GrowthFactors));
        registry.register(Arc::new(FinancialFactors));
        registry.register(Arc::new(LeverageFactors));
        registry.register(Arc::new(TechnicalFactors::with_config(config)));
        registry.register(Arc::new(PredictValue));
        registry
    }

    /// Register a group, replacing any group with the same name in place.
    pub fn register(&mut self, group: Arc<dyn FactorGroup>) {
        match self.groups.iter().position(|g| g.name() == group.name()) {
            Some(index) => self.groups[index] = group,
            None => self.groups.push(group),
        }
    }

    /// Get a group by name.
    pub fn get(&self, name: &str) -> Option<&dyn FactorGroup> {
        self.groups
            .iter()
            .find(|g| g.name() == name)
            .map(|g| g.as_ref())
    }

    /// Get groups by category.
    pub fn by_category(&self, category: FactorCategory) -> Vec<&dyn FactorGroup> {
        self.groups
            .iter()
            .filter(|g| g.category() == category)
            .map(|g| g.as_ref())
            .collect()
    }

    /// Get all group metadata, in join order.
    pub fn all_info(&self) -> Vec<FactorInfo> {
        self.groups
            .iter()
            .map(|g| FactorInfo {
                name: g.name().to_string(),
                description: g.description().to_string(),
                category: g.category(),
                required_columns: g.required_columns().iter().map(|s| s.to_string()).collect(),
                output_columns: g.output_columns(),
                lookback: g.lookback(),
                frequency: g.frequency(),
            })
            .collect()
    }

    /// Get all group names, in join order.
    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name()).collect()
    }

    /// Every output column of every group, in join order.
    pub fn output_columns(&self) -> Vec<String> {
        self.groups.iter().flat_map(|g| g.output_columns()).collect()
    }

    /// Compute every group and inner-join the results on `date`.
    ///
    /// Returns a DataFrame with `date` and one column per factor.
    pub fn compute_all(&self, data: &DataFrame) -> Result<DataFrame> {
        if self.groups.is_empty() {
            return Err(PanelError::Computation("No factor groups registered".to_string()));
        }

        let frames = self
            .groups
            .iter()
            .map(|g| g.compute(data))
            .collect::<Result<Vec<_>>>()?;

        inner_join_on_date(&frames)
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
