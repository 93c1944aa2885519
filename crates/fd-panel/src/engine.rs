//! Per-symbol factor table construction.

use crate::{
    PanelError, Result,
    frame::{SYMBOL, inner_join_on_date},
    registry::FactorRegistry,
    resample::MonthlyTable,
};
use polars::prelude::*;

/// Builds one symbol's factor table from its monthly source tables.
///
/// Sources are inner-joined on `date` in [`crate::SourceKind`] order, so a month
/// survives only if every source has it; a column present in several sources
/// is taken from the first. Every registered factor group is then computed on
/// the joined table and the groups are inner-joined again.
#[derive(Debug, Clone)]
pub struct FactorEngine {
    registry: FactorRegistry,
}

impl Default for FactorEngine {
    fn default() -> Self {
        Self::new(FactorRegistry::with_defaults())
    }
}

impl FactorEngine {
    /// Engine computing the groups of `registry`.
    pub const fn new(registry: FactorRegistry) -> Self {
        Self { registry }
    }

    /// The factor groups this engine computes.
    pub const fn registry(&self) -> &FactorRegistry {
        &self.registry
    }

    /// Inner-join monthly tables in source order.
    pub fn join_sources(&self, tables: &[MonthlyTable]) -> Result<DataFrame> {
        let mut ordered: Vec<&MonthlyTable> = tables.iter().collect();
        ordered.sort_by_key(|t| t.kind());

        let frames: Vec<DataFrame> = ordered.iter().map(|t| t.frame().clone()).collect();
        inner_join_on_date(&frames)
    }

    /// Factor table for `symbol`: `date`, every factor column and `symbol`.
    ///
    /// Fails with [`PanelError::JoinEmptyResult`] when the sources, or the
    /// factor groups, have no month in common.
    pub fn build(&self, symbol: &str, tables: &[MonthlyTable]) -> Result<DataFrame> {
        let joined = self.join_sources(tables)?;
        if joined.height() == 0 {
            return Err(PanelError::JoinEmptyResult(format!("{symbol} sources")));
        }

        let factors = self.registry.compute_all(&joined)?;
        if factors.height() == 0 {
            return Err(PanelError::JoinEmptyResult(format!("{symbol} factor groups")));
        }

        let result = factors
            .lazy()
            .with_column(lit(symbol).alias(SYMBOL))
            .collect()?;

        log::info!(
            "{symbol}: {} months, {} factor columns",
            result.height(),
            result.width() - 2
        );
        Ok(result)
    }
}
