//! Leverage factors.

use super::{column_or_fallback, float, guarded_div};
use crate::{
    Result,
    frame::DATE,
    registry::FactorCategory,
    traits::{DataFrequency, FactorGroup},
};
use polars::prelude::*;

/// Debt ratio and debt-to-equity.
///
/// Reported `debt_to_assets` and `debt_to_eqt` are used when complete,
/// otherwise `total_liab / total_assets` and
/// `total_liab / (total_assets - total_liab)` replace the whole column.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeverageFactors;

impl FactorGroup for LeverageFactors {
    fn name(&self) -> &str {
        "leverage"
    }

    fn description(&self) -> &str {
        "Debt ratio and debt-to-equity ratio"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Leverage
    }

    fn required_columns(&self) -> &[&str] {
        &["debt_to_assets", "debt_to_eqt"]
    }

    fn output_columns(&self) -> Vec<String> {
        vec!["debt_ratio".to_string(), "debt_to_equity_ratio".to_string()]
    }

    fn lookback(&self) -> usize {
        1
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Quarterly
    }

    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame> {
        let debt_ratio = column_or_fallback(
            data,
            "debt_to_assets",
            &["total_liab", "total_assets"],
            guarded_div(float("total_liab"), float("total_assets")),
        )?;
        let debt_to_equity = column_or_fallback(
            data,
            "debt_to_eqt",
            &["total_liab", "total_assets"],
            guarded_div(
                float("total_liab"),
                float("total_assets") - float("total_liab"),
            ),
        )?;

        let result = data
            .clone()
            .lazy()
            .select([
                col(DATE),
                debt_ratio.alias("debt_ratio"),
                debt_to_equity.alias("debt_to_equity_ratio"),
            ])
            .collect()?;

        Ok(result)
    }
}
