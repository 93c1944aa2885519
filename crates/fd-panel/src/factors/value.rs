//! Value factors.
//!
//! Reciprocals of the valuation multiples published with daily prices, plus the
//! dividend yield and a growth-times-multiple composite.

use super::{float, guarded_div};
use crate::{
    Result,
    frame::DATE,
    registry::FactorCategory,
    traits::{DataFrequency, FactorGroup},
};
use polars::prelude::*;

/// Value factor group.
///
/// ```text
/// ep     = 1 / pe
/// ep_cut = 1 / pe_ttm
/// bp     = 1 / pb
/// sp     = 1 / ps_ttm
/// dp     = dv_ratio
/// g_pe   = netprofit_yoy * pe
/// ```
///
/// A zero multiple produces a null yield.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFactors;

const OUTPUTS: [&str; 6] = ["ep", "ep_cut", "bp", "sp", "dp", "g_pe"];

impl FactorGroup for ValueFactors {
    fn name(&self) -> &str {
        "value"
    }

    fn description(&self) -> &str {
        "Earnings, cut earnings, book and sales yields, dividend yield and growth x P/E"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Value
    }

    fn required_columns(&self) -> &[&str] {
        &["pe", "pe_ttm", "pb", "ps_ttm", "dv_ratio", "netprofit_yoy"]
    }

    fn output_columns(&self) -> Vec<String> {
        OUTPUTS.iter().map(|s| s.to_string()).collect()
    }

    fn lookback(&self) -> usize {
        1
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }

    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame> {
        let result = data
            .clone()
            .lazy()
            .select([
                col(DATE),
                guarded_div(lit(1.0), float("pe")).alias("ep"),
                guarded_div(lit(1.0), float("pe_ttm")).alias("ep_cut"),
                guarded_div(lit(1.0), float("pb")).alias("bp"),
                guarded_div(lit(1.0), float("ps_ttm")).alias("sp"),
                float("dv_ratio").alias("dp"),
                (float("netprofit_yoy") * float("pe")).alias("g_pe"),
            ])
            .collect()?;

        Ok(result)
    }
}
