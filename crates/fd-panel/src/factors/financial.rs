//! Financial factors.

use super::{column_or_fallback, float, guarded_div};
use crate::{
    Result,
    frame::DATE,
    registry::FactorCategory,
    traits::{DataFrequency, FactorGroup},
};
use polars::prelude::*;

/// Balance sheet size, liquidity and margin factors.
///
/// ```text
/// equity = total_assets - total_liab
/// ```
///
/// `current_ratio`, `grossprofit_margin` and `netprofit_margin` pass through
/// when complete and otherwise become, for the whole column,
/// `total_cur_liab / total_cur_assets`, `operate_profit / revenue` and
/// `n_income / revenue`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinancialFactors;

const OUTPUTS: [&str; 6] = [
    "total_assets",
    "total_liabilities",
    "equity",
    "current_ratio",
    "grossprofit_margin",
    "netprofit_margin",
];

impl FactorGroup for FinancialFactors {
    fn name(&self) -> &str {
        "financial"
    }

    fn description(&self) -> &str {
        "Total assets, liabilities and equity with current ratio and profit margins"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Financial
    }

    fn required_columns(&self) -> &[&str] {
        &[
            "total_assets",
            "total_liab",
            "current_ratio",
            "grossprofit_margin",
            "netprofit_margin",
        ]
    }

    fn output_columns(&self) -> Vec<String> {
        OUTPUTS.iter().map(|s| s.to_string()).collect()
    }

    fn lookback(&self) -> usize {
        1
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Quarterly
    }

    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame> {
        let current_ratio = column_or_fallback(
            data,
            "current_ratio",
            &["total_cur_liab", "total_cur_assets"],
            guarded_div(float("total_cur_liab"), float("total_cur_assets")),
        )?;
        let gross_margin = column_or_fallback(
            data,
            "grossprofit_margin",
            &["operate_profit", "revenue"],
            guarded_div(float("operate_profit"), float("revenue")),
        )?;
        let net_margin = column_or_fallback(
            data,
            "netprofit_margin",
            &["n_income", "revenue"],
            guarded_div(float("n_income"), float("revenue")),
        )?;

        let result = data
            .clone()
            .lazy()
            .select([
                col(DATE),
                float("total_assets").alias("total_assets"),
                float("total_liab").alias("total_liabilities"),
                (float("total_assets") - float("total_liab")).alias("equity"),
                current_ratio.alias("current_ratio"),
                gross_margin.alias("grossprofit_margin"),
                net_margin.alias("netprofit_margin"),
            ])
            .collect()?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::with_month_ends;
    use approx::assert_relative_eq;

    #[test]
    fn test_financial_passthrough_and_equity() {
        let df = with_month_ends(
            df![
                "total_assets" => [1000.0, 1100.0],
                "total_liab" => [400.0, 500.0],
                "current_ratio" => [1.5, 1.6],
                "grossprofit_margin" => [30.0, 31.0],
                "netprofit_margin" => [10.0, 11.0]
            ]
            .unwrap(),
        );

        let result = FinancialFactors.compute(&df).unwrap();

        assert_eq!(result.shape(), (2, 7));
        let equity = result.column("equity").unwrap().f64().unwrap();
        let liabilities = result.column("total_liabilities").unwrap().f64().unwrap();
        let current = result.column("current_ratio").unwrap().f64().unwrap();
        assert_relative_eq!(equity.get(0).unwrap(), 600.0);
        assert_relative_eq!(liabilities.get(1).unwrap(), 500.0);
        assert_relative_eq!(current.get(1).unwrap(), 1.6);
    }

    #[test]
    fn test_financial_fallbacks() {
        let df = with_month_ends(
            df![
                "total_assets" => [1000.0, 1100.0],
                "total_liab" => [400.0, 500.0],
                "current_ratio" => [Some(1.5), None],
                "grossprofit_margin" => [None::<f64>, None],
                "netprofit_margin" => [10.0, 11.0],
                "total_cur_liab" => [200.0, 300.0],
                "total_cur_assets" => [400.0, 0.0],
                "operate_profit" => [50.0, 60.0],
                "revenue" => [500.0, 300.0]
            ]
            .unwrap(),
        );

        let result = FinancialFactors.compute(&df).unwrap();
        let current = result.column("current_ratio").unwrap().f64().unwrap();
        let gross = result.column("grossprofit_margin").unwrap().f64().unwrap();
        let net = result.column("netprofit_margin").unwrap().f64().unwrap();

        assert_relative_eq!(current.get(0).unwrap(), 0.5);
        assert_eq!(current.get(1), None);
        assert_relative_eq!(gross.get(0).unwrap(), 0.1);
        assert_relative_eq!(gross.get(1).unwrap(), 0.2);
        assert_relative_eq!(net.get(0).unwrap(), 10.0);
    }
}
