//! Growth factors.
//!
//! Profit and earnings growth rates pass through unchanged. Return on assets
//! and return on equity come from the financial-ratio source when it is
//! complete and are rebuilt from the statements otherwise.

use super::{column_or_fallback, float, guarded_div, has_missing};
use crate::{
    Result,
    frame::{DATE, ensure_columns},
    registry::FactorCategory,
    traits::{DataFrequency, FactorGroup},
};
use polars::prelude::*;

/// Growth factor group.
///
/// When the reported `roa` column has any missing value, both return columns
/// are rebuilt for every row:
/// ```text
/// roa = n_income / total_assets
/// roe = n_income / (total_assets - total_liab)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GrowthFactors;

const OUTPUTS: [&str; 4] = ["netprofit_yoy", "eps_yoy", "roe", "roa"];

impl FactorGroup for GrowthFactors {
    fn name(&self) -> &str {
        "growth"
    }

    fn description(&self) -> &str {
        "Net profit and EPS growth with return on equity and return on assets"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Growth
    }

    fn required_columns(&self) -> &[&str] {
        &["netprofit_yoy", "basic_eps_yoy", "roe", "roa"]
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
        let roa = column_or_fallback(
            data,
            "roa",
            &["n_income", "total_assets"],
            guarded_div(float("n_income"), float("total_assets")),
        )?;

        // The equity-based substitute follows the completeness of `roa`.
        let roe = if has_missing(data, "roa")? {
            ensure_columns(data, &["n_income", "total_assets", "total_liab"])?;
            guarded_div(
                float("n_income"),
                float("total_assets") - float("total_liab"),
            )
        } else {
            float("roe")
        };

        let result = data
            .clone()
            .lazy()
            .select([
                col(DATE),
                float("netprofit_yoy").alias("netprofit_yoy"),
                float("basic_eps_yoy").alias("eps_yoy"),
                roe.alias("roe"),
                roa.alias("roa"),
            ])
            .collect()?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PanelError, factors::with_month_ends};
    use approx::assert_relative_eq;

    #[test]
    fn test_growth_passthrough_when_complete() {
        let df = with_month_ends(
            df![
                "netprofit_yoy" => [10.0, 12.0],
                "basic_eps_yoy" => [8.0, 9.0],
                "roe" => [15.0, 16.0],
                "roa" => [5.0, 6.0]
            ]
            .unwrap(),
        );

        let result = GrowthFactors.compute(&df).unwrap();

        assert_eq!(result.shape(), (2, 5));
        let roe = result.column("roe").unwrap().f64().unwrap();
        let roa = result.column("roa").unwrap().f64().unwrap();
        let eps = result.column("eps_yoy").unwrap().f64().unwrap();
        assert_relative_eq!(roe.get(1).unwrap(), 16.0);
        assert_relative_eq!(roa.get(0).unwrap(), 5.0);
        assert_relative_eq!(eps.get(0).unwrap(), 8.0);
    }

    #[test]
    fn test_null_roa_rebuilt_from_statements() {
        let df = with_month_ends(
            df![
                "netprofit_yoy" => [10.0, 12.0, 14.0],
                "basic_eps_yoy" => [8.0, 9.0, 10.0],
                "roe" => [15.0, 16.0, 17.0],
                "roa" => [None::<f64>, None, None],
                "n_income" => [50.0, 60.0, 80.0],
                "total_assets" => [1000.0, 1200.0, 1600.0],
                "total_liab" => [500.0, 600.0, 1200.0]
            ]
            .unwrap(),
        );

        let result = GrowthFactors.compute(&df).unwrap();
        let roa = result.column("roa").unwrap().f64().unwrap();
        let roe = result.column("roe").unwrap().f64().unwrap();

        assert_relative_eq!(roa.get(0).unwrap(), 0.05);
        assert_relative_eq!(roa.get(1).unwrap(), 0.05);
        assert_relative_eq!(roa.get(2).unwrap(), 0.05);
        assert_relative_eq!(roe.get(0).unwrap(), 0.1);
        assert_relative_eq!(roe.get(2).unwrap(), 0.2);
    }

    #[test]
    fn test_single_gap_replaces_whole_column() {
        let df = with_month_ends(
            df![
                "netprofit_yoy" => [10.0, 12.0],
                "basic_eps_yoy" => [8.0, 9.0],
                "roe" => [15.0, 16.0],
                "roa" => [Some(7.0), None],
                "n_income" => [50.0, 60.0],
                "total_assets" => [1000.0, 1200.0],
                "total_liab" => [500.0, 600.0]
            ]
            .unwrap(),
        );

        let result = GrowthFactors.compute(&df).unwrap();
        let roa = result.column("roa").unwrap().f64().unwrap();

        // The reported 7.0 is not kept.
        assert_relative_eq!(roa.get(0).unwrap(), 0.05);
    }

    #[test]
    fn test_fallback_without_statement_columns() {
        let df = with_month_ends(
            df![
                "netprofit_yoy" => [10.0],
                "basic_eps_yoy" => [8.0],
                "roe" => [15.0],
                "roa" => [None::<f64>]
            ]
            .unwrap(),
        );

        assert!(matches!(
            GrowthFactors.compute(&df),
            Err(PanelError::MissingColumn(c)) if c == "n_income"
        ));
    }
}
