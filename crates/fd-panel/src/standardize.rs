//! Standardization of panel factor values.
//!
//! Factors live on very different scales (ratios, percentages, raw balance
//! sheet totals), so the panel is z-scored column by column before it is handed
//! to a model.

use crate::{
    Result,
    factors::float,
    frame::{DATE, SYMBOL, ensure_columns},
    registry::FactorRegistry,
};
use polars::prelude::*;

/// Whether `name` is a 0/1 crossover indicator, copied through unchanged.
pub fn is_indicator(name: &str) -> bool {
    name.contains("_cross_")
}

/// Output columns of `registry` that [`standardize_panel`] z-scores: every
/// factor column except the crossover indicators.
pub fn factor_columns(registry: &FactorRegistry) -> Vec<String> {
    registry
        .output_columns()
        .into_iter()
        .filter(|name| !is_indicator(name))
        .collect()
}

/// Whole-column z-score standardization.
///
/// Computes z_i = (x_i - mean(x)) / std(x) over every row, with the population
/// standard deviation. A column with zero variance is only centered. Other
/// columns are left untouched.
pub fn standardize_columns(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    ensure_columns(df, columns)?;

    let exprs: Vec<Expr> = columns
        .iter()
        .map(|name| {
            let centered = float(name) - float(name).mean();
            let std_dev = float(name).std(0);
            when(std_dev.clone().eq(lit(0.0)))
                .then(centered.clone())
                .otherwise(centered / std_dev)
                .alias(*name)
        })
        .collect();

    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Standardize every factor column a panel built with `registry` carries.
///
/// `date`, `symbol` and the crossover indicators pass through unchanged;
/// column order is preserved.
pub fn standardize_panel(df: &DataFrame, registry: &FactorRegistry) -> Result<DataFrame> {
    ensure_columns(df, &[DATE, SYMBOL])?;
    let columns = factor_columns(registry);
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    standardize_columns(df, &names)
}
