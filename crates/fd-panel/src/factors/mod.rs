//! Factor groups derived from one symbol's joined monthly table.
//!
//! Six groups make up a factor table: value, growth, financial, leverage,
//! technical and the forward-return target. Ratios never divide by zero; a zero
//! denominator yields a null so downstream joins and the panel mean fill treat
//! it like any other missing value.

pub mod financial;
pub mod growth;
pub mod leverage;
pub mod predict;
pub mod technical;
pub mod value;

pub use financial::FinancialFactors;
pub use growth::GrowthFactors;
pub use leverage::LeverageFactors;
pub use predict::PredictValue;
pub use technical::{TechnicalConfig, TechnicalFactors};
pub use value::ValueFactors;

use crate::{PanelError, Result, frame::ensure_columns};
use polars::prelude::*;

/// `numerator / denominator`, null where the denominator is zero.
pub(crate) fn guarded_div(numerator: Expr, denominator: Expr) -> Expr {
    when(denominator.clone().eq(lit(0.0)))
        .then(lit(NULL))
        .otherwise(numerator / denominator)
}

/// A source column read as `Float64`.
pub(crate) fn float(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

/// Whether `column` has at least one missing value.
pub(crate) fn has_missing(data: &DataFrame, column: &str) -> Result<bool> {
    let series = data
        .column(column)
        .map_err(|_| PanelError::MissingColumn(column.to_string()))?;
    Ok(series.null_count() > 0)
}

/// The whole `primary` column, or the whole `fallback` formula when `primary`
/// has any missing value.
///
/// The check is over the entire column: a single gap replaces every row,
/// including rows where `primary` is present.
pub(crate) fn column_or_fallback(
    data: &DataFrame,
    primary: &str,
    fallback_inputs: &[&str],
    fallback: Expr,
) -> Result<Expr> {
    if has_missing(data, primary)? {
        ensure_columns(data, fallback_inputs)?;
        log::debug!("{primary} has missing values, using {fallback_inputs:?} instead");
        Ok(fallback)
    } else {
        Ok(float(primary))
    }
}

/// Prepend a `date` column of consecutive month-ends starting 2020-01-31.
#[cfg(test)]
pub(crate) fn with_month_ends(df: DataFrame) -> DataFrame {
    let mut dates = Vec::with_capacity(df.height());
    let mut current = chrono::NaiveDate::from_ymd_opt(2020, 1, 31).unwrap();
    for _ in 0..df.height() {
        dates.push(current);
        current = crate::dates::next_month_end(current);
    }
    let date = crate::dates::date_series(crate::frame::DATE, &dates).unwrap();
    DataFrame::new(vec![date.into()])
        .unwrap()
        .hstack(df.get_columns())
        .unwrap()
}
