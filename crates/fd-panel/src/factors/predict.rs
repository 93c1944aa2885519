//! Prediction target.

use super::{float, guarded_div};
use crate::{
    Result,
    frame::DATE,
    registry::FactorCategory,
    traits::{DataFrequency, FactorGroup},
};
use polars::prelude::*;

/// Forward and trailing one-period returns of close, in percent.
///
/// ```text
/// predict_value[i]       = 100 * (close[i+1] - close[i]) / close[i]
/// shift_predict_value[i] = 100 * (close[i] - close[i-1]) / close[i-1]
/// ```
///
/// `predict_value` is the learning target and is null on the last row;
/// `shift_predict_value` is an ordinary feature and is null on the first row.
/// `close` is carried along.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredictValue;

impl FactorGroup for PredictValue {
    fn name(&self) -> &str {
        "predict_value"
    }

    fn description(&self) -> &str {
        "Next-period return of close (target) and the trailing one-period return"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Target
    }

    fn required_columns(&self) -> &[&str] {
        &["close"]
    }

    fn output_columns(&self) -> Vec<String> {
        ["predict_value", "shift_predict_value", "close"]
            .map(String::from)
            .to_vec()
    }

    fn lookback(&self) -> usize {
        1
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }

    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame> {
        let close = float("close");
        let next = float("close").shift(lit(-1));
        let previous = float("close").shift(lit(1));

        let result = data
            .clone()
            .lazy()
            .select([
                col(DATE),
                guarded_div(lit(100.0) * (next - close.clone()), close.clone())
                    .alias("predict_value"),
                guarded_div(lit(100.0) * (close.clone() - previous.clone()), previous)
                    .alias("shift_predict_value"),
                close.alias("close"),
            ])
            .collect()?;

        Ok(result)
    }
}
