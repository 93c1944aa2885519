//! Technical factors computed from the monthly close.

use super::float;
use crate::{
    PanelError, Result,
    frame::DATE,
    registry::FactorCategory,
    traits::{ConfigurableFactor, DataFrequency, FactorGroup},
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for the technical factor group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalConfig {
    /// Simple moving average windows, one `ma{n}` column each (default: 3, 6, 9, 12)
    pub ma_windows: Vec<usize>,
    /// Rolling standard deviation window for `volatility` (default: 24)
    pub volatility_window: usize,
    /// RSI averaging period (default: 14)
    pub rsi_period: usize,
    /// `(short, long)` pairs, one `ma{short}_cross_ma{long}` column each
    /// (default: (3, 9) and (3, 12))
    pub crossovers: Vec<(usize, usize)>,
}

impl Default for TechnicalConfig {
    fn default() -> Self {
        Self {
            ma_windows: vec![3, 6, 9, 12],
            volatility_window: 24,
            rsi_period: 14,
            crossovers: vec![(3, 9), (3, 12)],
        }
    }
}

impl TechnicalConfig {
    /// Fail with [`PanelError::InvalidConfig`] when any window is zero.
    pub fn validate(&self) -> Result<()> {
        let zero_field = if self.ma_windows.contains(&0) {
            Some("ma_windows")
        } else if self.volatility_window == 0 {
            Some("volatility_window")
        } else if self.rsi_period == 0 {
            Some("rsi_period")
        } else if self.crossovers.iter().any(|(short, long)| *short == 0 || *long == 0) {
            Some("crossovers")
        } else {
            None
        };

        match zero_field {
            Some(field) => Err(PanelError::InvalidConfig(format!(
                "technical.{field} must be positive"
            ))),
            None => Ok(()),
        }
    }
}

/// Technical factor group.
///
/// - `ma{n}`: simple moving average of close over `n` periods
/// - `momentum`: `close - close[-1]`
/// - `volatility`: sample standard deviation of close over 24 periods
/// - `rsi`: `100 - 100 / (1 + avg_gain / avg_loss)` where both averages are
///   simple rolling means over 14 periods of the positive and negated negative
///   close changes. Averages that are not yet defined count as zero. When both
///   averages are zero (a flat window, or warm-up) the RSI is null; when only
///   the average loss is zero it is 100.
/// - `ma{a}_cross_ma{b}`: 1 when `ma{a} > ma{b}`, else 0 (also 0 during warm-up)
///
/// Rolling windows require a full window; earlier rows are null.
#[derive(Debug, Clone, Default)]
pub struct TechnicalFactors {
    config: TechnicalConfig,
}

fn full_window(size: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: size,
        min_periods: size,
        ..Default::default()
    }
}

fn sma(size: usize) -> Expr {
    float("close").rolling_mean(full_window(size))
}

fn cross_name(short: usize, long: usize) -> String {
    format!("ma{short}_cross_ma{long}")
}

impl TechnicalFactors {
    fn rsi(&self) -> Expr {
        let change = float("close") - float("close").shift(lit(1));
        let gain = when(change.clone().gt(lit(0.0)))
            .then(change.clone())
            .otherwise(lit(0.0));
        let loss = when(change.clone().lt(lit(0.0)))
            .then(lit(0.0) - change)
            .otherwise(lit(0.0));

        let period = self.config.rsi_period;
        let avg_gain = gain.rolling_mean(full_window(period)).fill_null(lit(0.0));
        let avg_loss = loss.rolling_mean(full_window(period)).fill_null(lit(0.0));

        when(avg_loss.clone().eq(lit(0.0)).and(avg_gain.clone().eq(lit(0.0))))
            .then(lit(NULL))
            .when(avg_loss.clone().eq(lit(0.0)))
            .then(lit(100.0))
            .otherwise(lit(100.0) - lit(100.0) / (lit(1.0) + avg_gain / avg_loss))
    }
}

impl FactorGroup for TechnicalFactors {
    fn name(&self) -> &str {
        "technical"
    }

    fn description(&self) -> &str {
        "Moving averages, momentum, volatility, RSI and moving-average crossovers"
    }

    fn category(&self) -> FactorCategory {
        FactorCategory::Technical
    }

    fn required_columns(&self) -> &[&str] {
        &["close"]
    }

    fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .config
            .ma_windows
            .iter()
            .map(|w| format!("ma{w}"))
            .collect();
        columns.extend(["momentum", "volatility", "rsi"].map(String::from));
        columns.extend(
            self.config
                .crossovers
                .iter()
                .map(|(short, long)| cross_name(*short, *long)),
        );
        columns
    }

    fn lookback(&self) -> usize {
        let longest_ma = self.config.ma_windows.iter().copied().max().unwrap_or(0);
        longest_ma
            .max(self.config.volatility_window)
            .max(self.config.rsi_period + 1)
    }

    fn frequency(&self) -> DataFrequency {
        DataFrequency::Daily
    }

    fn compute_raw(&self, data: &DataFrame) -> Result<DataFrame> {
        self.config.validate()?;

        let mut exprs = vec![col(DATE)];
        exprs.extend(
            self.config
                .ma_windows
                .iter()
                .map(|w| sma(*w).alias(format!("ma{w}"))),
        );
        exprs.push((float("close") - float("close").shift(lit(1))).alias("momentum"));
        exprs.push(
            float("close")
                .rolling_std(full_window(self.config.volatility_window))
                .alias("volatility"),
        );
        exprs.push(self.rsi().alias("rsi"));
        exprs.extend(self.config.crossovers.iter().map(|(short, long)| {
            sma(*short)
                .gt(sma(*long))
                .fill_null(lit(false))
                .cast(DataType::Int32)
                .alias(cross_name(*short, *long))
        }));

        let result = data.clone().lazy().select(exprs).collect()?;
        Ok(result)
    }
}

impl ConfigurableFactor for TechnicalFactors {
    type Config = TechnicalConfig;

    fn with_config(config: Self::Config) -> Self {
        Self { config }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
