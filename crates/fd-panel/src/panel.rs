//! Cross-symbol panel construction.
//!
//! [`PanelBuilder`] runs the full per-symbol pipeline (resample, align, derive
//! factors) for every symbol of a universe, trims each factor table to the
//! requested window and concatenates the results into one long panel.

use crate::{
    PanelError, Result,
    calendar::{CalendarAligner, CanonicalCalendar},
    config::PipelineConfig,
    dates::column_dates,
    engine::FactorEngine,
    frame::DATE,
    registry::FactorRegistry,
    resample::FrequencyResampler,
    source::{SourceKind, SymbolSource},
    standardize::standardize_panel,
};
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Window and trimming options for the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// First date kept in the panel, inclusive (default: 2014-01-01)
    pub start_date: NaiveDate,
    /// Last date kept in the panel, inclusive (default: 2023-12-31)
    pub end_date: NaiveDate,
    /// Leading rows dropped from every factor table (default: 24)
    pub warmup_periods: usize,
    /// Drop the last row of every factor table, whose target is undefined
    /// (default: true)
    pub drop_last_period: bool,
    /// Process symbols on the rayon thread pool (default: true)
    pub parallel: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or(NaiveDate::MAX),
            warmup_periods: 24,
            drop_last_period: true,
            parallel: true,
        }
    }
}

impl PanelConfig {
    /// Fail with [`PanelError::InvalidDateRange`] when the window is empty.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(PanelError::InvalidDateRange {
                start: self.start_date.to_string(),
                end: self.end_date.to_string(),
            });
        }
        Ok(())
    }

    /// Whether `date` lies inside the window.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Result of a panel build.
#[derive(Debug)]
pub struct Panel {
    frame: DataFrame,
    factor_tables: Vec<(String, DataFrame)>,
    skipped: Vec<(String, PanelError)>,
    registry: FactorRegistry,
}

impl Panel {
    /// The combined panel, sorted by date with missing values mean-filled.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Untrimmed factor table of every symbol that was processed, in universe
    /// order.
    pub fn factor_tables(&self) -> &[(String, DataFrame)] {
        &self.factor_tables
    }

    /// Symbols that failed, with the reason.
    pub fn skipped(&self) -> &[(String, PanelError)] {
        &self.skipped
    }

    /// The panel with every factor column of its registry z-scored.
    pub fn standardized(&self) -> Result<DataFrame> {
        standardize_panel(&self.frame, &self.registry)
    }
}

/// Builds factor tables per symbol and combines them into a [`Panel`].
#[derive(Debug)]
pub struct PanelBuilder<S> {
    source: S,
    config: PipelineConfig,
    resampler: FrequencyResampler,
    engine: FactorEngine,
}

impl<S: SymbolSource> PanelBuilder<S> {
    /// Builder reading from `source`.
    pub fn new(source: S, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let engine = FactorEngine::new(FactorRegistry::with_technical(config.technical.clone()));
        Ok(Self {
            source,
            resampler: FrequencyResampler::new(config.resample),
            engine,
            config,
        })
    }

    /// Full factor table of one symbol.
    ///
    /// Loads the symbol's sources, derives its trading calendar from the daily
    /// price table, resamples every source to monthly, aligns all of them with
    /// one shared aligner and derives the factor groups. Errors carry the
    /// symbol.
    pub fn factor_table(&self, symbol: &str) -> Result<DataFrame> {
        self.compute_factor_table(symbol)
            .map_err(|e| e.for_symbol(symbol))
    }

    fn compute_factor_table(&self, symbol: &str) -> Result<DataFrame> {
        let sources = self.source.load(symbol)?;
        let daily = sources
            .iter()
            .find(|t| t.kind() == SourceKind::Daily)
            .ok_or(PanelError::MissingSource(SourceKind::Daily))?;
        let calendar = CanonicalCalendar::from_daily(daily)?;
        let mut aligner = CalendarAligner::with_config(&calendar, self.config.aligner);

        let mut monthly = Vec::with_capacity(sources.len());
        let mut exhausted = 0;
        for table in &sources {
            let (aligned, alignment) = self.resampler.resample(table)?.aligned(&mut aligner)?;
            exhausted += alignment.exhausted.len();
            monthly.push(aligned);
        }
        if exhausted > 0 {
            log::warn!("{symbol}: {exhausted} dates could not be moved onto the trading calendar");
        }

        self.engine.build(symbol, &monthly)
    }

    /// Factor table of `symbol` and its trimmed, windowed rows.
    fn process(&self, symbol: &str) -> Result<(DataFrame, DataFrame)> {
        let table = self.factor_table(symbol)?;
        let trimmed = trim_factor_table(&table, &self.config.panel)
            .map_err(|e| e.for_symbol(symbol))?;
        Ok((table, trimmed))
    }

    /// Build the panel for `universe`.
    ///
    /// Failing symbols are logged and listed in [`Panel::skipped`]; symbols
    /// without rows in the window are left out silently. Fails with
    /// [`PanelError::EmptyInput`] when no symbol contributes a row.
    pub fn build<T: AsRef<str> + Sync>(&self, universe: &[T]) -> Result<Panel> {
        let results: Vec<(&str, Result<(DataFrame, DataFrame)>)> = if self.config.panel.parallel {
            universe
                .par_iter()
                .map(|s| (s.as_ref(), self.process(s.as_ref())))
                .collect()
        } else {
            universe
                .iter()
                .map(|s| (s.as_ref(), self.process(s.as_ref())))
                .collect()
        };

        let mut factor_tables = Vec::new();
        let mut rows = Vec::new();
        let mut skipped = Vec::new();
        for (symbol, result) in results {
            match result {
                Ok((table, trimmed)) => {
                    if trimmed.height() == 0 {
                        log::debug!("{symbol}: no rows in window");
                    } else {
                        rows.push(trimmed);
                    }
                    factor_tables.push((symbol.to_string(), table));
                }
                Err(e) => {
                    log::warn!("skipping {symbol}: {e}");
                    skipped.push((symbol.to_string(), e));
                }
            }
        }

        if rows.is_empty() {
            return Err(PanelError::EmptyInput(format!(
                "no symbol has rows between {} and {}",
                self.config.panel.start_date, self.config.panel.end_date
            )));
        }

        log::info!(
            "panel: {} symbols contributed, {} skipped",
            rows.len(),
            skipped.len()
        );
        let frame = combine_symbol_tables(&rows)?;
        Ok(Panel {
            frame,
            factor_tables,
            skipped,
            registry: self.engine.registry().clone(),
        })
    }
}

/// Drop the warm-up rows and optionally the last row, then keep rows with a
/// `close` inside the window.
pub fn trim_factor_table(df: &DataFrame, config: &PanelConfig) -> Result<DataFrame> {
    let height = df.height();
    let start = config.warmup_periods.min(height);
    let mut end = height;
    if config.drop_last_period && end > start {
        end -= 1;
    }
    let sliced = df.slice(start as i64, end - start);

    let dates = column_dates(&sliced, DATE)?;
    let close = sliced.column("close")?.cast(&DataType::Float64)?;
    let close = close.f64()?;
    let mask: Vec<bool> = dates
        .iter()
        .zip(close)
        .map(|(date, close)| close.is_some() && config.contains(*date))
        .collect();

    Ok(sliced.filter(&BooleanChunked::from_slice("in_window".into(), &mask))?)
}

/// Concatenate symbol tables, stable-sort by date and fill every missing float
/// with the mean of its column over the whole panel.
pub fn combine_symbol_tables(frames: &[DataFrame]) -> Result<DataFrame> {
    let (first, _) = frames
        .split_first()
        .ok_or_else(|| PanelError::EmptyInput("no symbol tables to combine".to_string()))?;

    let fills: Vec<Expr> = first
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::Float64)
        .map(|c| {
            let name = c.name().as_str();
            col(name).fill_null(col(name).mean()).alias(name)
        })
        .collect();

    let lazy: Vec<LazyFrame> = frames.iter().map(|df| df.clone().lazy()).collect();
    let panel = concat(&lazy, UnionArgs::default())?
        .sort([DATE], SortMultipleOptions::default().with_maintain_order(true))
        .with_columns(fills)
        .collect()?;

    Ok(panel)
}
