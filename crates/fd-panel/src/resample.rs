//! Daily and quarterly to monthly resampling.
//!
//! Both conversions keep the last observation of every calendar month and
//! forward-fill months without one. Quarterly tables are then extended past
//! their last report so they still cover the following months.

use crate::{
    PanelError, Result,
    calendar::{Alignment, CalendarAligner},
    dates::{column_dates, date_series, month_end, month_ends, next_month_end, normalize_date_column},
    frame::{DATE, column_names, ensure_columns, keep_last_per_date},
    source::{SourceKind, SourceTable},
    traits::DataFrequency,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for monthly resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    /// Synthetic months appended after the last quarterly report (default: 2)
    pub tail_extensions: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self { tail_extensions: 2 }
    }
}

/// A source table at monthly frequency, keyed by `date`.
#[derive(Debug, Clone)]
pub struct MonthlyTable {
    kind: SourceKind,
    frame: DataFrame,
}

impl MonthlyTable {
    /// Wrap an already monthly frame. The frame must have a `date` column.
    pub fn new(kind: SourceKind, frame: DataFrame) -> Result<Self> {
        ensure_columns(&frame, &[DATE])?;
        Ok(Self { kind, frame })
    }

    /// Source kind this table came from.
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Move every month label onto the aligner's calendar.
    ///
    /// If two months land on the same trading date the later month is kept.
    pub fn aligned(&self, aligner: &mut CalendarAligner<'_>) -> Result<(Self, Alignment)> {
        let (frame, alignment) = aligner.align_frame(&self.frame, DATE)?;
        let (frame, removed) = keep_last_per_date(&frame, DATE)?;
        if removed > 0 {
            log::warn!(
                "{} table: {removed} months collapsed onto an earlier trading date",
                self.kind
            );
        }
        Ok((
            Self {
                kind: self.kind,
                frame,
            },
            alignment,
        ))
    }
}

/// Converts daily and quarterly tables to monthly tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrequencyResampler {
    config: ResampleConfig,
}

impl FrequencyResampler {
    /// Resampler with the given configuration.
    pub const fn new(config: ResampleConfig) -> Self {
        Self { config }
    }

    /// Resample a source table according to its native frequency.
    pub fn resample(&self, table: &SourceTable) -> Result<MonthlyTable> {
        let kind = table.kind();
        let frame = match kind.frequency() {
            DataFrequency::Daily => self.daily_to_monthly(table.frame(), kind.date_column())?,
            DataFrequency::Quarterly => {
                self.quarterly_to_monthly(table.frame(), kind.date_column())?
            }
        };
        MonthlyTable::new(kind, frame)
    }

    /// One row per calendar month between the first and last observation,
    /// labelled with the month-end date in a `date` column.
    ///
    /// Each column takes its last non-missing value of the month; a month
    /// without one repeats the previous month.
    pub fn daily_to_monthly(&self, df: &DataFrame, date_column: &str) -> Result<DataFrame> {
        month_last_filled(df, date_column)
    }

    /// [`Self::daily_to_monthly`], then append copies of the last row for the
    /// configured number of following months.
    pub fn quarterly_to_monthly(&self, df: &DataFrame, date_column: &str) -> Result<DataFrame> {
        let mut monthly = month_last_filled(df, date_column)?;
        for _ in 0..self.config.tail_extensions {
            monthly = extend_tail(&monthly)?;
        }
        Ok(monthly)
    }
}

fn month_last_filled(df: &DataFrame, date_column: &str) -> Result<DataFrame> {
    ensure_columns(df, &[date_column])?;
    if df.height() == 0 {
        return Err(PanelError::EmptyInput(format!(
            "cannot resample a table without rows (key {date_column})"
        )));
    }

    let df = normalize_date_column(df.clone(), date_column)?;
    let labels: Vec<_> = column_dates(&df, date_column)?
        .into_iter()
        .map(month_end)
        .collect();
    let (first, last) = match (labels.iter().min(), labels.iter().max()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(PanelError::EmptyInput(date_column.to_string())),
    };

    let mut labelled = df.drop(date_column)?;
    let value_columns = column_names(&labelled);
    labelled.with_column(date_series(DATE, &labels)?)?;

    let grouped = labelled
        .lazy()
        .sort([DATE], SortMultipleOptions::default().with_maintain_order(true))
        .group_by_stable([col(DATE)])
        .agg(
            value_columns
                .iter()
                .map(|c| col(c.as_str()).drop_nulls().last())
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let months = DataFrame::new(vec![date_series(DATE, &month_ends(first, last))?.into()])?;
    let filled = months
        .lazy()
        .join(
            grouped.lazy(),
            [col(DATE)],
            [col(DATE)],
            JoinArgs::new(JoinType::Left),
        )
        .sort([DATE], SortMultipleOptions::default())
        .collect()?
        .fill_null(FillNullStrategy::Forward(None))?;

    Ok(filled)
}

/// Append a copy of the last row dated one month later.
fn extend_tail(df: &DataFrame) -> Result<DataFrame> {
    let dates = column_dates(df, DATE)?;
    let last = dates
        .last()
        .copied()
        .ok_or_else(|| PanelError::EmptyInput("cannot extend a table without rows".to_string()))?;

    let mut row = df.tail(Some(1));
    row.with_column(date_series(DATE, &[next_month_end(last)])?)?;
    Ok(df.vstack(&row)?)
}
