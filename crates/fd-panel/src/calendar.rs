//! Trading calendar alignment.
//!
//! Monthly tables are labelled with calendar month-ends, which are often not
//! trading days. [`CalendarAligner`] moves each such date back to the closest
//! earlier date of the symbol's [`CanonicalCalendar`].

use crate::{
    Result,
    dates::{column_dates, date_series},
    source::{SourceKind, SourceTable},
};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The valid trading dates of one symbol.
///
/// Built from the symbol's raw daily price table and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl CanonicalCalendar {
    /// Calendar from an explicit set of dates.
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// Calendar from the unique trade dates of a daily price table.
    pub fn from_daily(table: &SourceTable) -> Result<Self> {
        if table.kind() != SourceKind::Daily {
            return Err(crate::PanelError::MissingSource(SourceKind::Daily));
        }
        let dates = column_dates(table.frame(), table.kind().date_column())?;
        Ok(Self::new(dates))
    }

    /// Whether `date` is a trading date.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }
}

/// Bounds of the backward search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignerConfig {
    /// Earliest date the search may reach (default: 2010-01-01)
    pub lower_bound: NaiveDate,
    /// Latest date the search may reach (default: 2023-12-31)
    pub upper_bound: NaiveDate,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            lower_bound: NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or(NaiveDate::MIN),
            upper_bound: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

/// Output of one alignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alignment {
    /// Corrected dates, one per input date.
    pub dates: Vec<NaiveDate>,
    /// Distinct original dates whose search left the bounds before reaching a
    /// trading date. Their corrected value may not be a trading date.
    pub exhausted: Vec<NaiveDate>,
}

/// Maps dates onto a [`CanonicalCalendar`] by stepping backward one day at a
/// time.
///
/// Each distinct invalid date is searched once; later occurrences reuse the
/// stored correction. The map lives as long as the aligner, so one aligner
/// should serve exactly one symbol.
#[derive(Debug)]
pub struct CalendarAligner<'a> {
    calendar: &'a CanonicalCalendar,
    config: AlignerConfig,
    corrections: HashMap<NaiveDate, NaiveDate>,
}

impl<'a> CalendarAligner<'a> {
    /// Aligner with default bounds.
    pub fn new(calendar: &'a CanonicalCalendar) -> Self {
        Self::with_config(calendar, AlignerConfig::default())
    }

    /// Aligner with explicit bounds.
    pub fn with_config(calendar: &'a CanonicalCalendar, config: AlignerConfig) -> Self {
        Self {
            calendar,
            config,
            corrections: HashMap::new(),
        }
    }

    /// Corrections computed so far, keyed by original date.
    pub const fn corrections(&self) -> &HashMap<NaiveDate, NaiveDate> {
        &self.corrections
    }

    /// Correct every date of `dates`.
    ///
    /// Valid dates are returned unchanged and never enter the correction map.
    pub fn align(&mut self, dates: &[NaiveDate]) -> Alignment {
        let mut out = Alignment {
            dates: Vec::with_capacity(dates.len()),
            exhausted: Vec::new(),
        };

        for &date in dates {
            if let Some(&corrected) = self.corrections.get(&date) {
                out.dates.push(corrected);
                continue;
            }
            if self.calendar.contains(date) {
                out.dates.push(date);
                continue;
            }

            let (corrected, found) = self.search_backward(date);
            if !found {
                log::warn!(
                    "no trading date found for {date} within {}..={}, keeping {corrected}",
                    self.config.lower_bound,
                    self.config.upper_bound
                );
                out.exhausted.push(date);
            }
            self.corrections.insert(date, corrected);
            out.dates.push(corrected);
        }

        out
    }

    /// Replace the `column` dates of `df` with their corrections.
    pub fn align_frame(&mut self, df: &DataFrame, column: &str) -> Result<(DataFrame, Alignment)> {
        let dates = column_dates(df, column)?;
        let alignment = self.align(&dates);

        let mut aligned = df.clone();
        aligned.with_column(date_series(column, &alignment.dates)?)?;
        Ok((aligned, alignment))
    }

    /// Step back from an invalid `date` until a trading date is reached or a
    /// bound is crossed. The bound is checked after every step, so at least
    /// one step is always taken.
    fn search_backward(&self, date: NaiveDate) -> (NaiveDate, bool) {
        let mut current = date;
        loop {
            match current.pred_opt() {
                Some(previous) => current = previous,
                None => return (current, false),
            }
            if current > self.config.upper_bound || current < self.config.lower_bound {
                return (current, false);
            }
            if self.calendar.contains(current) {
                return (current, true);
            }
        }
    }
}
