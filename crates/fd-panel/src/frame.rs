//! DataFrame helpers shared by the pipeline stages.

use crate::{PanelError, Result, dates::column_dates};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};

/// Name of the date key of every monthly table.
pub const DATE: &str = "date";
/// Name of the symbol identifier column.
pub const SYMBOL: &str = "symbol";

/// Column names of `df`, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with [`PanelError::MissingColumn`] on the first absent column.
pub fn ensure_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !has_column(df, c)) {
        Some(missing) => Err(PanelError::MissingColumn((*missing).to_string())),
        None => Ok(()),
    }
}

/// Inner-join frames on `key`, keeping only dates present in every frame.
///
/// When a column name appears in more than one frame the first occurrence wins
/// and later ones are dropped before joining. The result is sorted by `key`.
pub fn inner_join_on(frames: &[DataFrame], key: &str) -> Result<DataFrame> {
    let (first, rest) = frames
        .split_first()
        .ok_or_else(|| PanelError::EmptyInput("no frames to join".to_string()))?;
    ensure_columns(first, &[key])?;

    let mut joined = first.clone();
    for frame in rest {
        ensure_columns(frame, &[key])?;

        let existing: HashSet<String> = column_names(&joined).into_iter().collect();
        let (keep, dropped): (Vec<String>, Vec<String>) = column_names(frame)
            .into_iter()
            .partition(|name| name == key || !existing.contains(name));
        if !dropped.is_empty() {
            log::debug!("dropping duplicate columns before join: {dropped:?}");
        }

        let right = frame.select(keep)?;
        joined = joined
            .lazy()
            .join(
                right.lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
            .collect()?;
    }

    Ok(joined
        .lazy()
        .sort([key], SortMultipleOptions::default().with_maintain_order(true))
        .collect()?)
}

/// Inner-join frames on the monthly [`DATE`] key.
pub fn inner_join_on_date(frames: &[DataFrame]) -> Result<DataFrame> {
    inner_join_on(frames, DATE)
}

/// Keep only the last row for every repeated date, preserving row order.
///
/// Returns the filtered frame and the number of rows removed.
pub fn keep_last_per_date(df: &DataFrame, key: &str) -> Result<(DataFrame, usize)> {
    let dates = column_dates(df, key)?;
    let last_index: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();
    if last_index.len() == dates.len() {
        return Ok((df.clone(), 0));
    }

    let mask: Vec<bool> = dates
        .iter()
        .enumerate()
        .map(|(i, d)| last_index.get(d) == Some(&i))
        .collect();
    let mask = BooleanChunked::from_slice("keep".into(), &mask);
    let removed = dates.len() - last_index.len();
    Ok((df.filter(&mask)?, removed))
}
