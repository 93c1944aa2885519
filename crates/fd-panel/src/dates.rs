//! Date parsing and month arithmetic.
//!
//! Dates cross the boundary either as `YYYYMMDD` or `YYYY-MM-DD` text (or as an
//! integer `YYYYMMDD` when a CSV reader infers the column type). Everything past
//! the boundary works on polars `Date` columns and [`NaiveDate`] values.

use crate::{PanelError, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc};
use polars::prelude::*;

fn unix_epoch() -> NaiveDate {
    DateTime::<Utc>::UNIX_EPOCH.date_naive()
}

/// Parse a boundary date in `YYYYMMDD` or `YYYY-MM-DD` form.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    let format = if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        "%Y%m%d"
    } else {
        "%Y-%m-%d"
    };
    NaiveDate::parse_from_str(text, format).map_err(|_| PanelError::InvalidDate(text.to_string()))
}

/// Days since the Unix epoch, the physical representation of a polars `Date`.
pub fn to_epoch_days(date: NaiveDate) -> i32 {
    // Every NaiveDate lies within i32 days of the epoch.
    date.signed_duration_since(unix_epoch()).num_days() as i32
}

/// Inverse of [`to_epoch_days`].
pub fn from_epoch_days(days: i32) -> Result<NaiveDate> {
    unix_epoch()
        .checked_add_signed(TimeDelta::days(i64::from(days)))
        .ok_or_else(|| PanelError::InvalidDate(format!("{days} days from epoch")))
}

/// Last calendar day of the month containing `date`.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

/// Month-end of the month following the one containing `date`.
pub fn next_month_end(date: NaiveDate) -> NaiveDate {
    month_end(month_end(date).succ_opt().unwrap_or(NaiveDate::MAX))
}

/// Every month-end from the month of `first` to the month of `last`, inclusive.
pub fn month_ends(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let last = month_end(last);
    let mut current = month_end(first);
    let mut out = Vec::new();
    while current <= last {
        out.push(current);
        if current == NaiveDate::MAX {
            break;
        }
        current = next_month_end(current);
    }
    out
}

/// Build a polars `Date` series from calendar dates.
pub fn date_series(name: &str, dates: &[NaiveDate]) -> Result<Series> {
    let days: Vec<i32> = dates.iter().map(|d| to_epoch_days(*d)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?)
}

/// Read a `Date` column back into calendar dates.
///
/// Fails on nulls and on columns that have not been through
/// [`normalize_date_column`].
pub fn column_dates(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let column = df
        .column(name)
        .map_err(|_| PanelError::MissingColumn(name.to_string()))?;
    if column.dtype() != &DataType::Date {
        return Err(PanelError::InvalidDate(format!(
            "column {name} has type {}, expected date",
            column.dtype()
        )));
    }
    let days = column.cast(&DataType::Int32)?;
    days.i32()?
        .into_iter()
        .map(|value| {
            value
                .ok_or_else(|| PanelError::InvalidDate(format!("null in column {name}")))
                .and_then(from_epoch_days)
        })
        .collect()
}

/// Convert a boundary date column to polars `Date` in place.
///
/// Accepts text (`YYYYMMDD` / `YYYY-MM-DD`), integer `YYYYMMDD`, `Datetime`
/// and `Date` columns.
pub fn normalize_date_column(mut df: DataFrame, name: &str) -> Result<DataFrame> {
    let column = df
        .column(name)
        .map_err(|_| PanelError::MissingColumn(name.to_string()))?;

    let dates: Vec<NaiveDate> = match column.dtype() {
        DataType::Date => return Ok(df),
        DataType::Datetime(_, _) => {
            let converted = column.cast(&DataType::Date)?;
            df.with_column(converted)?;
            return Ok(df);
        }
        DataType::String => column
            .str()?
            .into_iter()
            .map(|value| {
                value
                    .ok_or_else(|| PanelError::InvalidDate(format!("null in column {name}")))
                    .and_then(parse_date)
            })
            .collect::<Result<_>>()?,
        DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => {
            let widened = column.cast(&DataType::Int64)?;
            widened
                .i64()?
                .into_iter()
                .map(|value| {
                    value
                        .ok_or_else(|| PanelError::InvalidDate(format!("null in column {name}")))
                        .and_then(|v| parse_date(&v.to_string()))
                })
                .collect::<Result<_>>()?
        }
        other => {
            return Err(PanelError::InvalidDate(format!(
                "column {name} has unsupported type {other}"
            )));
        }
    };

    df.with_column(date_series(name, &dates)?)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case("20230131", ymd(2023, 1, 31))]
    #[case("2023-01-31", ymd(2023, 1, 31))]
    #[case(" 20200229 ", ymd(2020, 2, 29))]
    fn test_parse_date_formats(#[case] text: &str, #[case] expected: NaiveDate) {
        assert_eq!(parse_date(text).unwrap(), expected);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(parse_date("2023/01/31"), Err(PanelError::InvalidDate(_))));
        assert!(parse_date("20230230").is_err());
    }

    #[rstest]
    #[case(ymd(1970, 1, 1), 0)]
    #[case(ymd(1970, 1, 2), 1)]
    #[case(ymd(1969, 12, 31), -1)]
    #[case(ymd(2020, 1, 1), 18_262)]
    fn test_epoch_days(#[case] date: NaiveDate, #[case] days: i32) {
        assert_eq!(to_epoch_days(date), days);
        assert_eq!(from_epoch_days(days).unwrap(), date);
    }

    #[test]
    fn test_epoch_days_match_polars_dates() {
        let series = Series::new("d".into(), [ymd(2015, 6, 30)]);
        assert_eq!(series.dtype(), &DataType::Date);
        let physical = series.cast(&DataType::Int32).unwrap();
        assert_eq!(physical.i32().unwrap().get(0), Some(to_epoch_days(ymd(2015, 6, 30))));
        assert!(from_epoch_days(i32::MAX).is_err());
    }

    #[rstest]
    #[case(ymd(2020, 2, 3), ymd(2020, 2, 29))]
    #[case(ymd(2021, 2, 28), ymd(2021, 2, 28))]
    #[case(ymd(2021, 12, 1), ymd(2021, 12, 31))]
    fn test_month_end(#[case] date: NaiveDate, #[case] expected: NaiveDate) {
        assert_eq!(month_end(date), expected);
    }

    #[test]
    fn test_next_month_end_crosses_year() {
        assert_eq!(next_month_end(ymd(2023, 9, 30)), ymd(2023, 10, 31));
        assert_eq!(next_month_end(ymd(2023, 12, 31)), ymd(2024, 1, 31));
        assert_eq!(next_month_end(ymd(2024, 1, 31)), ymd(2024, 2, 29));
    }

    #[test]
    fn test_month_ends_inclusive() {
        let months = month_ends(ymd(2022, 11, 15), ymd(2023, 2, 1));
        assert_eq!(
            months,
            vec![ymd(2022, 11, 30), ymd(2022, 12, 31), ymd(2023, 1, 31), ymd(2023, 2, 28)]
        );
    }

    #[test]
    fn test_normalize_text_and_integer_columns() {
        let text = df![
            "trade_date" => ["20230105", "2023-01-06"],
            "close" => [1.0, 2.0]
        ]
        .unwrap();
        let text = normalize_date_column(text, "trade_date").unwrap();
        assert_eq!(
            column_dates(&text, "trade_date").unwrap(),
            vec![ymd(2023, 1, 5), ymd(2023, 1, 6)]
        );

        let ints = df![
            "end_date" => [20221231i64, 20230331],
            "revenue" => [10.0, 11.0]
        ]
        .unwrap();
        let ints = normalize_date_column(ints, "end_date").unwrap();
        assert_eq!(
            column_dates(&ints, "end_date").unwrap(),
            vec![ymd(2022, 12, 31), ymd(2023, 3, 31)]
        );
    }

    #[test]
    fn test_normalize_missing_column() {
        let df = df!["close" => [1.0]].unwrap();
        assert!(matches!(
            normalize_date_column(df, "trade_date"),
            Err(PanelError::MissingColumn(c)) if c == "trade_date"
        ));
    }
}
