//! End-to-end panel construction through the in-memory source.

use approx::assert_relative_eq;
use chrono::{Datelike, NaiveDate, Weekday};
use fd_panel::{
    DATE, InMemorySource, PanelBuilder, PanelConfig, PanelError, PipelineConfig, SYMBOL,
    SourceKind, SourceTable, dates::column_dates, factors::TechnicalConfig,
};
use polars::prelude::*;
use rstest::rstest;
use std::collections::HashMap;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn text(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn weekdays(first_year: i32, last_year: i32) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut current = ymd(first_year, 1, 1);
    while current <= ymd(last_year, 12, 31) {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(current);
        }
        current = current.succ_opt().unwrap();
    }
    dates
}

fn quarter_ends(first_year: i32, last_year: i32) -> Vec<NaiveDate> {
    (first_year..=last_year)
        .flat_map(|y| [ymd(y, 3, 31), ymd(y, 6, 30), ymd(y, 9, 30), ymd(y, 12, 31)])
        .collect()
}

/// Complete source tables for one symbol. With `gappy_roa` the first quarterly
/// `roa` is missing, which forward filling cannot repair.
fn symbol_tables(first_year: i32, last_year: i32, slope: f64, gappy_roa: bool) -> Vec<SourceTable> {
    let days = weekdays(first_year, last_year);
    let n = days.len();
    let trade_dates: Vec<String> = days.iter().copied().map(text).collect();
    let close: Vec<f64> = (0..n)
        .map(|i| 10.0 + slope * i as f64 + (i as f64 / 7.0).sin())
        .collect();

    let daily = df![
        "trade_date" => trade_dates.clone(),
        "close" => close
    ]
    .unwrap();
    let daily_basic = df![
        "trade_date" => trade_dates,
        "pe" => vec![20.0; n],
        "pe_ttm" => vec![25.0; n],
        "pb" => vec![2.0; n],
        "ps_ttm" => vec![4.0; n],
        "dv_ratio" => vec![1.5; n]
    ]
    .unwrap();

    let quarters = quarter_ends(first_year, last_year);
    let q = quarters.len();
    let end_dates: Vec<String> = quarters.iter().copied().map(text).collect();
    let roa: Vec<Option<f64>> = (0..q)
        .map(|i| if gappy_roa && i == 0 { None } else { Some(5.0) })
        .collect();
    let financial = df![
        "end_date" => end_dates.clone(),
        "netprofit_yoy" => vec![10.0; q],
        "basic_eps_yoy" => vec![8.0; q],
        "roe" => vec![12.0; q],
        "roa" => roa,
        "current_ratio" => vec![1.8; q],
        "grossprofit_margin" => vec![30.0; q],
        "netprofit_margin" => vec![12.0; q],
        "debt_to_assets" => vec![40.0; q],
        "debt_to_eqt" => vec![0.6; q]
    ]
    .unwrap();
    let income = df![
        "end_date" => end_dates.clone(),
        "n_income" => (0..q).map(|i| 50.0 + i as f64).collect::<Vec<_>>(),
        "revenue" => vec![400.0; q],
        "operate_profit" => vec![60.0; q]
    ]
    .unwrap();
    let balance = df![
        "end_date" => end_dates,
        "total_assets" => vec![1000.0; q],
        "total_liab" => vec![400.0; q],
        "total_cur_liab" => vec![150.0; q],
        "total_cur_assets" => vec![300.0; q]
    ]
    .unwrap();

    vec![
        SourceTable::new(SourceKind::Daily, daily).unwrap(),
        SourceTable::new(SourceKind::DailyBasic, daily_basic).unwrap(),
        SourceTable::new(SourceKind::Financial, financial).unwrap(),
        SourceTable::new(SourceKind::Income, income).unwrap(),
        SourceTable::new(SourceKind::Balance, balance).unwrap(),
    ]
}

fn universe_source() -> InMemorySource {
    let mut source = InMemorySource::new();
    for table in symbol_tables(2019, 2021, 0.01, false) {
        source.insert("000001.SZ", table);
    }
    for table in symbol_tables(2019, 2021, -0.005, true) {
        source.insert("600000.SH", table);
    }
    for table in symbol_tables(2015, 2016, 0.01, false) {
        source.insert("OLD.SZ", table);
    }
    // Prices only: the value group has nothing to work with.
    for table in symbol_tables(2019, 2021, 0.01, false)
        .into_iter()
        .filter(|t| t.kind() == SourceKind::Daily)
    {
        source.insert("BAD.SZ", table);
    }
    source
}

fn config(parallel: bool) -> PipelineConfig {
    PipelineConfig {
        panel: PanelConfig {
            start_date: ymd(2020, 6, 1),
            end_date: ymd(2021, 6, 30),
            warmup_periods: 12,
            drop_last_period: true,
            parallel,
        },
        ..Default::default()
    }
}

const UNIVERSE: [&str; 5] = ["000001.SZ", "600000.SH", "OLD.SZ", "BAD.SZ", "GONE.SZ"];

#[test]
fn test_factor_table_for_one_symbol() {
    let builder = PanelBuilder::new(universe_source(), config(false)).unwrap();

    let table = builder.factor_table("000001.SZ").unwrap();

    // Quarterly data starts in March 2019, so March 2019..December 2021.
    assert_eq!(table.height(), 34);
    let dates = column_dates(&table, DATE).unwrap();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
    // 2019-03-31 is a Sunday.
    assert_eq!(dates[0], ymd(2019, 3, 29));
    assert_eq!(*dates.last().unwrap(), ymd(2021, 12, 31));
    for date in &dates {
        assert!(!matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
    }

    let target = table.column("predict_value").unwrap().f64().unwrap();
    assert_eq!(target.get(33), None);
    let close = table.column("close").unwrap().f64().unwrap();
    let expected = 100.0 * (close.get(1).unwrap() - close.get(0).unwrap()) / close.get(0).unwrap();
    assert_relative_eq!(target.get(0).unwrap(), expected, epsilon = 1e-9);
}

#[test]
fn test_roa_fallback_applies_to_whole_column() {
    let builder = PanelBuilder::new(universe_source(), config(false)).unwrap();

    let table = builder.factor_table("600000.SH").unwrap();

    let roa = table.column("roa").unwrap().f64().unwrap();
    assert_eq!(roa.null_count(), 0);
    // Every row uses n_income / total_assets, including quarters where the
    // reported roa was present.
    assert!(roa.into_iter().flatten().all(|v| v != 5.0));
    assert_relative_eq!(roa.get(0).unwrap(), 0.05, epsilon = 1e-12);
}

#[test]
fn test_panel_window_skips_and_mean_fill() {
    let builder = PanelBuilder::new(universe_source(), config(false)).unwrap();

    let panel = builder.build(&UNIVERSE).unwrap();
    let frame = panel.frame();

    let skipped: Vec<&str> = panel.skipped().iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(skipped, vec!["BAD.SZ", "GONE.SZ"]);
    assert!(panel.skipped().iter().all(|(_, e)| matches!(e, PanelError::Symbol { .. })));

    // OLD.SZ has no rows in the window but is not an error.
    let symbols = frame.column(SYMBOL).unwrap().str().unwrap();
    let present: Vec<&str> = symbols.into_iter().flatten().collect();
    assert!(!present.contains(&"OLD.SZ"));
    assert_eq!(panel.factor_tables().len(), 3);

    // June 2020 through June 2021 for both symbols.
    assert_eq!(frame.height(), 26);
    let dates = column_dates(frame, DATE).unwrap();
    assert!(dates.windows(2).all(|w| w[0] <= w[1]));
    assert!(dates.iter().all(|d| *d >= ymd(2020, 6, 1) && *d <= ymd(2021, 6, 30)));
    assert_eq!(&present[..2], &["000001.SZ", "600000.SH"]);

    // Volatility needs 24 months; earlier rows are filled with the mean of the
    // defined values over the whole windowed panel.
    let mut raw: HashMap<(String, NaiveDate), Option<f64>> = HashMap::new();
    for (symbol, table) in panel.factor_tables() {
        let table_dates = column_dates(table, DATE).unwrap();
        let vol = table.column("volatility").unwrap().f64().unwrap();
        for (date, value) in table_dates.into_iter().zip(vol) {
            raw.insert((symbol.clone(), date), value);
        }
    }
    let defined: Vec<f64> = present
        .iter()
        .zip(&dates)
        .filter_map(|(s, d)| raw[&(s.to_string(), *d)])
        .collect();
    assert!(!defined.is_empty() && defined.len() < 26);
    let mean = defined.iter().sum::<f64>() / defined.len() as f64;

    let filled = frame.column("volatility").unwrap().f64().unwrap();
    assert_eq!(filled.null_count(), 0);
    for ((symbol, date), value) in present.iter().zip(&dates).zip(filled) {
        let expected = raw[&(symbol.to_string(), *date)].unwrap_or(mean);
        assert_relative_eq!(value.unwrap(), expected, epsilon = 1e-9);
    }
}

#[rstest]
#[case(true)]
#[case(false)]
fn test_parallel_build_matches_sequential(#[case] parallel: bool) {
    let reference = PanelBuilder::new(universe_source(), config(false))
        .unwrap()
        .build(&UNIVERSE)
        .unwrap();
    let panel = PanelBuilder::new(universe_source(), config(parallel))
        .unwrap()
        .build(&UNIVERSE)
        .unwrap();

    assert!(panel.frame().equals_missing(reference.frame()));
}

#[test]
fn test_standardized_panel() {
    let panel = PanelBuilder::new(universe_source(), config(true))
        .unwrap()
        .build(&UNIVERSE)
        .unwrap();

    let standardized = panel.standardized().unwrap();

    assert_eq!(standardized.shape(), panel.frame().shape());
    let close = standardized.column("close").unwrap().f64().unwrap();
    let mean = close.into_iter().flatten().sum::<f64>() / close.len() as f64;
    assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
    // Constant inputs are only centered.
    let bp = standardized.column("bp").unwrap().f64().unwrap();
    assert!(bp.into_iter().flatten().all(|v| v.abs() < 1e-12));
}

#[test]
fn test_standardized_panel_with_custom_technical_windows() {
    let config = PipelineConfig {
        technical: TechnicalConfig {
            ma_windows: vec![2, 4],
            volatility_window: 6,
            rsi_period: 5,
            crossovers: vec![(2, 4)],
        },
        ..config(false)
    };
    let panel = PanelBuilder::new(universe_source(), config)
        .unwrap()
        .build(&UNIVERSE)
        .unwrap();
    assert!(panel.frame().column("ma3").is_err());

    let standardized = panel.standardized().unwrap();

    assert_eq!(standardized.shape(), panel.frame().shape());
    let cross = standardized.column("ma2_cross_ma4").unwrap();
    assert_eq!(cross.dtype(), &DataType::Int32);
    let raw = panel.frame().column("ma2_cross_ma4").unwrap();
    assert!(cross.as_materialized_series().equals_missing(raw.as_materialized_series()));
    for name in ["ma2", "ma4", "volatility"] {
        let values = standardized.column(name).unwrap().f64().unwrap();
        let mean = values.into_iter().flatten().sum::<f64>() / values.len() as f64;
        assert_relative_eq!(mean, 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_empty_universe_window() {
    let mut config = config(false);
    config.panel.start_date = ymd(2030, 1, 1);
    config.panel.end_date = ymd(2030, 12, 31);

    let builder = PanelBuilder::new(universe_source(), config).unwrap();

    assert!(matches!(
        builder.build(&UNIVERSE),
        Err(PanelError::EmptyInput(_))
    ));
}
