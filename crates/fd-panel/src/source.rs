//! Source table schemas.
//!
//! Every raw input belongs to one [`SourceKind`]. The kind fixes the date key,
//! the native frequency and the columns the factor groups read from it, so a
//! table is schema-checked once when it enters the pipeline instead of failing
//! halfway through a join.

use crate::{
    PanelError, Result,
    dates::normalize_date_column,
    frame::ensure_columns,
    traits::DataFrequency,
};
use derive_more::Display;
use polars::prelude::*;
use std::collections::HashMap;

/// Key column of daily sources.
pub const TRADE_DATE: &str = "trade_date";
/// Key column of quarterly sources.
pub const END_DATE: &str = "end_date";

/// Kind of raw per-symbol source table.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKind {
    /// Daily prices
    #[display("daily")]
    Daily,
    /// Daily limit-up / limit-down prices
    #[display("limit")]
    Limit,
    /// Daily adjustment factor
    #[display("adj_factor")]
    AdjFactor,
    /// Daily valuation metrics
    #[display("daily_basic")]
    DailyBasic,
    /// Daily money flow
    #[display("moneyflow")]
    MoneyFlow,
    /// Quarterly derived financial ratios
    #[display("financial")]
    Financial,
    /// Quarterly income statement
    #[display("income")]
    Income,
    /// Quarterly balance sheet
    #[display("balance")]
    Balance,
    /// Quarterly cash flow statement
    #[display("cashflow")]
    CashFlow,
}

impl SourceKind {
    /// All kinds, in join order.
    pub const ALL: [Self; 9] = [
        Self::Daily,
        Self::Limit,
        Self::AdjFactor,
        Self::DailyBasic,
        Self::MoneyFlow,
        Self::Financial,
        Self::Income,
        Self::Balance,
        Self::CashFlow,
    ];

    /// Native frequency of this source.
    pub const fn frequency(self) -> DataFrequency {
        match self {
            Self::Daily | Self::Limit | Self::AdjFactor | Self::DailyBasic | Self::MoneyFlow => {
                DataFrequency::Daily
            }
            Self::Financial | Self::Income | Self::Balance | Self::CashFlow => {
                DataFrequency::Quarterly
            }
        }
    }

    /// Name of the date key column in the raw table.
    pub const fn date_column(self) -> &'static str {
        match self.frequency() {
            DataFrequency::Daily => TRADE_DATE,
            DataFrequency::Quarterly => END_DATE,
        }
    }

    /// Value columns the raw table must carry.
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Daily => &["close"],
            Self::DailyBasic => &["pe", "pe_ttm", "pb", "ps_ttm", "dv_ratio"],
            Self::Financial => &[
                "netprofit_yoy",
                "basic_eps_yoy",
                "roe",
                "roa",
                "current_ratio",
                "grossprofit_margin",
                "netprofit_margin",
                "debt_to_assets",
                "debt_to_eqt",
            ],
            Self::Income => &["n_income", "revenue", "operate_profit"],
            Self::Balance => &["total_assets", "total_liab", "total_cur_liab", "total_cur_assets"],
            Self::Limit | Self::AdjFactor | Self::MoneyFlow | Self::CashFlow => &[],
        }
    }

    /// Whether the factor groups need this source.
    pub const fn is_required(self) -> bool {
        !self.required_columns().is_empty()
    }

    /// Parse a kind from its display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.to_string() == name)
    }
}

/// A schema-checked raw source table for one symbol.
///
/// The date column is normalized to polars `Date` on construction.
#[derive(Debug, Clone)]
pub struct SourceTable {
    kind: SourceKind,
    frame: DataFrame,
}

impl SourceTable {
    /// Validate `frame` against the schema of `kind`.
    pub fn new(kind: SourceKind, frame: DataFrame) -> Result<Self> {
        ensure_columns(&frame, &[kind.date_column()])?;
        ensure_columns(&frame, kind.required_columns())?;
        let frame = normalize_date_column(frame, kind.date_column())?;
        Ok(Self { kind, frame })
    }

    /// Kind of this table.
    pub const fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Underlying frame.
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Provider of raw per-symbol tables.
///
/// Implementations load fresh tables on every call; nothing is cached between
/// symbols.
pub trait SymbolSource: Send + Sync {
    /// Load every available source table for `symbol`.
    fn load(&self, symbol: &str) -> Result<Vec<SourceTable>>;
}

/// In-memory [`SymbolSource`].
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    tables: HashMap<String, Vec<SourceTable>>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table for `symbol`, replacing any previous table of the same kind.
    pub fn insert(&mut self, symbol: &str, table: SourceTable) {
        let tables = self.tables.entry(symbol.to_string()).or_default();
        tables.retain(|t| t.kind() != table.kind());
        tables.push(table);
    }
}

impl SymbolSource for InMemorySource {
    fn load(&self, symbol: &str) -> Result<Vec<SourceTable>> {
        self.tables
            .get(symbol)
            .cloned()
            .ok_or_else(|| PanelError::NotFound(format!("no source tables for {symbol}")))
    }
}
