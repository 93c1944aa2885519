#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/fd-panel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod factors;
pub mod frame;
pub mod panel;
pub mod registry;
pub mod resample;
pub mod source;
pub mod standardize;
pub mod traits;

// Re-export core types
pub use calendar::{AlignerConfig, Alignment, CalendarAligner, CanonicalCalendar};
pub use config::PipelineConfig;
pub use engine::FactorEngine;
pub use error::{PanelError, Result};
pub use frame::{DATE, SYMBOL};
pub use panel::{Panel, PanelBuilder, PanelConfig};
pub use registry::{FactorCategory, FactorInfo, FactorRegistry};
pub use resample::{FrequencyResampler, MonthlyTable, ResampleConfig};
pub use source::{InMemorySource, SourceKind, SourceTable, SymbolSource};
pub use standardize::{factor_columns, is_indicator, standardize_columns, standardize_panel};
pub use traits::{ConfigurableFactor, DataFrequency, FactorConfig, FactorGroup};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
