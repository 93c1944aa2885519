//! Pipeline configuration.

use crate::{
    PanelError, Result, calendar::AlignerConfig, factors::TechnicalConfig, panel::PanelConfig,
    resample::ResampleConfig,
};
use serde::{Deserialize, Serialize};

/// Configuration of every pipeline stage.
///
/// Every field has a default, so a partial document only overrides what it
/// names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Backward search bounds of the calendar aligner
    pub aligner: AlignerConfig,
    /// Monthly resampling options
    pub resample: ResampleConfig,
    /// Technical factor windows
    pub technical: TechnicalConfig,
    /// Panel window and trimming
    pub panel: PanelConfig,
}

impl PipelineConfig {
    /// Check the date ranges of the aligner and the panel, and the technical
    /// factor windows.
    pub fn validate(&self) -> Result<()> {
        if self.aligner.lower_bound > self.aligner.upper_bound {
            return Err(PanelError::InvalidDateRange {
                start: self.aligner.lower_bound.to_string(),
                end: self.aligner.upper_bound.to_string(),
            });
        }
        self.technical.validate()?;
        self.panel.validate()
    }
}
