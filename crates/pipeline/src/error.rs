//! Pipeline errors

use std::fmt;

use thiserror::Error;

use irrimetrics_cloud::CloudError;
use irrimetrics_core::Indicator;

/// Which monthly input failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthInput {
    Optical,
    Precipitation,
}

impl fmt::Display for MonthInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthInput::Optical => f.write_str("optical"),
            MonthInput::Precipitation => f.write_str("precipitation"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resolving region '{name}' in '{dataset}' failed: {cause}")]
    RegionResolution {
        dataset: String,
        name: String,
        #[source]
        cause: CloudError,
    },

    #[error("month {month:02} ({input}) failed: {cause}")]
    MonthComputation {
        month: u32,
        input: MonthInput,
        #[source]
        cause: CloudError,
    },

    #[error("nightlight composite for {year} failed: {cause}")]
    NightlightComputation {
        year: i32,
        #[source]
        cause: CloudError,
    },

    #[error("month {0:02} was computed twice")]
    DuplicateMonth(u32),

    #[error("incomplete {indicator} stack ({count} band(s)): {reason}")]
    IncompleteStack {
        indicator: Indicator,
        count: usize,
        reason: String,
    },

    #[error("expected {expected} band, got '{found}'")]
    UnexpectedBand { expected: &'static str, found: String },

    #[error("export submission rejected: {reason}; reduce the region or split the export into smaller tiles")]
    ExportSubmission { reason: String },

    #[error("backend error: {0}")]
    Backend(#[from] CloudError),

    #[error("core error: {0}")]
    Core(#[from] irrimetrics_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
