//! # Irrimetrics Pipeline
//!
//! Builds a 37-band composite for an administrative region and year:
//!
//! | bands  | content                                  |
//! |--------|------------------------------------------|
//! | 1-12   | monthly NDVI, `(NIR - Red) / (NIR + Red)` |
//! | 13-24  | monthly greenness, `NIR / Green`         |
//! | 25-36  | monthly rainfall, sum / divisor          |
//! | 37     | annual median nightlight radiance        |
//!
//! The composite is then submitted to the backend for export.
//!
//! ```no_run
//! use irrimetrics_cloud::LocalDirectoryBackend;
//! use irrimetrics_pipeline::{Pipeline, PipelineConfig};
//!
//! # async fn demo() -> irrimetrics_pipeline::Result<()> {
//! let backend = LocalDirectoryBackend::open("data")?;
//! let output = Pipeline::new(PipelineConfig::default(), backend)?.run().await?;
//! println!("{}", output.composite.band_names().join(","));
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod blocking;
pub mod composer;
pub mod config;
pub mod context;
pub mod error;
pub mod exporter;
pub mod monthly;
pub mod nightlight;
pub mod pipeline;
pub mod region;

pub use accumulator::{BandAccumulator, BandStack, BandStacks};
pub use blocking::{compose_blocking, run_blocking};
pub use composer::compose;
pub use config::{
    ExportConfig, NightlightConfig, OpticalConfig, PipelineConfig, PointRegion, PrecipitationConfig,
    RegionConfig,
};
pub use error::{MonthInput, PipelineError, Result};
pub use exporter::{estimate_pixels, export_request, submit_export};
pub use monthly::MonthlyBands;
pub use pipeline::{CompositeOutput, Pipeline, PipelineOutput};
