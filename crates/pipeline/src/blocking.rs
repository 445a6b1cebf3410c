//! Synchronous entry point.
//!
//! Runs the pipeline on an internal current-thread Tokio runtime so
//! callers without an async runtime can use it. Must not be called from
//! inside a runtime.

use irrimetrics_cloud::ImageryBackend;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::{CompositeOutput, Pipeline, PipelineOutput};

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Build and export the composite (blocking)
pub fn run_blocking<B: ImageryBackend>(config: PipelineConfig, backend: B) -> Result<PipelineOutput> {
    let pipeline = Pipeline::new(config, backend)?;
    runtime()?.block_on(pipeline.run())
}

/// Build the composite without exporting it (blocking)
pub fn compose_blocking<B: ImageryBackend>(config: PipelineConfig, backend: B) -> Result<CompositeOutput> {
    let pipeline = Pipeline::new(config, backend)?;
    runtime()?.block_on(pipeline.compose())
}
