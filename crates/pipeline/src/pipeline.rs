//! The end-to-end run: region, twelve months, nightlight, compose, export

use futures::{StreamExt, TryStreamExt};
use tracing::info;

use irrimetrics_algorithms::AnalysisGrid;
use irrimetrics_cloud::{ExportHandle, ImageryBackend, Retrying};
use irrimetrics_core::calendar::month_from_number;
use irrimetrics_core::{CompositeRaster, Region};

use crate::accumulator::BandAccumulator;
use crate::composer::compose;
use crate::config::PipelineConfig;
use crate::context::RunContext;
use crate::error::Result;
use crate::exporter::{export_request, submit_export};
use crate::monthly::build_month;
use crate::nightlight::build_nightlight;
use crate::region::select_region;

/// A composite and the region it was built for
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    pub region: Region,
    pub grid: AnalysisGrid,
    pub composite: CompositeRaster,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub region: Region,
    pub composite: CompositeRaster,
    pub export: ExportHandle,
}

/// Drives one configuration against one backend.
///
/// Every backend call goes through the configured retry policy; a backend
/// that retries its own requests gets one attempt bounded by the policy's
/// query deadline instead.
pub struct Pipeline<B> {
    config: PipelineConfig,
    backend: Retrying<B>,
}

impl<B: ImageryBackend> Pipeline<B> {
    /// Validates `config` before anything is queried
    pub fn new(config: PipelineConfig, backend: B) -> Result<Self> {
        config.validate()?;
        let backend = Retrying::new(backend, config.retry);
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.backend.inner()
    }

    /// Build the 37-band composite without exporting it
    pub async fn compose(&self) -> Result<CompositeOutput> {
        let config = &self.config;
        let region = select_region(&self.backend, &config.region).await?;
        let grid = AnalysisGrid::covering(&region, config.analysis_resolution)?;
        let (rows, cols) = grid.shape();
        info!(region = region.name(), year = config.year, rows, cols, "building composite");

        let ctx = RunContext {
            backend: &self.backend,
            config,
            region: &region,
            grid: &grid,
        };

        let months = (1..=12).map(month_from_number).collect::<irrimetrics_core::Result<Vec<_>>>()?;
        let mut accumulator = BandAccumulator::new();
        futures::stream::iter(months)
            .map(|month| build_month(ctx, month))
            .buffer_unordered(config.max_concurrent_months)
            .try_for_each(|bands| {
                let placed = accumulator.insert(bands);
                async move { placed }
            })
            .await?;

        let nightlight = build_nightlight(ctx).await?;
        let composite = compose(accumulator.into_stacks(), nightlight)?;
        info!(bands = composite.len(), "composite assembled");

        Ok(CompositeOutput {
            region,
            grid,
            composite,
        })
    }

    /// Build the composite and submit it for export
    pub async fn run(&self) -> Result<PipelineOutput> {
        let CompositeOutput { region, composite, .. } = self.compose().await?;
        let request = export_request(&self.config.export, &region);
        let export = submit_export(&self.backend, &composite, &request).await?;
        Ok(PipelineOutput {
            region,
            composite,
            export,
        })
    }
}
