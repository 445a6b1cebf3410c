//! Shared state of one run and the query/reduce/clip step every stage uses

use tracing::debug;

use irrimetrics_algorithms::spatial::clip_image;
use irrimetrics_algorithms::{AnalysisGrid, Image, Reducer};
use irrimetrics_cloud::{CollectionQuery, ImageryBackend};
use irrimetrics_core::{Region, TimeWindow};

use crate::config::PipelineConfig;

/// A reduced, clipped composite and how many scenes went into it
#[derive(Debug, Clone)]
pub struct Reduced {
    /// Bands under their source names (reducer suffix removed)
    pub image: Image,
    pub scenes: usize,
}

/// Borrowed view of everything a stage needs
pub struct RunContext<'a, B: ?Sized> {
    pub backend: &'a B,
    pub config: &'a PipelineConfig,
    pub region: &'a Region,
    pub grid: &'a AnalysisGrid,
}

impl<B: ?Sized> Clone for RunContext<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for RunContext<'_, B> {}

impl<B: ImageryBackend + ?Sized> RunContext<'_, B> {
    /// Query `dataset` over `window`, reduce per pixel, clip to the region
    /// and select `bands` back under their own names.
    pub async fn reduced(
        &self,
        dataset: &str,
        window: TimeWindow,
        bands: &[String],
        reducer: Reducer,
    ) -> irrimetrics_cloud::Result<Reduced> {
        let query = CollectionQuery {
            dataset: dataset.to_string(),
            window,
            region: self.region.clone(),
            bands: bands.to_vec(),
            grid: self.grid.clone(),
        };
        let stack = self.backend.query_collection(&query).await?;
        let scenes = stack.len();
        debug!(dataset, window = %window, scenes, %reducer, "reducing stack");

        let reduced = self.backend.reduce(&stack, reducer).await?;
        let clipped = clip_image(&reduced, self.region)?;

        let reduced_names: Vec<String> = bands.iter().map(|b| reducer.reduced_name(b)).collect();
        let reduced_names: Vec<&str> = reduced_names.iter().map(String::as_str).collect();
        let source_names: Vec<&str> = bands.iter().map(String::as_str).collect();
        let image = clipped.select(&reduced_names, Some(source_names.as_slice()))?;
        Ok(Reduced { image, scenes })
    }
}
