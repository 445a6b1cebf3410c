//! The imagery backend interface.
//!
//! A backend discovers scenes, reduces stacks and accepts exports. Every
//! call is a plain request/response returning concrete in-memory images;
//! nothing is deferred.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use irrimetrics_algorithms::temporal::reduce_stack;
use irrimetrics_algorithms::{AnalysisGrid, Image, Reducer};
use irrimetrics_core::{CompositeRaster, FeatureCollection, Region, TimeWindow};

use crate::error::{CloudError, Result};
use crate::retry::RetryPolicy;

/// Lookup of an administrative area inside a region dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionQuery {
    pub dataset: String,
    pub name: String,
    /// Property holding the area name; `None` matches feature ids
    pub property: Option<String>,
}

/// Scenes of one dataset within a window, restricted to a region
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    pub dataset: String,
    pub window: TimeWindow,
    pub region: Region,
    /// Band names each returned scene must carry, in this order
    pub bands: Vec<String>,
    /// Grid the returned scenes are resampled onto
    pub grid: AnalysisGrid,
}

/// One acquisition, already on the analysis grid
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub image: Image,
}

/// The scenes a collection query returned, in acquisition order
#[derive(Debug, Clone)]
pub struct ImageStack {
    pub dataset: String,
    pub bands: Vec<String>,
    pub grid: AnalysisGrid,
    pub scenes: Vec<Scene>,
}

impl ImageStack {
    /// Stack answering `query`; scenes are sorted by acquisition time
    pub fn for_query(query: &CollectionQuery, mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by(|a, b| a.acquired.cmp(&b.acquired).then_with(|| a.id.cmp(&b.id)));
        Self {
            dataset: query.dataset.clone(),
            bands: query.bands.clone(),
            grid: query.grid.clone(),
            scenes,
        }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Per-pixel reduction on the local engine.
    ///
    /// Output bands are named `<band>_<reducer>`; an empty stack yields
    /// all-NaN bands on the stack's grid.
    pub fn reduce_locally(&self, reducer: Reducer) -> Result<Image> {
        let images: Vec<Image> = self.scenes.iter().map(|s| s.image.clone()).collect();
        let bands: Vec<&str> = self.bands.iter().map(String::as_str).collect();
        Ok(reduce_stack(&images, reducer, &bands, &self.grid)?)
    }
}

/// Output file format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FileFormat {
    #[default]
    GeoTiff,
}

/// Where an export should land
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportDestination {
    /// The backend's own export area (the hosted engine's Drive)
    #[default]
    Drive,
    /// A directory on the local filesystem
    Directory(PathBuf),
}

impl fmt::Display for ExportDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportDestination::Drive => f.write_str("drive"),
            ExportDestination::Directory(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Parameters of an export submission
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub description: String,
    pub folder: Option<String>,
    pub destination: ExportDestination,
    /// Output pixel size in metres
    pub scale: f64,
    /// Ceiling on the number of output pixels
    pub max_pixels: u64,
    pub region: Region,
    /// Advisory: lets a hosted engine skip tiles with no valid pixels.
    /// Local exporters still write every band in full.
    pub skip_empty_tiles: bool,
    pub file_format: FileFormat,
}

/// Lifecycle state of a submitted export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportState {
    /// Accepted; the backend finishes it on its own schedule
    Submitted,
    /// Already written
    Completed,
}

/// Receipt for an accepted export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportHandle {
    pub id: String,
    pub description: String,
    pub destination: ExportDestination,
    pub state: ExportState,
    /// File written, for backends that export synchronously
    pub location: Option<PathBuf>,
}

/// Source of regions and scenes, and sink for exports.
#[async_trait]
pub trait ImageryBackend: Send + Sync {
    /// Features of a region dataset matching the query
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection>;

    /// Scenes of a dataset intersecting the region within the window
    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack>;

    /// Per-pixel reduction of a stack
    async fn reduce(&self, stack: &ImageStack, reducer: Reducer) -> Result<Image> {
        stack.reduce_locally(reducer)
    }

    /// Submit a composite for export
    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle>;

    /// Whether this backend already retries failed requests itself.
    ///
    /// [`Retrying`] gives such a backend one attempt bounded by the
    /// policy's query deadline instead of layering its own retries on top.
    fn retries_internally(&self) -> bool {
        false
    }
}

#[async_trait]
impl<B: ImageryBackend + ?Sized> ImageryBackend for Arc<B> {
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection> {
        (**self).resolve_region(query).await
    }

    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack> {
        (**self).query_collection(query).await
    }

    async fn reduce(&self, stack: &ImageStack, reducer: Reducer) -> Result<Image> {
        (**self).reduce(stack, reducer).await
    }

    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        (**self).export_raster(composite, request).await
    }

    fn retries_internally(&self) -> bool {
        (**self).retries_internally()
    }
}

/// Backend decorator applying a [`RetryPolicy`] to every call.
///
/// Exports are not resubmitted after a timeout: the first attempt may
/// still complete, and a second submission would race it.
#[derive(Debug, Clone)]
pub struct Retrying<B> {
    inner: B,
    policy: RetryPolicy,
}

impl<B: ImageryBackend> Retrying<B> {
    pub fn new(inner: B, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Policy actually applied to calls into the inner backend
    pub fn effective_policy(&self) -> RetryPolicy {
        if self.inner.retries_internally() {
            self.policy.deadline_only()
        } else {
            self.policy
        }
    }
}

#[async_trait]
impl<B: ImageryBackend> ImageryBackend for Retrying<B> {
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection> {
        let inner = &self.inner;
        self.effective_policy()
            .run("resolve_region", move || inner.resolve_region(query))
            .await
    }

    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack> {
        let inner = &self.inner;
        self.effective_policy()
            .run("query_collection", move || inner.query_collection(query))
            .await
    }

    async fn reduce(&self, stack: &ImageStack, reducer: Reducer) -> Result<Image> {
        let inner = &self.inner;
        self.effective_policy()
            .run("reduce", move || inner.reduce(stack, reducer))
            .await
    }

    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        let inner = &self.inner;
        let resubmit = |e: &CloudError| e.is_transient() && !matches!(e, CloudError::Timeout { .. });
        self.effective_policy()
            .run_when("export_raster", resubmit, move || inner.export_raster(composite, request))
            .await
    }

    fn retries_internally(&self) -> bool {
        true
    }
}
