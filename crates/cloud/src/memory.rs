//! In-memory backend for fixtures and tests.
//!
//! Regions and scenes are registered up front. Exports are recorded, not
//! written. Failures can be injected per dataset to exercise retry paths.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use irrimetrics_algorithms::spatial::resample_image;
use irrimetrics_core::{CompositeRaster, FeatureCollection};

use crate::backend::{
    CollectionQuery, ExportHandle, ExportRequest, ExportState, ImageStack, ImageryBackend,
    RegionQuery, Scene,
};
use crate::error::{CloudError, Result};

/// Fault target for export submissions
pub const EXPORT_TARGET: &str = "export";

#[derive(Debug, Clone, Copy)]
enum Fault {
    Transient { remaining: u32 },
    Permanent,
}

/// An export the backend accepted
#[derive(Debug, Clone)]
pub struct RecordedExport {
    pub composite: CompositeRaster,
    pub request: ExportRequest,
    pub handle: ExportHandle,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    regions: HashMap<String, FeatureCollection>,
    collections: HashMap<String, Vec<Scene>>,
    faults: Mutex<HashMap<String, Fault>>,
    queries: Mutex<Vec<String>>,
    exports: Mutex<Vec<RecordedExport>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a region dataset
    pub fn with_regions(mut self, dataset: impl Into<String>, features: FeatureCollection) -> Self {
        self.regions.insert(dataset.into(), features);
        self
    }

    /// Register an (initially empty) collection
    pub fn with_collection(mut self, dataset: impl Into<String>) -> Self {
        self.collections.entry(dataset.into()).or_default();
        self
    }

    /// Register one scene of a collection
    pub fn with_scene(mut self, dataset: impl Into<String>, scene: Scene) -> Self {
        self.add_scene(dataset, scene);
        self
    }

    pub fn add_scene(&mut self, dataset: impl Into<String>, scene: Scene) {
        self.collections.entry(dataset.into()).or_default().push(scene);
    }

    /// Make the next `times` calls touching `target` (a dataset id or
    /// [`EXPORT_TARGET`]) fail with a transient network error
    pub fn fail_transiently(&self, target: impl Into<String>, times: u32) {
        locked(&self.faults).insert(target.into(), Fault::Transient { remaining: times });
    }

    /// Make every call touching `target` fail with a (retryable) network error
    pub fn fail_always(&self, target: impl Into<String>) {
        locked(&self.faults).insert(target.into(), Fault::Permanent);
    }

    /// Remove any injected fault for `target`
    pub fn heal(&self, target: &str) {
        locked(&self.faults).remove(target);
    }

    /// Exports accepted so far, in submission order
    pub fn exports(&self) -> Vec<RecordedExport> {
        locked(&self.exports).clone()
    }

    /// Dataset ids of every collection query received, in arrival order
    pub fn queries(&self) -> Vec<String> {
        locked(&self.queries).clone()
    }

    fn check_fault(&self, target: &str) -> Result<()> {
        let mut faults = locked(&self.faults);
        match faults.get_mut(target) {
            Some(Fault::Permanent) => Err(CloudError::Network(format!("injected failure for '{target}'"))),
            Some(Fault::Transient { remaining }) if *remaining > 0 => {
                *remaining -= 1;
                Err(CloudError::Network(format!("injected transient failure for '{target}'")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ImageryBackend for MemoryBackend {
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection> {
        self.check_fault(&query.dataset)?;
        let dataset = self.regions.get(&query.dataset).ok_or_else(|| CloudError::NotFound {
            kind: "region dataset",
            id: query.dataset.clone(),
        })?;

        let mut matches = FeatureCollection::new();
        for feature in dataset.iter() {
            if feature.is_named(query.property.as_deref(), &query.name) {
                matches.push(feature.clone());
            }
        }
        Ok(matches)
    }

    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack> {
        locked(&self.queries).push(query.dataset.clone());
        self.check_fault(&query.dataset)?;
        let scenes = self.collections.get(&query.dataset).ok_or_else(|| CloudError::NotFound {
            kind: "collection",
            id: query.dataset.clone(),
        })?;

        let bands: Vec<&str> = query.bands.iter().map(String::as_str).collect();
        let mut selected = Vec::new();
        for scene in scenes {
            if !query.window.contains(scene.acquired.date_naive()) {
                continue;
            }
            let image = scene.image.select(&bands, None)?;
            let image = resample_image(&image, &query.grid)?;
            selected.push(Scene {
                id: scene.id.clone(),
                acquired: scene.acquired,
                image,
            });
        }
        debug!(dataset = %query.dataset, window = %query.window, scenes = selected.len(), "memory query");
        Ok(ImageStack::for_query(query, selected))
    }

    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        self.check_fault(EXPORT_TARGET)?;
        let mut exports = locked(&self.exports);
        let handle = ExportHandle {
            id: format!("memory-export-{}", exports.len() + 1),
            description: request.description.clone(),
            destination: request.destination.clone(),
            state: ExportState::Submitted,
            location: None,
        };
        exports.push(RecordedExport {
            composite: composite.clone(),
            request: request.clone(),
            handle: handle.clone(),
        });
        Ok(handle)
    }
}
