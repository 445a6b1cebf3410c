//! Backend over a directory of GeoTIFF scenes.
//!
//! Layout:
//!
//! ```text
//! <root>/catalog.json
//! <root>/regions/ind_states.geojson
//! <root>/scenes/LC8_20160105_B5.tif
//! ```
//!
//! `catalog.json` maps region dataset ids to GeoJSON files and collection
//! ids to scenes (id, acquisition time, band name -> GeoTIFF). Relative
//! paths resolve against the root. Exports are written under
//! `<root>/exports` unless the request names a directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use irrimetrics_algorithms::spatial::resample_nearest;
use irrimetrics_algorithms::{AnalysisGrid, Image};
use irrimetrics_core::io::read_geotiff;
use irrimetrics_core::{CompositeRaster, FeatureCollection, Raster};

use crate::backend::{
    CollectionQuery, ExportHandle, ExportRequest, ImageStack, ImageryBackend, RegionQuery, Scene,
};
use crate::error::{CloudError, Result};
use crate::export::LocalExporter;

/// One scene entry of `catalog.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogScene {
    pub id: String,
    pub datetime: DateTime<Utc>,
    /// Band name -> GeoTIFF path
    pub bands: HashMap<String, PathBuf>,
}

/// Contents of `catalog.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Region dataset id -> GeoJSON path
    #[serde(default)]
    pub regions: HashMap<String, PathBuf>,
    /// Collection id -> scenes
    #[serde(default)]
    pub collections: HashMap<String, Vec<CatalogScene>>,
}

impl Catalog {
    pub const FILE_NAME: &'static str = "catalog.json";

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LocalDirectoryBackend {
    root: PathBuf,
    catalog: Catalog,
    exporter: LocalExporter,
}

impl LocalDirectoryBackend {
    /// Open a catalog directory
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let catalog = Catalog::read(root.join(Catalog::FILE_NAME))?;
        info!(
            root = %root.display(),
            regions = catalog.regions.len(),
            collections = catalog.collections.len(),
            "opened local catalog"
        );
        let exporter = LocalExporter::new(root.join("exports"));
        Ok(Self {
            root,
            catalog,
            exporter,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// Run blocking file work off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CloudError::Io(std::io::Error::other(e)))?
}

fn load_scene(
    id: String,
    acquired: DateTime<Utc>,
    files: Vec<(String, PathBuf)>,
    grid: &AnalysisGrid,
) -> Result<Scene> {
    let mut image = Image::new();
    for (band, path) in files {
        let raster: Raster<f64> = read_geotiff(&path, None)?;
        image.add_band(band, resample_nearest(&raster, grid)?)?;
    }
    Ok(Scene { id, acquired, image })
}

#[async_trait]
impl ImageryBackend for LocalDirectoryBackend {
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection> {
        let path = self
            .catalog
            .regions
            .get(&query.dataset)
            .map(|p| self.resolve(p))
            .ok_or_else(|| CloudError::NotFound {
                kind: "region dataset",
                id: query.dataset.clone(),
            })?;

        let all = blocking(move || {
            let text = std::fs::read_to_string(&path)?;
            Ok(FeatureCollection::from_geojson_str(&text)?)
        })
        .await?;

        let mut matches = FeatureCollection::new();
        for feature in all {
            if feature.is_named(query.property.as_deref(), &query.name) {
                matches.push(feature);
            }
        }
        Ok(matches)
    }

    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack> {
        let entries = self
            .catalog
            .collections
            .get(&query.dataset)
            .ok_or_else(|| CloudError::NotFound {
                kind: "collection",
                id: query.dataset.clone(),
            })?;

        let mut jobs = Vec::new();
        for entry in entries {
            if !query.window.contains(entry.datetime.date_naive()) {
                continue;
            }
            let files = query
                .bands
                .iter()
                .map(|band| {
                    entry
                        .bands
                        .get(band)
                        .map(|p| (band.clone(), self.resolve(p)))
                        .ok_or_else(|| CloudError::NotFound {
                            kind: "band",
                            id: format!("{}:{}", entry.id, band),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            jobs.push((entry.id.clone(), entry.datetime, files));
        }

        let grid = query.grid.clone();
        let scenes = blocking(move || {
            jobs.into_iter()
                .map(|(id, acquired, files)| load_scene(id, acquired, files, &grid))
                .collect::<Result<Vec<_>>>()
        })
        .await?;

        debug!(dataset = %query.dataset, window = %query.window, scenes = scenes.len(), "local query");
        Ok(ImageStack::for_query(query, scenes))
    }

    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        let exporter = self.exporter.clone();
        let composite = composite.clone();
        let request = request.clone();
        blocking(move || exporter.export(&composite, &request)).await
    }
}
