//! Backend over a remote STAC API.
//!
//! Collection queries become paginated Item Searches; every requested band
//! is an asset whose GeoTIFF is downloaded whole, decoded and resampled
//! onto the analysis grid. Region datasets are GeoJSON documents, fetched
//! over HTTP or read from a local path. Exports are written locally.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use irrimetrics_algorithms::spatial::resample_nearest;
use irrimetrics_algorithms::Image;
use irrimetrics_core::io::read_geotiff_from_buffer;
use irrimetrics_core::{CompositeRaster, FeatureCollection, Raster, CRS};

use crate::backend::{
    CollectionQuery, ExportHandle, ExportRequest, ImageStack, ImageryBackend, RegionQuery, Scene,
};
use crate::error::{CloudError, Result};
use crate::export::LocalExporter;
use crate::retry::RetryPolicy;
use crate::stac_client::{StacCatalog, StacClient};
use crate::stac_models::{StacItem, StacSearchParams};

/// Mapping from pipeline dataset and band names onto a STAC catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StacBackendConfig {
    pub catalog: StacCatalog,
    /// Dataset id -> STAC collection id; unmapped ids are used as-is
    pub collections: HashMap<String, String>,
    /// Dataset id -> (band name -> asset key); unmapped bands are used as-is
    pub assets: HashMap<String, HashMap<String, String>>,
    /// Region dataset id -> GeoJSON URL or local file path
    pub regions: HashMap<String, String>,
    /// Cap on items per search
    pub max_items: usize,
    /// Scenes downloaded at once
    pub concurrent_downloads: usize,
    /// Where [`crate::backend::ExportDestination::Drive`] exports land
    pub export_dir: PathBuf,
    pub retry: RetryPolicy,
}

/// Landsat 8 TOA dataset id as named in run configurations
pub const LANDSAT8_DATASET: &str = "LANDSAT/LC8_L1T_TOA";

impl Default for StacBackendConfig {
    /// Planetary Computer, with Landsat 8 mapped onto `landsat-c2-l2`.
    ///
    /// Region datasets and the precipitation and nightlight collections
    /// have no public STAC home and must be mapped by the caller.
    fn default() -> Self {
        let landsat_assets = [("B3", "green"), ("B4", "red"), ("B5", "nir08")]
            .into_iter()
            .map(|(band, asset)| (band.to_string(), asset.to_string()))
            .collect();
        Self {
            catalog: StacCatalog::PlanetaryComputer,
            collections: HashMap::from([(LANDSAT8_DATASET.to_string(), "landsat-c2-l2".to_string())]),
            assets: HashMap::from([(LANDSAT8_DATASET.to_string(), landsat_assets)]),
            regions: HashMap::new(),
            max_items: 500,
            concurrent_downloads: 4,
            export_dir: PathBuf::from("exports"),
            retry: RetryPolicy::default(),
        }
    }
}

impl StacBackendConfig {
    /// Parse a JSON config; absent fields keep their defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Where the GeoJSON of a region dataset lives
    pub fn region_source(&self, dataset: &str) -> Result<&str> {
        self.regions
            .get(dataset)
            .map(String::as_str)
            .ok_or_else(|| CloudError::NotFound {
                kind: "region dataset",
                id: dataset.to_string(),
            })
    }

    pub fn collection_id<'a>(&'a self, dataset: &'a str) -> &'a str {
        self.collections.get(dataset).map_or(dataset, String::as_str)
    }

    pub fn asset_key<'a>(&'a self, dataset: &str, band: &'a str) -> &'a str {
        self.assets
            .get(dataset)
            .and_then(|m| m.get(band))
            .map_or(band, String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct StacBackend {
    client: StacClient,
    config: StacBackendConfig,
    exporter: LocalExporter,
}

impl StacBackend {
    pub fn new(config: StacBackendConfig) -> Result<Self> {
        let client = StacClient::new(config.catalog.clone(), config.retry, config.max_items)?;
        let exporter = LocalExporter::new(config.export_dir.clone());
        Ok(Self {
            client,
            config,
            exporter,
        })
    }

    pub fn config(&self) -> &StacBackendConfig {
        &self.config
    }

    async fn fetch_band(&self, item: &StacItem, dataset: &str, band: &str) -> Result<Raster<f64>> {
        let key = self.config.asset_key(dataset, band);
        let asset = item.asset(key).ok_or_else(|| CloudError::NotFound {
            kind: "asset",
            id: format!("{}:{}", item.id, key),
        })?;
        let href = self.client.sign_asset_href(&asset.href).await?;
        let bytes = self.client.http().get_bytes(&href).await?;

        let epsg = item.epsg();
        tokio::task::spawn_blocking(move || -> Result<Raster<f64>> {
            let mut raster: Raster<f64> = read_geotiff_from_buffer(&bytes, None)?;
            if raster.crs().is_none() {
                raster.set_crs(epsg.map(CRS::from_epsg));
            }
            Ok(raster)
        })
        .await
        .map_err(|e| CloudError::Io(std::io::Error::other(e)))?
    }

    async fn fetch_scene(&self, item: StacItem, query: &CollectionQuery) -> Result<Option<Scene>> {
        let Some(acquired) = item.acquired() else {
            warn!(item = %item.id, "item has no datetime, skipped");
            return Ok(None);
        };
        if !query.window.contains(acquired.date_naive()) {
            return Ok(None);
        }

        let mut image = Image::new();
        for band in &query.bands {
            let raster = self.fetch_band(&item, &query.dataset, band).await?;
            image.add_band(band.clone(), resample_nearest(&raster, &query.grid)?)?;
        }
        debug!(item = %item.id, "scene fetched");
        Ok(Some(Scene {
            id: item.id,
            acquired,
            image,
        }))
    }
}

#[async_trait]
impl ImageryBackend for StacBackend {
    async fn resolve_region(&self, query: &RegionQuery) -> Result<FeatureCollection> {
        let source = self.config.region_source(&query.dataset)?;
        let text = if source.starts_with("http://") || source.starts_with("https://") {
            self.client.http().get_text(source).await?
        } else {
            tokio::fs::read_to_string(source).await?
        };
        let all = FeatureCollection::from_geojson_str(&text)?;

        let mut matches = FeatureCollection::new();
        for feature in all {
            if feature.is_named(query.property.as_deref(), &query.name) {
                matches.push(feature);
            }
        }
        Ok(matches)
    }

    async fn query_collection(&self, query: &CollectionQuery) -> Result<ImageStack> {
        let params = StacSearchParams::new()
            .region(&query.region)
            .window(&query.window)
            .collection(self.config.collection_id(&query.dataset))
            .limit(100);
        let items = self.client.search_all(&params).await?;
        info!(dataset = %query.dataset, window = %query.window, items = items.len(), "STAC search");

        let scenes: Vec<Scene> = stream::iter(items)
            .map(|item| self.fetch_scene(item, query))
            .buffered(self.config.concurrent_downloads.max(1))
            .try_filter_map(|scene| async move { Ok(scene) })
            .try_collect()
            .await?;

        Ok(ImageStack::for_query(query, scenes))
    }

    async fn export_raster(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        let exporter = self.exporter.clone();
        let composite = composite.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || exporter.export(&composite, &request))
            .await
            .map_err(|e| CloudError::Io(std::io::Error::other(e)))?
    }

    /// Every HTTP request already goes through the configured retry policy
    fn retries_internally(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_maps_landsat_and_falls_back_to_identity() {
        let config = StacBackendConfig::default();
        assert_eq!(config.collection_id(LANDSAT8_DATASET), "landsat-c2-l2");
        assert_eq!(config.collection_id("other"), "other");
        assert_eq!(config.asset_key(LANDSAT8_DATASET, "B5"), "nir08");
        assert_eq!(config.asset_key(LANDSAT8_DATASET, "B3"), "green");
        assert_eq!(config.asset_key(LANDSAT8_DATASET, "B7"), "B7");
        assert!(matches!(
            config.region_source("states"),
            Err(CloudError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn regions_resolve_from_a_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("states.geojson");
        std::fs::write(
            &path,
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {"st_name": "Bihar"},
                 "geometry": {"type": "Polygon", "coordinates": [[[84,24],[88,24],[88,27],[84,27],[84,24]]]}},
                {"type": "Feature", "properties": {"st_name": "Goa"},
                 "geometry": {"type": "Polygon", "coordinates": [[[73,15],[74,15],[74,16],[73,16],[73,15]]]}}
            ]}"#,
        )
        .unwrap();
        let mut config = StacBackendConfig::default();
        config.regions.insert("states".into(), path.display().to_string());
        let backend = StacBackend::new(config).unwrap();

        let found = backend
            .resolve_region(&RegionQuery {
                dataset: "states".into(),
                name: "Bihar".into(),
                property: Some("st_name".into()),
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(backend.retries_internally());
    }

    #[test]
    fn config_loads_from_json() {
        let config: StacBackendConfig = serde_json::from_str(
            r#"{"catalog": "earth_search", "max_items": 50, "retry": {"max_retries": 5}}"#,
        )
        .unwrap();
        assert_eq!(config.catalog, StacCatalog::EarthSearch);
        assert_eq!(config.max_items, 50);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.concurrent_downloads, 4);
        assert_eq!(config.collection_id(LANDSAT8_DATASET), "landsat-c2-l2");
    }

    #[test]
    fn backend_builds_without_network() {
        assert!(StacBackend::new(StacBackendConfig::default()).is_ok());
    }
}
