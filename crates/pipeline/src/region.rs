//! Region selection

use tracing::{debug, info};

use irrimetrics_cloud::{ImageryBackend, RegionQuery};
use irrimetrics_core::{Region, CRS};

use crate::config::RegionConfig;
use crate::error::{PipelineError, Result};

/// Resolve the configured area to one region.
///
/// A point region is built directly. Otherwise every matching feature's
/// polygons are merged; no match is a configuration error, raised before
/// any scene is queried.
pub async fn select_region<B: ImageryBackend + ?Sized>(backend: &B, config: &RegionConfig) -> Result<Region> {
    if let Some(point) = config.point {
        let region = Region::around_point(config.name.as_str(), point.lon, point.lat, point.half_span)
            .map_err(|e| PipelineError::Configuration(format!("region '{}': {e}", config.name)))?;
        info!(region = region.name(), centre = ?region.centroid(), bounds = ?region.bounds(), "point region selected");
        return Ok(region);
    }

    let query = RegionQuery {
        dataset: config.dataset.clone(),
        name: config.name.clone(),
        property: config.property.clone(),
    };

    let features = backend
        .resolve_region(&query)
        .await
        .map_err(|cause| PipelineError::RegionResolution {
            dataset: config.dataset.clone(),
            name: config.name.clone(),
            cause,
        })?;
    debug!(dataset = %config.dataset, matches = features.len(), "region lookup");

    if features.is_empty() {
        let key = config.property.as_deref().unwrap_or("id");
        return Err(PipelineError::Configuration(format!(
            "unknown region: no feature in '{}' has {} = '{}'",
            config.dataset, key, config.name
        )));
    }

    let region = Region::from_features(config.name.as_str(), features.iter(), CRS::wgs84())
        .map_err(|e| PipelineError::Configuration(format!("region '{}': {e}", config.name)))?;
    info!(region = region.name(), centre = ?region.centroid(), bounds = ?region.bounds(), "region selected");
    Ok(region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PointRegion;
    use approx::assert_relative_eq;
    use irrimetrics_cloud::MemoryBackend;
    use irrimetrics_core::FeatureCollection;

    const STATES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "br", "properties": {"st_name": "Bihar"},
             "geometry": {"type": "Polygon", "coordinates": [[[84,24],[86,24],[86,26],[84,26],[84,24]]]}},
            {"type": "Feature", "id": "br2", "properties": {"st_name": "Bihar"},
             "geometry": {"type": "Polygon", "coordinates": [[[86,24],[88,24],[88,27],[86,27],[86,24]]]}},
            {"type": "Feature", "id": "up", "properties": {"st_name": "Uttar Pradesh"},
             "geometry": {"type": "Polygon", "coordinates": [[[78,24],[84,24],[84,30],[78,30],[78,24]]]}}
        ]
    }"#;

    fn backend() -> MemoryBackend {
        MemoryBackend::new().with_regions(
            RegionConfig::default().dataset,
            FeatureCollection::from_geojson_str(STATES).unwrap(),
        )
    }

    #[tokio::test]
    async fn merges_all_matching_features() {
        let region = select_region(&backend(), &RegionConfig::default()).await.unwrap();
        assert_eq!(region.name(), "Bihar");
        assert_eq!(region.geometry().0.len(), 2);
        assert_eq!(region.bounds(), (84.0, 24.0, 88.0, 27.0));
    }

    #[tokio::test]
    async fn matches_ids_without_property() {
        let config = RegionConfig {
            name: "up".into(),
            property: None,
            ..RegionConfig::default()
        };
        let region = select_region(&backend(), &config).await.unwrap();
        assert_eq!(region.bounds(), (78.0, 24.0, 84.0, 30.0));
    }

    #[tokio::test]
    async fn unknown_name_is_a_configuration_error() {
        let config = RegionConfig {
            name: "Atlantis".into(),
            ..RegionConfig::default()
        };
        let err = select_region(&backend(), &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(ref m) if m.contains("Atlantis")));
    }

    #[tokio::test]
    async fn point_region_skips_the_backend() {
        let config = RegionConfig {
            dataset: "nowhere".into(),
            name: "Patna".into(),
            point: Some(PointRegion { lon: 85.0, lat: 25.5, half_span: 0.25 }),
            ..RegionConfig::default()
        };
        let region = select_region(&MemoryBackend::new(), &config).await.unwrap();
        assert_eq!(region.name(), "Patna");
        assert_eq!(region.bounds(), (84.75, 25.25, 85.25, 25.75));
        let (x, y) = region.centroid();
        assert_relative_eq!(x, 85.0, epsilon = 1e-12);
        assert_relative_eq!(y, 25.5, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn unknown_dataset_is_a_resolution_error() {
        let config = RegionConfig {
            dataset: "nowhere".into(),
            ..RegionConfig::default()
        };
        let err = select_region(&backend(), &config).await.unwrap_err();
        assert!(matches!(err, PipelineError::RegionResolution { .. }));
    }
}
