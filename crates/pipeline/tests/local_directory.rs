//! End to end over GeoTIFF scenes on disk, through the blocking entry point

mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use irrimetrics_cloud::{Catalog, CatalogScene, ExportDestination, ExportManifest, ExportState, LocalDirectoryBackend};
use irrimetrics_core::io::{read_multiband_geotiff, write_geotiff};
use irrimetrics_core::{GeoTransform, Raster, CRS};
use irrimetrics_pipeline::{compose_blocking, run_blocking, PipelineConfig, PipelineError};

use common::expected_names;

const STATES: &str = r#"{"type": "FeatureCollection", "features": [
    {"type": "Feature", "properties": {"st_name": "Bihar"},
     "geometry": {"type": "Polygon", "coordinates": [[[84,24],[86,24],[86,26],[84,26],[84,24]]]}}
]}"#;

fn write_tif(root: &Path, name: &str, value: f64) -> PathBuf {
    let mut r = Raster::filled(4, 4, value);
    r.set_transform(GeoTransform::new(84.0, 26.0, 0.5, -0.5));
    r.set_crs(Some(CRS::wgs84()));
    let rel = PathBuf::from("scenes").join(name);
    write_geotiff(&r, root.join(&rel)).unwrap();
    rel
}

fn scene(id: String, month: u32, bands: HashMap<String, PathBuf>) -> CatalogScene {
    CatalogScene {
        id,
        datetime: Utc.with_ymd_and_hms(2016, month, 10, 4, 0, 0).unwrap(),
        bands,
    }
}

fn catalog_dir(config: &PipelineConfig) -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("scenes")).unwrap();
    std::fs::create_dir_all(root.join("regions")).unwrap();
    std::fs::write(root.join("regions/ind_states.geojson"), STATES).unwrap();

    let mut catalog = Catalog::default();
    catalog
        .regions
        .insert(config.region.dataset.clone(), PathBuf::from("regions/ind_states.geojson"));

    let (mut optical, mut rain, mut lights) = (Vec::new(), Vec::new(), Vec::new());
    for month in 1..=12u32 {
        let id = format!("LC8_{month:02}");
        let bands = [("B3", 0.1), ("B4", 0.2), ("B5", 0.6)]
            .into_iter()
            .map(|(b, v)| (b.to_string(), write_tif(root, &format!("{id}_{b}.tif"), v)))
            .collect();
        optical.push(scene(id, month, bands));

        let id = format!("GPM_{month:02}");
        let path = write_tif(root, &format!("{id}.tif"), 3.0);
        rain.push(scene(id, month, HashMap::from([(config.precipitation.band.clone(), path)])));

        let id = format!("VIIRS_{month:02}");
        let path = write_tif(root, &format!("{id}.tif"), month as f64);
        lights.push(scene(id, month, HashMap::from([(config.nightlight.band.clone(), path)])));
    }
    catalog.collections.insert(config.optical.dataset.clone(), optical);
    catalog.collections.insert(config.precipitation.dataset.clone(), rain);
    catalog.collections.insert(config.nightlight.dataset.clone(), lights);
    catalog.write(root.join(Catalog::FILE_NAME)).unwrap();
    dir
}

fn config(out: &Path) -> PipelineConfig {
    let mut config = common::config();
    config.export.destination = ExportDestination::Directory(out.to_path_buf());
    config.export.folder = Some("PowerPlants_all".into());
    config
}

#[test]
fn composite_is_written_as_one_37_band_geotiff() {
    let out = TempDir::new().unwrap();
    let config = config(out.path());
    let dir = catalog_dir(&config);
    let backend = LocalDirectoryBackend::open(dir.path()).unwrap();

    let output = run_blocking(config, backend).unwrap();
    assert_eq!(output.export.state, ExportState::Completed);
    let tif = output.export.location.clone().unwrap();
    assert_eq!(tif, out.path().join("PowerPlants_all").join("all_final.tif"));

    let pages = read_multiband_geotiff(&tif).unwrap();
    assert_eq!(pages.len(), 37);
    let names: Vec<String> = pages.iter().filter_map(|p| p.name.clone()).collect();
    assert_eq!(names, expected_names(2016));

    // 01RAIN = 3.0 / 2, VIIRS2016 = median(1..=12)
    assert_eq!(pages[24].raster.get(0, 0).unwrap(), 1.5);
    assert_eq!(pages[36].raster.get(2, 2).unwrap(), 6.5);
    assert!((pages[12].raster.get(1, 1).unwrap() - 6.0).abs() < 1e-12);

    let manifest =
        ExportManifest::read(out.path().join("PowerPlants_all").join("all_final.bands.json")).unwrap();
    assert_eq!(manifest.bands, expected_names(2016));
    assert_eq!(manifest.scale, 30.0);
    assert_eq!(manifest.max_pixels, 10_000_000_000_000);
}

#[test]
fn compose_only_writes_nothing() {
    let out = TempDir::new().unwrap();
    let config = config(out.path());
    let dir = catalog_dir(&config);
    let backend = LocalDirectoryBackend::open(dir.path()).unwrap();

    let output = compose_blocking(config, backend).unwrap();
    assert_eq!(output.composite.len(), 37);
    assert_eq!(output.grid.shape(), (4, 4));
    assert!(!out.path().join("PowerPlants_all").exists());
}

#[test]
fn missing_collection_fails_month_one() {
    let out = TempDir::new().unwrap();
    let mut config = config(out.path());
    let dir = catalog_dir(&config);
    config.optical.dataset = "LANDSAT/NOT_THERE".into();
    let backend = LocalDirectoryBackend::open(dir.path()).unwrap();

    assert!(matches!(
        run_blocking(config, backend),
        Err(PipelineError::MonthComputation { month: 1, .. })
    ));
}
