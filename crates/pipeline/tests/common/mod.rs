//! Bihar-shaped fixtures for the in-memory backend

#![allow(dead_code)]

use std::time::Duration;

use chrono::{TimeZone, Utc};

use irrimetrics_algorithms::{AnalysisGrid, Image};
use irrimetrics_cloud::{MemoryBackend, RetryPolicy, Scene};
use irrimetrics_core::calendar::{last_day_of_month, month_from_number};
use irrimetrics_core::{CompositeRaster, FeatureCollection, Region};
use irrimetrics_pipeline::PipelineConfig;

pub const RESOLUTION: f64 = 0.5;

const STATES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "id": "br", "properties": {"st_name": "Bihar"},
         "geometry": {"type": "Polygon", "coordinates": [[[84,24],[86,24],[86,26],[84,26],[84,24]]]}},
        {"type": "Feature", "id": "jh", "properties": {"st_name": "Jharkhand"},
         "geometry": {"type": "Polygon", "coordinates": [[[84,22],[86,22],[86,24],[84,24],[84,22]]]}}
    ]
}"#;

/// Bihar 2016 defaults on a coarse grid with millisecond backoff
pub fn config() -> PipelineConfig {
    PipelineConfig {
        analysis_resolution: RESOLUTION,
        retry: RetryPolicy {
            max_retries: 3,
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            query_deadline: Duration::from_secs(30),
        },
        ..PipelineConfig::default()
    }
}

/// The 4x4 grid the fixture region resolves to
pub fn grid() -> AnalysisGrid {
    let region = Region::around_point("Bihar", 85.0, 25.0, 1.0).unwrap();
    AnalysisGrid::covering(&region, RESOLUTION).unwrap()
}

/// NIR of the darkest optical scene in `month`
pub fn nir(month: u32) -> f64 {
    0.5 + 0.01 * month as f64
}
pub const RED: f64 = 0.2;
pub const GREEN: f64 = 0.1;

/// Rainfall scenes in `month`: the 1st, the 15th and the last day
pub fn rain_values(month: u32) -> [f64; 3] {
    [0.5 * month as f64, 1.25, 0.25]
}

/// Optical scene with every Landsat band; brighter by `offset`
fn optical_scene(grid: &AnalysisGrid, month: u32, day: u32, offset: f64) -> Scene {
    let config = PipelineConfig::default();
    let mut image = Image::new();
    for band in &config.optical.bands {
        let value = match band.as_str() {
            "B5" => nir(month),
            "B4" => RED,
            "B3" => GREEN,
            _ => 0.3,
        };
        image.add_band(band.clone(), grid.filled(value + offset)).unwrap();
    }
    Scene {
        id: format!("LC8_2016{month:02}{day:02}"),
        acquired: Utc.with_ymd_and_hms(2016, month, day, 5, 0, 0).unwrap(),
        image,
    }
}

/// A backend holding a full year of scenes, minus optical scenes in the
/// months listed
pub fn backend_without_optical(skip_months: &[u32]) -> MemoryBackend {
    let config = PipelineConfig::default();
    let grid = grid();
    let mut backend = MemoryBackend::new()
        .with_regions(
            config.region.dataset.clone(),
            FeatureCollection::from_geojson_str(STATES).unwrap(),
        )
        .with_collection(config.optical.dataset.clone())
        .with_collection(config.precipitation.dataset.clone())
        .with_collection(config.nightlight.dataset.clone());

    for month in 1..=12u32 {
        if !skip_months.contains(&month) {
            backend.add_scene(config.optical.dataset.clone(), optical_scene(&grid, month, 20, 0.1));
            backend.add_scene(config.optical.dataset.clone(), optical_scene(&grid, month, 4, 0.0));
        }

        let last = last_day_of_month(2016, month_from_number(month).unwrap()).unwrap();
        for (day, value) in [1, 15, last].into_iter().zip(rain_values(month)) {
            backend.add_scene(
                config.precipitation.dataset.clone(),
                Scene {
                    id: format!("GPM_2016{month:02}{day:02}"),
                    acquired: Utc.with_ymd_and_hms(2016, month, day, 23, 30, 0).unwrap(),
                    image: Image::from_band(config.precipitation.band.clone(), grid.filled(value)),
                },
            );
        }

        backend.add_scene(
            config.nightlight.dataset.clone(),
            Scene {
                id: format!("VIIRS_2016{month:02}"),
                acquired: Utc.with_ymd_and_hms(2016, month, 1, 0, 0, 0).unwrap(),
                image: Image::from_band(config.nightlight.band.clone(), grid.filled(month as f64)),
            },
        );
    }

    // Outside the year; must not leak into any window.
    backend.add_scene(
        config.precipitation.dataset.clone(),
        Scene {
            id: "GPM_20170101".into(),
            acquired: Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap(),
            image: Image::from_band(config.precipitation.band.clone(), grid.filled(100.0)),
        },
    );
    backend
}

pub fn backend() -> MemoryBackend {
    backend_without_optical(&[])
}

/// Expected band names, vegetation through nightlight
pub fn expected_names(year: i32) -> Vec<String> {
    let mut names = Vec::new();
    for suffix in ["NDVI", "GREEN", "RAIN"] {
        names.extend((1..=12).map(|m| format!("{m:02}{suffix}")));
    }
    names.push(format!("VIIRS{year}"));
    names
}

/// Every pixel of every band equal, NaN included
pub fn assert_bit_identical(a: &CompositeRaster, b: &CompositeRaster) {
    assert_eq!(a.band_names(), b.band_names());
    for (x, y) in a.bands().iter().zip(b.bands()) {
        let xs: Vec<u64> = x.raster().data().iter().map(|v| v.to_bits()).collect();
        let ys: Vec<u64> = y.raster().data().iter().map(|v| v.to_bits()).collect();
        assert_eq!(xs, ys, "band {} differs", x.name());
    }
}
