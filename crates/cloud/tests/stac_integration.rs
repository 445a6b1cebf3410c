//! STAC tests against live catalogs.
//!
//! All tests need network access and are ignored by default.
//! Run with: `cargo test -p irrimetrics-cloud -- --ignored stac`

use std::time::Duration;

use irrimetrics_algorithms::AnalysisGrid;
use irrimetrics_cloud::{
    CollectionQuery, ImageryBackend, RetryPolicy, StacBackend, StacBackendConfig, StacCatalog, StacClient,
    StacSearchParams,
};
use irrimetrics_core::{Region, TimeWindow};

fn patna() -> Region {
    Region::around_point("Patna", 85.14, 25.59, 0.05).unwrap()
}

fn retry() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(60),
        ..RetryPolicy::default()
    }
}

/// Landsat 8 over Patna, January 2016, from Planetary Computer.
#[tokio::test]
#[ignore]
async fn stac_planetary_computer_landsat_search() {
    let client = StacClient::new(StacCatalog::PlanetaryComputer, retry(), 50).expect("client");
    let window = TimeWindow::month(2016, chrono::Month::January).unwrap();
    let params = StacSearchParams::new()
        .region(&patna())
        .window(&window)
        .collection("landsat-c2-l2")
        .limit(10);

    let items = client.search_all(&params).await.expect("search failed");
    assert!(!items.is_empty(), "expected Landsat scenes over Patna");
    for item in &items {
        let acquired = item.acquired().expect("item without datetime");
        assert!(window.contains(acquired.date_naive()), "{} outside window", item.id);
        assert!(item.asset("nir08").is_some(), "{} lacks nir08", item.id);
        println!("  {} {} epsg={:?}", item.id, acquired, item.epsg());
    }
}

/// Same search on Earth Search, which needs no signing.
#[tokio::test]
#[ignore]
async fn stac_earth_search_landsat_search() {
    let client = StacClient::new(StacCatalog::EarthSearch, retry(), 20).expect("client");
    let params = StacSearchParams::new()
        .region(&patna())
        .window(&TimeWindow::year(2016).unwrap())
        .collection("landsat-c2-l2")
        .limit(5);

    let page = client.search(&params).await.expect("search failed");
    println!("Found {} items", page.len());
    for item in &page.features {
        assert!(!item.assets.is_empty(), "item should have assets");
    }
}

/// Download and resample red and NIR for one month through the backend.
#[tokio::test]
#[ignore]
async fn stac_backend_fetches_scenes_onto_grid() {
    let mut config = StacBackendConfig {
        retry: retry(),
        max_items: 4,
        ..StacBackendConfig::default()
    };
    config
        .collections
        .insert("LANDSAT/LC8_L1T_TOA".into(), "landsat-c2-l2".into());
    config.assets.insert(
        "LANDSAT/LC8_L1T_TOA".into(),
        [("B4", "red"), ("B5", "nir08")]
            .into_iter()
            .map(|(b, a)| (b.to_string(), a.to_string()))
            .collect(),
    );
    let backend = StacBackend::new(config).expect("backend");

    let region = patna();
    let grid = AnalysisGrid::covering(&region, 0.001).unwrap();
    let query = CollectionQuery {
        dataset: "LANDSAT/LC8_L1T_TOA".into(),
        window: TimeWindow::month(2016, chrono::Month::January).unwrap(),
        region,
        bands: vec!["B4".into(), "B5".into()],
        grid: grid.clone(),
    };

    let stack = backend.query_collection(&query).await.expect("query failed");
    println!("{} scenes", stack.len());
    for scene in &stack.scenes {
        assert!(grid.matches(scene.image.require("B5").unwrap()));
    }
}
