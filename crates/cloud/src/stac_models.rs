//! STAC (SpatioTemporal Asset Catalog) data types.
//!
//! Serde models for the parts of STAC Item Search the backend uses: bbox,
//! datetime interval and collection filters on the way out; item datetime,
//! projection and assets on the way back, plus `links` for pagination.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use irrimetrics_core::{Region, TimeWindow};

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search` (STAC API - Item Search).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StacSearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token (next page).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StacSearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounding box `[west, south, east, north]`.
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some(vec![west, south, east, north]);
        self
    }

    /// Bounding box of a region.
    pub fn region(self, region: &Region) -> Self {
        let (w, s, e, n) = region.bounds();
        self.bbox(w, s, e, n)
    }

    /// Whole-day datetime interval of a window.
    pub fn window(mut self, window: &TimeWindow) -> Self {
        self.datetime = Some(window.to_rfc3339_interval());
        self
    }

    pub fn collection(mut self, id: &str) -> Self {
        self.collections = Some(vec![id.to_string()]);
        self
    }

    /// Maximum items per page.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<StacItem>,

    #[serde(default)]
    pub links: Vec<StacLink>,

    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<u64>,
}

impl StacItemCollection {
    /// The `"next"` pagination link, if any.
    pub fn next_link(&self) -> Option<&StacLink> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItem {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: StacItemProperties,

    #[serde(default)]
    pub assets: HashMap<String, StacAsset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl StacItem {
    pub fn asset(&self, key: &str) -> Option<&StacAsset> {
        self.assets.get(key)
    }

    /// Acquisition time from `datetime`, falling back to `start_datetime`.
    pub fn acquired(&self) -> Option<DateTime<Utc>> {
        self.properties
            .datetime
            .as_deref()
            .or_else(|| self.properties.extra.get("start_datetime").and_then(|v| v.as_str()))
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// EPSG code from the projection extension (`proj:epsg`, or
    /// `proj:code` of the form `EPSG:<n>`).
    pub fn epsg(&self) -> Option<u32> {
        let extra = &self.properties.extra;
        if let Some(code) = extra.get("proj:epsg").and_then(|v| v.as_u64()) {
            return u32::try_from(code).ok();
        }
        extra
            .get("proj:code")
            .and_then(|v| v.as_str())
            .and_then(|s| s.strip_prefix("EPSG:"))
            .and_then(|n| n.parse().ok())
    }
}

/// STAC Item properties.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacItemProperties {
    /// RFC 3339 datetime; `null` when a range is given instead.
    #[serde(default)]
    pub datetime: Option<String>,

    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Everything not modelled explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single STAC Asset (file reference).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacAsset {
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// A STAC Link (used for pagination).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StacLink {
    pub rel: String,

    pub href: String,

    /// HTTP method, GET when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request body for POST-based pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Merge `body` into the previous request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "type": "Feature",
      "id": "LC08_L1TP_141042_20160115_20170405_01_T1",
      "bbox": [84.1, 24.6, 86.4, 26.8],
      "properties": {
        "datetime": "2016-01-15T04:52:31.5Z",
        "eo:cloud_cover": 2.1,
        "platform": "landsat-8",
        "proj:epsg": 32645
      },
      "assets": {
        "nir08": {"href": "https://example.com/B5.TIF", "type": "image/tiff; application=geotiff", "roles": ["data"]},
        "red": {"href": "https://example.com/B4.TIF", "roles": ["data"]}
      },
      "collection": "landsat-c2-l1"
    },
    {
      "type": "Feature",
      "id": "composite-2016",
      "properties": {
        "datetime": null,
        "start_datetime": "2016-01-01T00:00:00Z",
        "proj:code": "EPSG:4326"
      },
      "assets": {}
    }
  ],
  "links": [
    {"rel": "next", "href": "https://example.com/search", "method": "POST", "body": {"token": "abc"}, "merge": true},
    {"rel": "self", "href": "https://example.com/search"}
  ],
  "numberMatched": 42
}"#;

    fn parsed() -> StacItemCollection {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[test]
    fn parses_items_and_assets() {
        let col = parsed();
        assert_eq!(col.len(), 2);
        assert_eq!(col.number_matched, Some(42));
        let item = &col.features[0];
        assert_eq!(item.collection.as_deref(), Some("landsat-c2-l1"));
        assert_eq!(item.asset("nir08").unwrap().href, "https://example.com/B5.TIF");
        assert!(item.asset("swir16").is_none());
    }

    #[test]
    fn acquisition_time_and_projection() {
        let col = parsed();
        let landsat = &col.features[0];
        assert_eq!(landsat.acquired().unwrap().to_rfc3339(), "2016-01-15T04:52:31.500+00:00");
        assert_eq!(landsat.epsg(), Some(32645));

        let composite = &col.features[1];
        assert_eq!(composite.acquired().unwrap().to_rfc3339(), "2016-01-01T00:00:00+00:00");
        assert_eq!(composite.epsg(), Some(4326));
    }

    #[test]
    fn pagination_link() {
        let col = parsed();
        let next = col.next_link().unwrap();
        assert_eq!(next.method.as_deref(), Some("POST"));
        assert_eq!(next.merge, Some(true));
    }

    #[test]
    fn search_body_from_region_and_window() {
        let region = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        let window = TimeWindow::month(2016, chrono::Month::February).unwrap();
        let params = StacSearchParams::new()
            .region(&region)
            .window(&window)
            .collection("landsat-c2-l1")
            .limit(100);

        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["bbox"], serde_json::json!([84.0, 24.0, 86.0, 26.0]));
        assert_eq!(json["datetime"], "2016-02-01T00:00:00Z/2016-02-29T23:59:59Z");
        assert_eq!(json["collections"], serde_json::json!(["landsat-c2-l1"]));
        assert!(json.get("token").is_none());
        assert!(serde_json::to_value(StacSearchParams::new()).unwrap().as_object().unwrap().is_empty());
    }
}
