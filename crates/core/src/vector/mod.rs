//! Vector features and the query region

use std::collections::HashMap;

use geo::{BoundingRect, Centroid, Intersects};
use geo_types::{Coord, Geometry, MultiPolygon, Point, Polygon, Rect};
use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use crate::crs::CRS;
use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Whether this attribute matches `name` textually (numbers compare by
    /// their decimal rendering, so `12` matches `"12"`)
    pub fn matches(&self, name: &str) -> bool {
        match self {
            AttributeValue::String(s) => s == name,
            AttributeValue::Int(i) => i.to_string() == name,
            AttributeValue::Float(f) => f.to_string() == name,
            AttributeValue::Bool(b) => b.to_string() == name,
            AttributeValue::Null => false,
        }
    }
}

impl From<&serde_json::Value> for AttributeValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => AttributeValue::String(s.clone()),
            other => AttributeValue::String(other.to_string()),
        }
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Option<Geometry<f64>>,
    pub properties: HashMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            properties: HashMap::new(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }

    /// Whether this feature is the one named `name`.
    ///
    /// With a property key the property must match; without one the
    /// feature id must.
    pub fn is_named(&self, property: Option<&str>, name: &str) -> bool {
        match property {
            Some(key) => self.get_property(key).is_some_and(|v| v.matches(name)),
            None => self.id.as_deref() == Some(name),
        }
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Parse a GeoJSON document (FeatureCollection, Feature or bare Geometry)
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text.parse()?;
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(g) => vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        };

        let mut out = Self::new();
        for f in features {
            let geometry = match f.geometry {
                Some(g) => Some(Geometry::<f64>::try_from(g)?),
                None => None,
            };
            let id = f.id.map(|id| match id {
                geojson::feature::Id::String(s) => s,
                geojson::feature::Id::Number(n) => n.to_string(),
            });
            let properties = f
                .properties
                .unwrap_or_default()
                .iter()
                .map(|(k, v)| (k.clone(), AttributeValue::from(v)))
                .collect();
            out.push(Feature {
                geometry,
                properties,
                id,
            });
        }
        Ok(out)
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// The administrative area every query and clip is bounded by.
///
/// Immutable once built. Coordinates are in the region's [`CRS`]
/// (WGS84 unless stated otherwise).
#[derive(Debug, Clone)]
pub struct Region {
    name: String,
    geometry: MultiPolygon<f64>,
    bbox: Rect<f64>,
    crs: CRS,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>, crs: CRS) -> Result<Self> {
        let name = name.into();
        let bbox = geometry
            .bounding_rect()
            .ok_or_else(|| Error::InvalidGeometry(format!("region '{}' has no area", name)))?;
        Ok(Self {
            name,
            geometry,
            bbox,
            crs,
        })
    }

    /// Merge the polygonal geometries of `features` into one region.
    ///
    /// Non-polygonal geometries are ignored; at least one polygon is required.
    pub fn from_features<'a>(
        name: impl Into<String>,
        features: impl IntoIterator<Item = &'a Feature>,
        crs: CRS,
    ) -> Result<Self> {
        let mut polygons: Vec<Polygon<f64>> = Vec::new();
        for feature in features {
            match &feature.geometry {
                Some(Geometry::Polygon(p)) => polygons.push(p.clone()),
                Some(Geometry::MultiPolygon(mp)) => polygons.extend(mp.0.iter().cloned()),
                Some(Geometry::Rect(r)) => polygons.push(r.to_polygon()),
                _ => {}
            }
        }
        let name = name.into();
        if polygons.is_empty() {
            return Err(Error::InvalidGeometry(format!(
                "region '{}' has no polygon geometry",
                name
            )));
        }
        Self::new(name, MultiPolygon(polygons), crs)
    }

    /// Square region of `half_span` units on each side of a point
    pub fn around_point(name: impl Into<String>, x: f64, y: f64, half_span: f64) -> Result<Self> {
        if !(half_span > 0.0) {
            return Err(Error::InvalidParameter {
                name: "half_span",
                value: half_span.to_string(),
                reason: "must be positive".into(),
            });
        }
        let rect = Rect::new(
            Coord { x: x - half_span, y: y - half_span },
            Coord { x: x + half_span, y: y + half_span },
        );
        Self::new(name, MultiPolygon(vec![rect.to_polygon()]), CRS::wgs84())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    /// Bounding box (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.bbox.min().x, self.bbox.min().y, self.bbox.max().x, self.bbox.max().y)
    }

    /// Whether a world point lies inside the region (boundary included)
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.geometry.intersects(&Point::new(x, y))
    }

    /// Centroid of the region, falling back to the bbox centre
    pub fn centroid(&self) -> (f64, f64) {
        match self.geometry.centroid() {
            Some(p) => (p.x(), p.y()),
            None => {
                let c = self.bbox.center();
                (c.x, c.y)
            }
        }
    }
}
