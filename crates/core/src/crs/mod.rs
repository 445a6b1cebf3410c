//! Coordinate Reference System handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system, identified by EPSG code or WKT.
///
/// The CRS travels with every band so the exporter and consumers can tell
/// geographic grids (degrees) from projected ones (metres). Resampling only
/// knows how to place WGS84 grids over UTM scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether coordinates are longitude/latitude degrees.
    ///
    /// Only EPSG:4326 and WKT strings starting with `GEOGCS`/`GEOGCRS` are
    /// recognized; anything else is treated as projected.
    pub fn is_geographic(&self) -> bool {
        match (self.epsg, self.wkt.as_deref()) {
            (Some(code), _) => code == 4326,
            (None, Some(wkt)) => {
                let head = wkt.trim_start();
                head.starts_with("GEOGCS") || head.starts_with("GEOGCRS")
            }
            (None, None) => false,
        }
    }

    pub fn identifier(&self) -> String {
        match (self.epsg, self.wkt.as_deref()) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_identifier() {
        assert_eq!(CRS::wgs84().identifier(), "EPSG:4326");
        assert_eq!(CRS::from_epsg(32645).to_string(), "EPSG:32645");
    }

    #[test]
    fn test_geographic_detection() {
        assert!(CRS::wgs84().is_geographic());
        assert!(!CRS::from_epsg(32645).is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\"]").is_geographic());
    }
}
