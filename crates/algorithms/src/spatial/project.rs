//! WGS84 to UTM point projection (Snyder 1987, USGS Prof. Paper 1395).
//!
//! Landsat scenes ship in UTM (EPSG 326xx / 327xx) while the analysis grid
//! is usually geographic, so resampling projects every grid pixel centre
//! into the scene's CRS before looking it up.

use irrimetrics_core::{Error, Result, CRS};

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563;
const E2: f64 = 2.0 * F - F * F;
const E_PRIME2: f64 = E2 / (1.0 - E2);
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    match epsg {
        32601..=32660 => Some((epsg - 32600, true)),
        32701..=32760 => Some((epsg - 32700, false)),
        _ => None,
    }
}

/// Mapping from analysis-grid coordinates to scene coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointProjection {
    Identity,
    Utm { zone: u32, north: bool },
}

impl PointProjection {
    /// Projection taking points in `from` to points in `to`.
    ///
    /// A scene without a CRS is assumed to share the grid's.
    pub fn between(from: &CRS, to: Option<&CRS>) -> Result<Self> {
        let Some(to) = to else {
            return Ok(PointProjection::Identity);
        };
        if from == to || (from.epsg().is_some() && from.epsg() == to.epsg()) {
            return Ok(PointProjection::Identity);
        }
        match (from.epsg(), to.epsg().and_then(parse_utm_epsg)) {
            (Some(4326), Some((zone, north))) => Ok(PointProjection::Utm { zone, north }),
            _ => Err(Error::UnsupportedCrs {
                from: from.identifier(),
                to: to.identifier(),
            }),
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            PointProjection::Identity => (x, y),
            PointProjection::Utm { zone, north } => wgs84_to_utm(x, y, zone, north),
        }
    }
}

/// WGS84 (lon, lat) in degrees to UTM (easting, northing) in metres
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 177.0).to_radians();

    let (sin_lat, cos_lat) = lat.sin_cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a = cos_lat * (lon - lon0);
    let a2 = a * a;
    let a4 = a2 * a2;

    let easting = K0
        * n
        * (a + (1.0 - t + c) * a2 * a / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a / 120.0)
        + FALSE_EASTING;

    let northing = K0
        * (meridional_arc(lat)
            + n * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a4 * a2 / 720.0));

    if north {
        (easting, northing)
    } else {
        (easting, northing + FALSE_NORTHING_SOUTH)
    }
}

/// Meridional arc from the equator to `lat` radians (Snyder eq. 3-21)
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;
    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
