//! The analysis grid

use irrimetrics_core::{Error, GeoTransform, Raster, Region, Result, CRS};

/// North-up pixel grid that every scene of a run is brought onto.
///
/// Bands from different collections can only be stacked once they share
/// one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisGrid {
    transform: GeoTransform,
    rows: usize,
    cols: usize,
    crs: CRS,
}

impl AnalysisGrid {
    pub fn new(transform: GeoTransform, rows: usize, cols: usize, crs: CRS) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        Ok(Self {
            transform,
            rows,
            cols,
            crs,
        })
    }

    /// Grid of square `resolution` cells covering the region's bounding box
    pub fn covering(region: &Region, resolution: f64) -> Result<Self> {
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(Error::InvalidParameter {
                name: "resolution",
                value: resolution.to_string(),
                reason: "must be a positive finite number".into(),
            });
        }
        let (transform, (rows, cols)) = GeoTransform::covering(region.bounds(), resolution);
        Self::new(transform, rows, cols, region.crs().clone())
    }

    /// Grid of an existing raster; rasters without a CRS are taken as WGS84
    pub fn of<T: irrimetrics_core::RasterElement>(raster: &Raster<T>) -> Result<Self> {
        let (rows, cols) = raster.shape();
        Self::new(
            *raster.transform(),
            rows,
            cols,
            raster.crs().cloned().unwrap_or_default(),
        )
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Bounding box (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols, self.rows)
    }

    /// All-NaN `f64` raster on this grid
    pub fn empty_raster(&self) -> Raster<f64> {
        self.filled(f64::NAN)
    }

    /// Constant `f64` raster on this grid
    pub fn filled(&self, value: f64) -> Raster<f64> {
        let mut raster = Raster::filled(self.rows, self.cols, value);
        raster.set_transform(self.transform);
        raster.set_crs(Some(self.crs.clone()));
        raster.set_nodata(Some(f64::NAN));
        raster
    }

    /// Whether `raster` lies exactly on this grid
    pub fn matches<T: irrimetrics_core::RasterElement>(&self, raster: &Raster<T>) -> bool {
        raster.shape() == self.shape() && raster.transform() == &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_region_bbox() {
        let region = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        let grid = AnalysisGrid::covering(&region, 0.5).unwrap();
        assert_eq!(grid.shape(), (4, 4));
        assert_eq!(grid.pixel_count(), 16);
        assert_eq!(grid.bounds(), (84.0, 24.0, 86.0, 26.0));
    }

    #[test]
    fn empty_raster_is_all_nan_on_grid() {
        let region = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        let grid = AnalysisGrid::covering(&region, 1.0).unwrap();
        let r = grid.empty_raster();
        assert!(grid.matches(&r));
        assert!(r.data().iter().all(|v| v.is_nan()));
        assert_eq!(r.crs(), Some(&CRS::wgs84()));
    }

    #[test]
    fn rejects_bad_resolution() {
        let region = Region::around_point("sq", 0.0, 0.0, 1.0).unwrap();
        assert!(AnalysisGrid::covering(&region, 0.0).is_err());
        assert!(AnalysisGrid::covering(&region, f64::NAN).is_err());
    }
}
