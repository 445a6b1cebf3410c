//! Affine georeferencing for rasters

use serde::{Deserialize, Serialize};

/// Affine transformation between pixel (col, row) and world (x, y) coordinates.
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// North-up grids have zero rotation and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform with no rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// North-up transform whose grid covers `(min_x, min_y, max_x, max_y)`
    /// with square cells of `resolution` world units.
    ///
    /// Returns the transform together with the grid shape `(rows, cols)`.
    /// The grid is anchored at the upper-left corner and grows right/down
    /// until the whole box is covered, so the last row/column may overhang.
    pub fn covering(bounds: (f64, f64, f64, f64), resolution: f64) -> (Self, (usize, usize)) {
        let (min_x, min_y, max_x, max_y) = bounds;
        let cols = (((max_x - min_x) / resolution).ceil() as usize).max(1);
        let rows = (((max_y - min_y) / resolution).ceil() as usize).max(1);
        (Self::new(min_x, max_y, resolution, -resolution), (rows, cols))
    }

    /// World coordinates of a pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.corner_at(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// World coordinates of a pixel's upper-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.corner_at(col as f64, row as f64)
    }

    fn corner_at(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Fractional pixel coordinates `(col, row)` of a world point.
    ///
    /// Returns `(NaN, NaN)` for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (-self.col_rotation * dx + self.pixel_width * dy) / det,
        )
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of a `width` x `height` grid
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pixel_geo_roundtrip() {
        let gt = GeoTransform::new(84.0, 27.5, 0.25, -0.25);
        let (x, y) = gt.pixel_to_geo(3, 7);
        let (col, row) = gt.geo_to_pixel(x, y);
        assert_relative_eq!(col, 3.5, epsilon = 1e-10);
        assert_relative_eq!(row, 7.5, epsilon = 1e-10);
    }

    #[test]
    fn covering_grid_spans_bounds() {
        let (gt, (rows, cols)) = GeoTransform::covering((84.0, 24.0, 89.0, 27.5), 0.5);
        assert_eq!((rows, cols), (7, 10));
        let (min_x, min_y, max_x, max_y) = gt.bounds(cols, rows);
        assert_relative_eq!(min_x, 84.0, epsilon = 1e-10);
        assert_relative_eq!(max_y, 27.5, epsilon = 1e-10);
        assert_relative_eq!(max_x, 89.0, epsilon = 1e-10);
        assert_relative_eq!(min_y, 24.0, epsilon = 1e-10);
    }

    #[test]
    fn covering_never_yields_empty_grid() {
        let (_, shape) = GeoTransform::covering((1.0, 1.0, 1.0, 1.0), 10.0);
        assert_eq!(shape, (1, 1));
    }
}
