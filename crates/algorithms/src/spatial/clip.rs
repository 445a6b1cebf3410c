//! Clipping to the region

use crate::image::Image;
use crate::imagery::band_math::build_output;
use crate::maybe_rayon::*;
use irrimetrics_core::{Raster, Region, Result};

/// Mask every pixel whose centre lies outside `region` to NaN.
///
/// The raster and the region are assumed to share a CRS.
pub fn clip_to_region(raster: &Raster<f64>, region: &Region) -> Result<Raster<f64>> {
    let (rows, cols) = raster.shape();
    let transform = *raster.transform();
    let (min_x, min_y, max_x, max_y) = region.bounds();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                if x < min_x || x > max_x || y < min_y || y > max_y {
                    continue;
                }
                if region.contains_point(x, y) {
                    *out = unsafe { raster.get_unchecked(row, col) };
                }
            }
            row_data
        })
        .collect();

    build_output(raster, data)
}

/// Clip every band of an image
pub fn clip_image(image: &Image, region: &Region) -> Result<Image> {
    let mut out = Image::new();
    for (name, raster) in image.bands() {
        out.add_band(name, clip_to_region(raster, region)?)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::AnalysisGrid;
    use geo_types::{polygon, MultiPolygon};
    use irrimetrics_core::CRS;

    #[test]
    fn pixels_outside_polygon_are_masked() {
        let tri = polygon![(x: 84.0, y: 24.0), (x: 86.2, y: 24.0), (x: 84.0, y: 26.2), (x: 84.0, y: 24.0)];
        let region = Region::new("tri", MultiPolygon(vec![tri]), CRS::wgs84()).unwrap();
        let square = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        let grid = AnalysisGrid::covering(&square, 1.0).unwrap();
        let raster = grid.filled(5.0);

        let out = clip_to_region(&raster, &region).unwrap();
        // Centres: (84.5, 25.5) in, (85.5, 25.5) out, (84.5, 24.5) in, (85.5, 24.5) in.
        assert_eq!(out.get(0, 0).unwrap(), 5.0);
        assert!(out.get(0, 1).unwrap().is_nan());
        assert_eq!(out.get(1, 0).unwrap(), 5.0);
        assert_eq!(out.get(1, 1).unwrap(), 5.0);
    }

    #[test]
    fn clip_image_keeps_band_order() {
        let region = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        let grid = AnalysisGrid::covering(&region, 1.0).unwrap();
        let img = Image::new()
            .with_band("b", grid.filled(1.0))
            .unwrap()
            .with_band("a", grid.filled(2.0))
            .unwrap();
        let out = clip_image(&img, &region).unwrap();
        assert_eq!(out.band_names().collect::<Vec<_>>(), vec!["b", "a"]);
    }
}
