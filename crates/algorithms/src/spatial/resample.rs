//! Nearest-neighbour resampling onto the analysis grid

use crate::grid::AnalysisGrid;
use crate::image::Image;
use crate::imagery::band_math::{build_output, is_missing};
use crate::maybe_rayon::*;
use crate::spatial::project::PointProjection;
use irrimetrics_core::{Raster, RasterElement, Result};
use tracing::trace;

/// Sample `source` at every pixel centre of `grid`.
///
/// Grid pixels falling outside the source, or on a missing source cell,
/// become NaN. A geographic grid over a UTM scene is projected point by
/// point; other CRS pairs must match.
pub fn resample_nearest<T: RasterElement>(source: &Raster<T>, grid: &AnalysisGrid) -> Result<Raster<f64>> {
    let source = source.to_f64();
    if grid.matches(&source) {
        let mut out = source;
        out.set_crs(Some(grid.crs().clone()));
        return Ok(out);
    }

    let projection = PointProjection::between(grid.crs(), source.crs())?;
    trace!(?projection, src_shape = ?source.shape(), grid_shape = ?grid.shape(), "resampling");
    let (src_rows, src_cols) = source.shape();
    let src_transform = *source.transform();
    let nodata = source.nodata();
    let grid_transform = *grid.transform();
    let (rows, cols) = grid.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = grid_transform.pixel_to_geo(col, row);
                let (sx, sy) = projection.apply(x, y);
                let (fc, fr) = src_transform.geo_to_pixel(sx, sy);
                if !(fc >= 0.0 && fr >= 0.0) {
                    continue;
                }
                let (sc, sr) = (fc.floor() as usize, fr.floor() as usize);
                if sr >= src_rows || sc >= src_cols {
                    continue;
                }
                let v = unsafe { source.get_unchecked(sr, sc) };
                if !is_missing(v, nodata) {
                    *out = v;
                }
            }
            row_data
        })
        .collect();

    build_output(&grid.empty_raster(), data)
}

/// Resample every band of an image onto `grid`
pub fn resample_image(image: &Image, grid: &AnalysisGrid) -> Result<Image> {
    let mut out = Image::new();
    for (name, raster) in image.bands() {
        out.add_band(name, resample_nearest(raster, grid)?)?;
    }
    Ok(out)
}
