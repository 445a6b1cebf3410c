//! Vegetation indices

use crate::imagery::band_math::{build_output, check_dimensions, divide, is_missing};
use crate::maybe_rayon::*;
use irrimetrics_core::raster::Raster;
use irrimetrics_core::Result;

/// Normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Pixels where either band is missing, or the sum is zero, are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };
                if is_missing(a, nodata_a) || is_missing(b, nodata_b) {
                    continue;
                }
                let sum = a + b;
                if sum == 0.0 {
                    continue;
                }
                *out = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`, in [-1, 1] for non-negative inputs.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Simple band ratio `numerator / denominator`; a zero denominator is NaN.
///
/// With NIR over Green this is the greenness index.
pub fn ratio(numerator: &Raster<f64>, denominator: &Raster<f64>) -> Result<Raster<f64>> {
    divide(numerator, denominator)
}
