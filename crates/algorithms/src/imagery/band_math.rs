//! Band math operations
//!
//! Element-wise raster algebra on `f64` bands. NaN and declared no-data
//! cells propagate as NaN.

use ndarray::Array2;

use crate::maybe_rayon::*;
use irrimetrics_core::raster::{Raster, RasterElement};
use irrimetrics_core::{Error, Result};

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    /// Division; a zero divisor yields NaN
    Divide,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BandMathOp::Add => a + b,
            BandMathOp::Divide => {
                if b == 0.0 {
                    f64::NAN
                } else {
                    a / b
                }
            }
        }
    }
}

pub(crate) fn is_missing(value: f64, nodata: Option<f64>) -> bool {
    value.is_nan() || nodata.is_some_and(|nd| !nd.is_nan() && value == nd)
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Wrap row-major `data` in a raster on the grid of `template`
pub(crate) fn build_output(template: &Raster<f64>, data: Vec<f64>) -> Result<Raster<f64>> {
    let array = Array2::from_shape_vec(template.shape(), data)
        .map_err(|e| Error::Other(e.to_string()))?;
    let mut output = template.with_data(array)?;
    output.set_nodata(Some(f64::NAN));
    Ok(output)
}

/// Apply a unary function to every valid cell of a raster.
///
/// ```ignore
/// let scaled = band_math(&input, |v| v * 0.001)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let val = unsafe { raster.get_unchecked(row, col) };
                if !is_missing(val, nodata) {
                    *out = f(val);
                }
            }
            row_data
        })
        .collect();

    build_output(raster, data)
}

/// Apply a binary operation between two rasters of equal shape
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    check_dimensions(a, b)?;

    let (rows, cols) = a.shape();
    let nodata_a = a.nodata();
    let nodata_b = b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let va = unsafe { a.get_unchecked(row, col) };
                let vb = unsafe { b.get_unchecked(row, col) };
                if is_missing(va, nodata_a) || is_missing(vb, nodata_b) {
                    continue;
                }
                *out = op.apply(va, vb);
            }
            row_data
        })
        .collect();

    build_output(a, data)
}

/// Cell-wise sum of two bands
pub fn add(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_binary(a, b, BandMathOp::Add)
}

/// Cell-wise quotient of two bands; a zero divisor yields NaN
pub fn divide(a: &Raster<f64>, b: &Raster<f64>) -> Result<Raster<f64>> {
    band_math_binary(a, b, BandMathOp::Divide)
}

/// Widen any raster to double precision, no-data becoming NaN
pub fn cast_double<T: RasterElement>(raster: &Raster<T>) -> Raster<f64> {
    raster.to_f64()
}

/// Divide every cell by a constant.
///
/// The divisor must be finite and non-zero.
pub fn divide_scalar(raster: &Raster<f64>, divisor: f64) -> Result<Raster<f64>> {
    if divisor == 0.0 || !divisor.is_finite() {
        return Err(Error::InvalidParameter {
            name: "divisor",
            value: divisor.to_string(),
            reason: "must be finite and non-zero".into(),
        });
    }
    band_math(raster, |v| v / divisor)
}
