//! Spectral indices and raster algebra
//!
//! - Normalized difference: `(a - b) / (a + b)`, used for NDVI
//! - Ratio: `a / b`, used for the greenness index
//! - Band math: element-wise unary, binary and scalar operations

pub(crate) mod band_math;
mod indices;

pub use band_math::{
    add, band_math, band_math_binary, cast_double, divide, divide_scalar, BandMathOp,
};
pub use indices::{ndvi, normalized_difference, ratio};
