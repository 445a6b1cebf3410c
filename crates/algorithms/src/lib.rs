//! # Irrimetrics Algorithms
//!
//! Pixel kernels behind the composite pipeline.
//!
//! - **grid**: the analysis grid every scene is resampled onto
//! - **image**: ordered sets of named bands sharing one grid
//! - **imagery**: normalized difference, band ratios, scalar band math
//! - **temporal**: per-pixel reduction of image stacks (min, sum, median)
//! - **spatial**: clipping to a region, nearest-neighbour resampling

pub mod grid;
pub mod image;
pub mod imagery;
pub mod spatial;
pub mod temporal;

mod maybe_rayon;

pub use grid::AnalysisGrid;
pub use image::Image;
pub use temporal::Reducer;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::grid::AnalysisGrid;
    pub use crate::image::Image;
    pub use crate::imagery::{
        add, band_math, band_math_binary, cast_double, divide, divide_scalar, normalized_difference,
        ratio, BandMathOp,
    };
    pub use crate::spatial::{clip_image, clip_to_region, resample_image, resample_nearest};
    pub use crate::temporal::{reduce_stack, Reducer};
    pub use irrimetrics_core::prelude::*;
}
