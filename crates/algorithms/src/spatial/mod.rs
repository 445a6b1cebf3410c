//! Bringing scenes onto the analysis grid
//!
//! - `resample`: nearest-neighbour sampling of a scene at grid pixel centres
//! - `clip`: masking pixels whose centre falls outside the region
//! - `project`: WGS84 to UTM point projection used while resampling

mod clip;
mod project;
mod resample;

pub use clip::{clip_image, clip_to_region};
pub use project::{parse_utm_epsg, PointProjection};
pub use resample::{resample_image, resample_nearest};
