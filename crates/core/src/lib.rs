//! # Irrimetrics Core
//!
//! Core types shared by every irrimetrics crate.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2D grid
//! - `GeoTransform`: affine pixel/world mapping
//! - `CRS`: coordinate reference system identifier
//! - `BandId` / `Band`: typed band identifiers and named `f64` rasters
//! - `Region`: administrative polygons bounding every query
//! - `TimeWindow`: calendar month and year windows
//! - `CompositeRaster`: ordered, uniquely named bands on one grid
//! - GeoTIFF I/O for scenes and multi-band composites

pub mod band;
pub mod calendar;
pub mod composite;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use band::{Band, BandId, Indicator};
pub use calendar::TimeWindow;
pub use composite::CompositeRaster;
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use vector::{AttributeValue, Feature, FeatureCollection, Region};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::band::{Band, BandId, Indicator};
    pub use crate::calendar::TimeWindow;
    pub use crate::composite::CompositeRaster;
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::vector::Region;
}
