//! GeoTIFF reading and writing
//!
//! Scenes are read one page at a time into `Raster<T>`. Composites are
//! written as a single multi-band image (one `f64` sample per band, stored
//! band-sequentially) with band names in the GDAL metadata tag, which is
//! how GDAL itself records band descriptions.

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, read_multiband_geotiff,
    read_multiband_geotiff_from_buffer, write_geotiff, write_multiband_geotiff,
    write_multiband_geotiff_to_buffer, NamedPage,
};
