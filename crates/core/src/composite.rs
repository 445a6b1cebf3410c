//! The stacked multi-band product handed to exporters

use std::collections::HashSet;

use crate::band::{Band, BandId};
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Ordered bands with unique names on one shared grid.
///
/// Construction checks uniqueness and grid agreement; ordering is the
/// caller's contract and is preserved as given.
#[derive(Debug, Clone)]
pub struct CompositeRaster {
    bands: Vec<Band>,
}

impl CompositeRaster {
    pub fn new(bands: Vec<Band>) -> Result<Self> {
        let first = bands
            .first()
            .ok_or_else(|| Error::Other("composite has no bands".into()))?;

        let mut seen = HashSet::with_capacity(bands.len());
        for band in &bands {
            if !seen.insert(band.id()) {
                return Err(Error::InvalidBandName(format!("duplicate band '{}'", band.id())));
            }
            if !first.raster().same_grid(band.raster()) {
                let (er, ec) = first.raster().shape();
                let (ar, ac) = band.raster().shape();
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band(&self, id: BandId) -> Option<&Band> {
        self.bands.iter().find(|b| b.id() == id)
    }

    /// Serialized band names in composite order
    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(Band::name).collect()
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Grid shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.bands[0].raster().shape()
    }

    pub fn transform(&self) -> &GeoTransform {
        self.bands[0].raster().transform()
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.bands[0].raster().crs()
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }
}
