//! Ordered sets of named bands

use irrimetrics_core::{Error, Raster, Result};

/// A multi-band image: named `f64` bands, in insertion order, all on the
/// same pixel grid.
#[derive(Debug, Clone, Default)]
pub struct Image {
    bands: Vec<(String, Raster<f64>)>,
}

impl Image {
    pub fn new() -> Self {
        Self { bands: Vec::new() }
    }

    /// Single-band image
    pub fn from_band(name: impl Into<String>, raster: Raster<f64>) -> Self {
        Self {
            bands: vec![(name.into(), raster)],
        }
    }

    /// Append a band.
    ///
    /// Names must be unique and the raster must share the grid of the
    /// bands already present.
    pub fn add_band(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let name = name.into();
        if self.band(&name).is_some() {
            return Err(Error::InvalidBandName(format!("duplicate band '{}'", name)));
        }
        if let Some((_, first)) = self.bands.first() {
            if !first.same_grid(&raster) {
                let (er, ec) = first.shape();
                let (ar, ac) = raster.shape();
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
        }
        self.bands.push((name, raster));
        Ok(())
    }

    /// Builder form of [`Image::add_band`]
    pub fn with_band(mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<Self> {
        self.add_band(name, raster)?;
        Ok(self)
    }

    pub fn band(&self, name: &str) -> Option<&Raster<f64>> {
        self.bands.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    /// Like [`Image::band`] but an absent band is an error
    pub fn require(&self, name: &str) -> Result<&Raster<f64>> {
        self.band(name)
            .ok_or_else(|| Error::InvalidBandName(format!("no band '{}' in image", name)))
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|(n, _)| n.as_str())
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Raster<f64>)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn into_bands(self) -> Vec<(String, Raster<f64>)> {
        self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Keep only `names`, in the given order, renaming them to `rename_to`
    /// when provided (which must then be the same length).
    pub fn select(&self, names: &[&str], rename_to: Option<&[&str]>) -> Result<Image> {
        if let Some(targets) = rename_to {
            if targets.len() != names.len() {
                return Err(Error::InvalidParameter {
                    name: "rename_to",
                    value: targets.len().to_string(),
                    reason: format!("expected {} names", names.len()),
                });
            }
        }
        let mut out = Image::new();
        for (i, name) in names.iter().enumerate() {
            let raster = self.require(name)?.clone();
            let target = rename_to.map_or(*name, |t| t[i]);
            out.add_band(target, raster)?;
        }
        Ok(out)
    }

    /// Rename a single band in place
    pub fn rename_band(&mut self, from: &str, to: impl Into<String>) -> Result<()> {
        let to = to.into();
        if from != to && self.band(&to).is_some() {
            return Err(Error::InvalidBandName(format!("duplicate band '{}'", to)));
        }
        let slot = self
            .bands
            .iter_mut()
            .find(|(n, _)| n == from)
            .ok_or_else(|| Error::InvalidBandName(format!("no band '{}' in image", from)))?;
        slot.0 = to;
        Ok(())
    }

    /// Shape of the shared grid, if any band is present
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.first().map(|(_, r)| r.shape())
    }
}
