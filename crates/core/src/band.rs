//! Typed band identifiers and named bands
//!
//! Band names such as `03NDVI` or `VIIRS2016` are the export contract.
//! Inside the workspace bands are addressed by [`BandId`]; the string form
//! only exists at the serialization boundary ([`fmt::Display`] / [`FromStr`]),
//! and the two are bijective.

use std::fmt;
use std::str::FromStr;

use chrono::Month;

use crate::calendar::month_from_number;
use crate::error::{Error, Result};
use crate::raster::Raster;

/// Monthly indicator carried by a band stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Indicator {
    /// Normalized difference vegetation index, (NIR - Red) / (NIR + Red)
    Ndvi,
    /// Greenness ratio, NIR / Green
    Green,
    /// Monthly precipitation accumulation after the correction divisor
    Rain,
}

impl Indicator {
    /// Indicators in composite order
    pub const ALL: [Indicator; 3] = [Indicator::Ndvi, Indicator::Green, Indicator::Rain];

    /// Suffix used in band names
    pub fn suffix(self) -> &'static str {
        match self {
            Indicator::Ndvi => "NDVI",
            Indicator::Green => "GREEN",
            Indicator::Rain => "RAIN",
        }
    }

    fn from_suffix(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.suffix() == s)
    }

    /// Zero-based position of this indicator's stack in the composite
    pub fn stack_index(self) -> usize {
        match self {
            Indicator::Ndvi => 0,
            Indicator::Green => 1,
            Indicator::Rain => 2,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

const NIGHTLIGHT_PREFIX: &str = "VIIRS";

/// Identifier of a single band in the composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandId {
    Monthly { month: Month, indicator: Indicator },
    Nightlight { year: i32 },
}

impl BandId {
    pub fn monthly(month: Month, indicator: Indicator) -> Self {
        BandId::Monthly { month, indicator }
    }

    /// Build a monthly identifier from a 1-based month number
    pub fn monthly_from_number(month: u32, indicator: Indicator) -> Result<Self> {
        Ok(Self::monthly(month_from_number(month)?, indicator))
    }

    pub fn nightlight(year: i32) -> Self {
        BandId::Nightlight { year }
    }

    pub fn indicator(&self) -> Option<Indicator> {
        match self {
            BandId::Monthly { indicator, .. } => Some(*indicator),
            BandId::Nightlight { .. } => None,
        }
    }

    pub fn month(&self) -> Option<Month> {
        match self {
            BandId::Monthly { month, .. } => Some(*month),
            BandId::Nightlight { .. } => None,
        }
    }

    /// 1-based band number in the 37-band composite.
    ///
    /// Vegetation occupies 1-12, greenness 13-24, precipitation 25-36 and
    /// the nightlight band 37.
    pub fn composite_position(&self) -> usize {
        match self {
            BandId::Monthly { month, indicator } => {
                indicator.stack_index() * 12 + month.number_from_month() as usize
            }
            BandId::Nightlight { .. } => 37,
        }
    }
}

impl fmt::Display for BandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandId::Monthly { month, indicator } => {
                write!(f, "{:02}{}", month.number_from_month(), indicator.suffix())
            }
            BandId::Nightlight { year } => write!(f, "{}{}", NIGHTLIGHT_PREFIX, year),
        }
    }
}

impl FromStr for BandId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidBandName(s.to_string());

        let id = if let Some(year) = s.strip_prefix(NIGHTLIGHT_PREFIX) {
            if year.is_empty() || !year.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            BandId::nightlight(year.parse().map_err(|_| invalid())?)
        } else {
            let (digits, suffix) = s.split_at_checked(2).ok_or_else(invalid)?;
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let month: u32 = digits.parse().map_err(|_| invalid())?;
            let indicator = Indicator::from_suffix(suffix).ok_or_else(invalid)?;
            BandId::monthly_from_number(month, indicator).map_err(|_| invalid())?
        };

        // Reject non-canonical spellings such as `VIIRS02016`.
        if id.to_string() != s {
            return Err(invalid());
        }
        Ok(id)
    }
}

/// A named double-precision band
#[derive(Debug, Clone)]
pub struct Band {
    id: BandId,
    raster: Raster<f64>,
}

impl Band {
    pub fn new(id: BandId, raster: Raster<f64>) -> Self {
        Self { id, raster }
    }

    pub fn id(&self) -> BandId {
        self.id
    }

    /// Serialized band name
    pub fn name(&self) -> String {
        self.id.to_string()
    }

    pub fn raster(&self) -> &Raster<f64> {
        &self.raster
    }

    pub fn into_raster(self) -> Raster<f64> {
        self.raster
    }

    /// Same pixels under a different identifier
    pub fn rename(self, id: BandId) -> Self {
        Self { id, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn monthly_names_are_zero_padded() {
        let id = BandId::monthly(Month::March, Indicator::Ndvi);
        assert_eq!(id.to_string(), "03NDVI");
        let id = BandId::monthly(Month::December, Indicator::Green);
        assert_eq!(id.to_string(), "12GREEN");
        assert_eq!(BandId::nightlight(2016).to_string(), "VIIRS2016");
    }

    #[test]
    fn names_roundtrip_for_every_composite_band() {
        let mut ids: Vec<BandId> = Indicator::ALL
            .into_iter()
            .flat_map(|ind| (1..=12).map(move |m| BandId::monthly_from_number(m, ind).unwrap()))
            .collect();
        ids.push(BandId::nightlight(2016));

        let names: HashSet<String> = ids.iter().map(|id| id.to_string()).collect();
        assert_eq!(names.len(), 37, "band names must be unique");

        for id in &ids {
            let parsed: BandId = id.to_string().parse().unwrap();
            assert_eq!(&parsed, id);
        }
    }

    #[test]
    fn composite_positions_cover_1_to_37() {
        let mut positions: Vec<usize> = Indicator::ALL
            .into_iter()
            .flat_map(|ind| (1..=12).map(move |m| BandId::monthly_from_number(m, ind).unwrap()))
            .map(|id| id.composite_position())
            .collect();
        positions.push(BandId::nightlight(2016).composite_position());
        positions.sort_unstable();
        assert_eq!(positions, (1..=37).collect::<Vec<_>>());
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["1NDVI", "13NDVI", "00RAIN", "01ndvi", "01", "VIIRS", "VIIRS02016", "VIIRSabc", "01NDVIX"] {
            assert!(bad.parse::<BandId>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn rename_keeps_pixels() {
        let band = Band::new(BandId::nightlight(2015), Raster::filled(2, 2, 1.5));
        let renamed = band.rename(BandId::nightlight(2016));
        assert_eq!(renamed.name(), "VIIRS2016");
        assert_eq!(renamed.raster().get(1, 1).unwrap(), 1.5);
    }
}
