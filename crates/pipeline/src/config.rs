//! Run configuration.
//!
//! [`PipelineConfig::default`] reproduces the Bihar 2016 product. Every
//! field can be overridden from JSON; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use irrimetrics_cloud::{ExportDestination, FileFormat, RetryPolicy};

use crate::error::{PipelineError, Result};

/// Square area centred on a point, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRegion {
    pub lon: f64,
    pub lat: f64,
    /// Half the side of the square
    pub half_span: f64,
}

/// Area the composite covers.
///
/// Either a named administrative area looked up in `dataset`, or, when
/// `point` is set, a square around that point called `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub dataset: String,
    pub name: String,
    /// Feature property holding `name`; `None` matches feature ids
    pub property: Option<String>,
    pub point: Option<PointRegion>,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            dataset: "users/bl/Ind_admin_shapefiles/ind_states".into(),
            name: "Bihar".into(),
            property: Some("st_name".into()),
            point: None,
        }
    }
}

/// Surface-reflectance source for the vegetation and greenness indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalConfig {
    pub dataset: String,
    /// Bands requested from every scene, in order
    pub bands: Vec<String>,
    pub nir_band: String,
    pub red_band: String,
    pub green_band: String,
}

impl Default for OpticalConfig {
    fn default() -> Self {
        Self {
            dataset: "LANDSAT/LC8_L1T_TOA".into(),
            bands: ["B3", "B4", "B5"].map(String::from).to_vec(),
            nir_band: "B5".into(),
            red_band: "B4".into(),
            green_band: "B3".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecipitationConfig {
    pub dataset: String,
    pub band: String,
    /// Monthly sums are divided by this. The factor 2 has no documented
    /// derivation; it is kept so the product matches earlier releases.
    pub divisor: f64,
}

impl Default for PrecipitationConfig {
    fn default() -> Self {
        Self {
            dataset: "NASA/GPM_L3/IMERG_V04".into(),
            band: "IRprecipitation".into(),
            divisor: 2.0,
        }
    }
}

/// Stray-light corrected monthly radiance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NightlightConfig {
    pub dataset: String,
    pub band: String,
}

impl Default for NightlightConfig {
    fn default() -> Self {
        Self {
            dataset: "NOAA/VIIRS/DNB/MONTHLY_V1/VCMSLCFG".into(),
            band: "avg_rad".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub description: String,
    pub folder: Option<String>,
    pub destination: ExportDestination,
    /// Output pixel size in metres
    pub scale: f64,
    pub max_pixels: u64,
    pub skip_empty_tiles: bool,
    pub file_format: FileFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            description: "all_final".into(),
            folder: None,
            destination: ExportDestination::Drive,
            scale: 30.0,
            max_pixels: 10_000_000_000_000,
            skip_empty_tiles: false,
            file_format: FileFormat::GeoTiff,
        }
    }
}

/// Everything a run needs apart from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub year: i32,
    pub region: RegionConfig,
    pub optical: OpticalConfig,
    pub precipitation: PrecipitationConfig,
    pub nightlight: NightlightConfig,
    /// Pixel size of the analysis grid, in the region's CRS units
    pub analysis_resolution: f64,
    pub export: ExportConfig,
    pub retry: RetryPolicy,
    /// Months computed at the same time (1 = sequential)
    pub max_concurrent_months: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: 2016,
            region: RegionConfig::default(),
            optical: OpticalConfig::default(),
            precipitation: PrecipitationConfig::default(),
            nightlight: NightlightConfig::default(),
            // ~30 m at the equator
            analysis_resolution: 0.00027,
            export: ExportConfig::default(),
            retry: RetryPolicy::default(),
            max_concurrent_months: 1,
        }
    }
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::Configuration(msg.into())
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(invalid(format!("{field} must be a positive number, got {value}")));
    }
    Ok(())
}

impl PipelineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if !(1..=9999).contains(&self.year) {
            return Err(invalid(format!("year {} is out of range", self.year)));
        }

        require_non_empty("region.name", &self.region.name)?;
        match &self.region.point {
            Some(point) => {
                if !(-180.0..=180.0).contains(&point.lon) || !(-90.0..=90.0).contains(&point.lat) {
                    return Err(invalid(format!(
                        "region.point ({}, {}) is not a longitude/latitude pair",
                        point.lon, point.lat
                    )));
                }
                require_positive("region.point.half_span", point.half_span)?;
            }
            None => {
                require_non_empty("region.dataset", &self.region.dataset)?;
                if let Some(property) = &self.region.property {
                    require_non_empty("region.property", property)?;
                }
            }
        }

        require_non_empty("optical.dataset", &self.optical.dataset)?;
        if self.optical.bands.is_empty() {
            return Err(invalid("optical.bands must list at least one band"));
        }
        for band in &self.optical.bands {
            require_non_empty("optical.bands", band)?;
        }
        for (field, band) in [
            ("optical.nir_band", &self.optical.nir_band),
            ("optical.red_band", &self.optical.red_band),
            ("optical.green_band", &self.optical.green_band),
        ] {
            require_non_empty(field, band)?;
            if !self.optical.bands.contains(band) {
                return Err(invalid(format!("{field} '{band}' is not among optical.bands")));
            }
        }

        require_non_empty("precipitation.dataset", &self.precipitation.dataset)?;
        require_non_empty("precipitation.band", &self.precipitation.band)?;
        require_positive("precipitation.divisor", self.precipitation.divisor)?;

        require_non_empty("nightlight.dataset", &self.nightlight.dataset)?;
        require_non_empty("nightlight.band", &self.nightlight.band)?;

        require_positive("analysis_resolution", self.analysis_resolution)?;

        require_non_empty("export.description", &self.export.description)?;
        require_positive("export.scale", self.export.scale)?;
        if self.export.max_pixels == 0 {
            return Err(invalid("export.max_pixels must be positive"));
        }

        if self.retry.timeout.is_zero() || self.retry.query_deadline < self.retry.timeout {
            return Err(invalid(format!(
                "retry.query_deadline_ms ({:?}) must be at least retry.timeout_ms ({:?}), which must be positive",
                self.retry.query_deadline, self.retry.timeout
            )));
        }

        if !(1..=12).contains(&self.max_concurrent_months) {
            return Err(invalid(format!(
                "max_concurrent_months must be between 1 and 12, got {}",
                self.max_concurrent_months
            )));
        }
        Ok(())
    }
}
