//! Writing composites to the local filesystem.
//!
//! A composite becomes `<description>.tif`, one multi-band image with an
//! `f64` sample per band and band names in the GDAL metadata, plus
//! `<description>.bands.json`, a manifest recording band order and the
//! export parameters.
//!
//! Both files are written under a temporary name and renamed into place,
//! so an interrupted or repeated export never leaves a half-written file
//! under the final name.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use irrimetrics_core::io::write_multiband_geotiff;
use irrimetrics_core::{CompositeRaster, GeoTransform};

use crate::backend::{ExportDestination, ExportHandle, ExportRequest, ExportState, FileFormat};
use crate::error::{CloudError, Result};

/// Sidecar describing an exported composite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub description: String,
    pub bands: Vec<String>,
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<String>,
    pub scale: f64,
    pub max_pixels: u64,
    pub skip_empty_tiles: bool,
    pub file_format: FileFormat,
    pub region: String,
}

impl ExportManifest {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Synchronous exporter rooted at a directory
#[derive(Debug, Clone)]
pub struct LocalExporter {
    root: PathBuf,
}

impl LocalExporter {
    /// Exports sent to [`ExportDestination::Drive`] land under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory an export request resolves to
    pub fn target_dir(&self, request: &ExportRequest) -> PathBuf {
        let base = match &request.destination {
            ExportDestination::Drive => self.root.clone(),
            ExportDestination::Directory(dir) => dir.clone(),
        };
        match &request.folder {
            Some(folder) => base.join(folder),
            None => base,
        }
    }

    /// Write the composite and its manifest
    pub fn export(&self, composite: &CompositeRaster, request: &ExportRequest) -> Result<ExportHandle> {
        if request.description.is_empty()
            || request.description.contains(['/', '\\'])
            || request.description.starts_with('.')
        {
            return Err(CloudError::ExportRejected(format!(
                "invalid export description '{}'",
                request.description
            )));
        }

        let dir = self.target_dir(request);
        std::fs::create_dir_all(&dir)?;
        let raster_path = dir.join(format!("{}.tif", request.description));
        let manifest_path = dir.join(format!("{}.bands.json", request.description));

        let names = composite.band_names();
        let pages: Vec<(&str, &irrimetrics_core::Raster<f64>)> = names
            .iter()
            .zip(composite.bands())
            .map(|(name, band)| (name.as_str(), band.raster()))
            .collect();
        // Every band is written, empty or not; dropping one would shift
        // the band order consumers index by.
        let partial = partial_path(&raster_path);
        write_multiband_geotiff(&pages, &partial)?;
        std::fs::rename(&partial, &raster_path)?;

        let (rows, cols) = composite.shape();
        let manifest = ExportManifest {
            description: request.description.clone(),
            bands: names.clone(),
            rows,
            cols,
            transform: *composite.transform(),
            crs: composite.crs().map(|c| c.identifier()),
            scale: request.scale,
            max_pixels: request.max_pixels,
            skip_empty_tiles: request.skip_empty_tiles,
            file_format: request.file_format,
            region: request.region.name().to_string(),
        };
        let partial = partial_path(&manifest_path);
        std::fs::write(&partial, serde_json::to_string_pretty(&manifest)?)?;
        std::fs::rename(&partial, &manifest_path)?;

        info!(
            path = %raster_path.display(),
            bands = names.len(),
            rows,
            cols,
            "composite written"
        );

        Ok(ExportHandle {
            id: format!("local-{}", request.description),
            description: request.description.clone(),
            destination: request.destination.clone(),
            state: ExportState::Completed,
            location: Some(raster_path),
        })
    }
}

/// Sibling of `path` used while the file is being written
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use irrimetrics_core::io::read_multiband_geotiff;
    use irrimetrics_core::{Band, BandId, Indicator, Raster, Region};
    use tempfile::TempDir;

    fn request(description: &str) -> ExportRequest {
        ExportRequest {
            description: description.into(),
            folder: Some("exports".into()),
            destination: ExportDestination::Drive,
            scale: 30.0,
            max_pixels: 10_000_000_000_000,
            region: Region::around_point("sq", 85.0, 25.0, 1.0).unwrap(),
            skip_empty_tiles: true,
            file_format: FileFormat::GeoTiff,
        }
    }

    fn composite() -> CompositeRaster {
        let bands = vec![
            Band::new(BandId::monthly_from_number(1, Indicator::Ndvi).unwrap(), Raster::filled(2, 3, 0.5)),
            Band::new(BandId::nightlight(2016), Raster::filled(2, 3, 12.0)),
        ];
        CompositeRaster::new(bands).unwrap()
    }

    #[test]
    fn writes_raster_and_manifest() {
        let dir = TempDir::new().unwrap();
        let exporter = LocalExporter::new(dir.path());
        let handle = exporter.export(&composite(), &request("all_final")).unwrap();

        assert_eq!(handle.state, ExportState::Completed);
        let path = handle.location.unwrap();
        assert_eq!(path, dir.path().join("exports").join("all_final.tif"));

        let pages = read_multiband_geotiff(&path).unwrap();
        let names: Vec<_> = pages.iter().map(|p| p.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["01NDVI", "VIIRS2016"]);
        assert_eq!(pages[1].raster.get(1, 2).unwrap(), 12.0);

        let mut decoder = tiff::decoder::Decoder::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(decoder.get_tag_u32(tiff::tags::Tag::SamplesPerPixel).unwrap(), 2);
        assert!(!decoder.more_images());

        let manifest =
            ExportManifest::read(dir.path().join("exports").join("all_final.bands.json")).unwrap();
        assert_eq!(manifest.bands, names);
        assert_eq!(manifest.scale, 30.0);
        assert_eq!(manifest.max_pixels, 10_000_000_000_000);
        assert_eq!((manifest.rows, manifest.cols), (2, 3));
    }

    #[test]
    fn empty_bands_are_written_even_when_skipping_empty_tiles() {
        let dir = TempDir::new().unwrap();
        let bands = vec![
            Band::new(
                BandId::monthly_from_number(6, Indicator::Ndvi).unwrap(),
                Raster::filled(2, 2, f64::NAN),
            ),
            Band::new(BandId::nightlight(2016), Raster::filled(2, 2, 3.0)),
        ];
        let composite = CompositeRaster::new(bands).unwrap();
        let handle = LocalExporter::new(dir.path())
            .export(&composite, &request("all_final"))
            .unwrap();

        let pages = read_multiband_geotiff(handle.location.unwrap()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].name.as_deref(), Some("06NDVI"));
        assert!(pages[0].raster.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn repeated_export_replaces_files_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let exporter = LocalExporter::new(dir.path());
        exporter.export(&composite(), &request("all_final")).unwrap();
        exporter.export(&composite(), &request("all_final")).unwrap();

        let mut files: Vec<String> = std::fs::read_dir(dir.path().join("exports"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["all_final.bands.json", "all_final.tif"]);
        assert_eq!(
            partial_path(Path::new("/x/all_final.tif")),
            PathBuf::from("/x/all_final.tif.partial")
        );
    }

    #[test]
    fn rejects_path_like_descriptions() {
        let dir = TempDir::new().unwrap();
        let exporter = LocalExporter::new(dir.path());
        assert!(exporter.export(&composite(), &request("../escape")).is_err());
        assert!(exporter.export(&composite(), &request("")).is_err());
    }
}
