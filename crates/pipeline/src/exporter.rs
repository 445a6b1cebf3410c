//! Export submission with a pixel-budget pre-flight

use tracing::{info, warn};

use irrimetrics_cloud::{ExportHandle, ExportRequest, ImageryBackend};
use irrimetrics_core::{CompositeRaster, Region};

use crate::config::ExportConfig;
use crate::error::{PipelineError, Result};

/// Metres per degree of latitude, and of longitude at the equator
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Output pixels needed to cover the region's bounding box at `scale`
/// metres per pixel.
///
/// Geographic extents are converted to metres at the region's centre
/// latitude.
pub fn estimate_pixels(region: &Region, scale: f64) -> u64 {
    let (min_x, min_y, max_x, max_y) = region.bounds();
    let (mut width, mut height) = (max_x - min_x, max_y - min_y);
    if region.crs().is_geographic() {
        let centre_lat = (min_y + max_y) / 2.0;
        width *= METRES_PER_DEGREE * centre_lat.to_radians().cos();
        height *= METRES_PER_DEGREE;
    }
    let cols = (width / scale).ceil().max(1.0);
    let rows = (height / scale).ceil().max(1.0);
    // Float-to-int casts saturate.
    (cols * rows) as u64
}

/// Export parameters for the composite over `region`
pub fn export_request(config: &ExportConfig, region: &Region) -> ExportRequest {
    ExportRequest {
        description: config.description.clone(),
        folder: config.folder.clone(),
        destination: config.destination.clone(),
        scale: config.scale,
        max_pixels: config.max_pixels,
        region: region.clone(),
        skip_empty_tiles: config.skip_empty_tiles,
        file_format: config.file_format,
    }
}

/// Submit the composite.
///
/// Requests whose estimated size exceeds `max_pixels` are refused
/// without contacting the backend. Completion of the export is not
/// awaited.
pub async fn submit_export<B: ImageryBackend + ?Sized>(
    backend: &B,
    composite: &CompositeRaster,
    request: &ExportRequest,
) -> Result<ExportHandle> {
    let estimate = estimate_pixels(&request.region, request.scale);
    if estimate > request.max_pixels {
        warn!(estimate, max_pixels = request.max_pixels, "export exceeds pixel ceiling");
        return Err(PipelineError::ExportSubmission {
            reason: format!(
                "region '{}' needs about {} pixels at {} m, above the ceiling of {}",
                request.region.name(),
                estimate,
                request.scale,
                request.max_pixels
            ),
        });
    }

    let handle = backend
        .export_raster(composite, request)
        .await
        .map_err(|cause| PipelineError::ExportSubmission {
            reason: cause.to_string(),
        })?;
    info!(
        id = %handle.id,
        description = %handle.description,
        destination = %handle.destination,
        bands = composite.len(),
        estimate,
        "export submitted"
    );
    Ok(handle)
}
