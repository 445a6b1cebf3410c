//! Annual nighttime-lights band

use tracing::{info, warn};

use irrimetrics_algorithms::imagery::cast_double;
use irrimetrics_algorithms::Reducer;
use irrimetrics_cloud::{CloudError, ImageryBackend};
use irrimetrics_core::{Band, BandId, TimeWindow};

use crate::context::RunContext;
use crate::error::{PipelineError, Result};

/// Median radiance over the configured year, clipped to the region, as
/// `VIIRS<year>`
pub async fn build_nightlight<B: ImageryBackend + ?Sized>(ctx: RunContext<'_, B>) -> Result<Band> {
    let year = ctx.config.year;
    let window = TimeWindow::year(year)?;
    let band = median_radiance(ctx, window)
        .await
        .map_err(|cause| PipelineError::NightlightComputation { year, cause })?;
    info!(band = %band.id(), "nightlight composite complete");
    Ok(band)
}

async fn median_radiance<B: ImageryBackend + ?Sized>(
    ctx: RunContext<'_, B>,
    window: TimeWindow,
) -> std::result::Result<Band, CloudError> {
    let nightlight = &ctx.config.nightlight;
    let bands = [nightlight.band.clone()];
    let reduced = ctx
        .reduced(&nightlight.dataset, window, &bands, Reducer::Median)
        .await?;
    if reduced.scenes == 0 {
        warn!(year = ctx.config.year, dataset = %nightlight.dataset, "no nightlight scenes; band will be empty");
    }

    let radiance = cast_double(reduced.image.require(&nightlight.band)?);
    Ok(Band::new(BandId::nightlight(ctx.config.year), radiance))
}
