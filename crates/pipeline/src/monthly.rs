//! Per-month vegetation, greenness and rainfall bands

use chrono::Month;
use tracing::{info, warn};

use irrimetrics_algorithms::imagery::{divide_scalar, normalized_difference, ratio};
use irrimetrics_algorithms::Reducer;
use irrimetrics_cloud::{CloudError, ImageryBackend};
use irrimetrics_core::{Band, BandId, Indicator, TimeWindow};

use crate::context::RunContext;
use crate::error::{MonthInput, PipelineError, Result};

/// The three bands derived for one month
#[derive(Debug, Clone)]
pub struct MonthlyBands {
    pub month: Month,
    pub ndvi: Band,
    pub green: Band,
    pub rain: Band,
}

impl MonthlyBands {
    pub fn band(&self, indicator: Indicator) -> &Band {
        match indicator {
            Indicator::Ndvi => &self.ndvi,
            Indicator::Green => &self.green,
            Indicator::Rain => &self.rain,
        }
    }
}

/// Compute NDVI, greenness and rainfall for `month` of the configured year.
///
/// A month with no scenes yields all-NaN bands and a warning.
pub async fn build_month<B: ImageryBackend + ?Sized>(ctx: RunContext<'_, B>, month: Month) -> Result<MonthlyBands> {
    let number = month.number_from_month();
    let window = TimeWindow::month(ctx.config.year, month)?;
    let failed = |input: MonthInput| {
        move |cause: CloudError| PipelineError::MonthComputation {
            month: number,
            input,
            cause,
        }
    };

    let (ndvi, green) = optical_indices(ctx, month, window)
        .await
        .map_err(failed(MonthInput::Optical))?;
    let rain = rainfall(ctx, month, window)
        .await
        .map_err(failed(MonthInput::Precipitation))?;

    info!(month = number, "month complete");
    Ok(MonthlyBands {
        month,
        ndvi,
        green,
        rain,
    })
}

async fn optical_indices<B: ImageryBackend + ?Sized>(
    ctx: RunContext<'_, B>,
    month: Month,
    window: TimeWindow,
) -> std::result::Result<(Band, Band), CloudError> {
    let optical = &ctx.config.optical;
    let reduced = ctx
        .reduced(&optical.dataset, window, &optical.bands, Reducer::Min)
        .await?;
    if reduced.scenes == 0 {
        warn!(
            month = month.number_from_month(),
            dataset = %optical.dataset,
            "no optical scenes; NDVI and GREEN bands will be empty"
        );
    }

    let nir = reduced.image.require(&optical.nir_band)?;
    let red = reduced.image.require(&optical.red_band)?;
    let green = reduced.image.require(&optical.green_band)?;

    let ndvi = normalized_difference(nir, red)?;
    let greenness = ratio(nir, green)?;
    Ok((
        Band::new(BandId::monthly(month, Indicator::Ndvi), ndvi),
        Band::new(BandId::monthly(month, Indicator::Green), greenness),
    ))
}

async fn rainfall<B: ImageryBackend + ?Sized>(
    ctx: RunContext<'_, B>,
    month: Month,
    window: TimeWindow,
) -> std::result::Result<Band, CloudError> {
    let precipitation = &ctx.config.precipitation;
    let bands = [precipitation.band.clone()];
    let reduced = ctx
        .reduced(&precipitation.dataset, window, &bands, Reducer::Sum)
        .await?;
    if reduced.scenes == 0 {
        warn!(
            month = month.number_from_month(),
            dataset = %precipitation.dataset,
            "no precipitation scenes; RAIN band will be empty"
        );
    }

    let total = reduced.image.require(&precipitation.band)?;
    let rain = divide_scalar(total, precipitation.divisor)?;
    Ok(Band::new(BandId::monthly(month, Indicator::Rain), rain))
}
