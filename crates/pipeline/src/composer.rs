//! Assembly of the 37-band composite

use irrimetrics_core::{Band, BandId, CompositeRaster, Indicator};

use crate::accumulator::{BandStack, BandStacks};
use crate::error::{PipelineError, Result};

/// Number of monthly bands each stack must hold
pub const MONTHS: usize = 12;

/// Concatenate vegetation, greenness and rainfall stacks and the
/// nightlight band.
///
/// Bands 1-12 are NDVI, 13-24 GREEN, 25-36 RAIN, 37 the nightlight.
/// Every stack must hold exactly January through December of its own
/// indicator.
pub fn compose(stacks: BandStacks, nightlight: Band) -> Result<CompositeRaster> {
    for (stack, expected) in stacks.iter().zip(Indicator::ALL) {
        check_stack(stack, expected)?;
    }
    if !matches!(nightlight.id(), BandId::Nightlight { .. }) {
        return Err(PipelineError::UnexpectedBand {
            expected: "nightlight",
            found: nightlight.name(),
        });
    }

    let mut bands = Vec::with_capacity(3 * MONTHS + 1);
    bands.extend(stacks.ndvi.into_bands());
    bands.extend(stacks.green.into_bands());
    bands.extend(stacks.rain.into_bands());
    bands.push(nightlight);
    Ok(CompositeRaster::new(bands)?)
}

fn check_stack(stack: &BandStack, expected: Indicator) -> Result<()> {
    let incomplete = |reason: String| PipelineError::IncompleteStack {
        indicator: expected,
        count: stack.len(),
        reason,
    };

    if stack.indicator() != expected {
        return Err(incomplete(format!("stack holds {} bands", stack.indicator())));
    }
    if stack.len() != MONTHS {
        return Err(incomplete(format!("expected {MONTHS} bands")));
    }
    for (position, band) in stack.bands().iter().enumerate() {
        let month = band.id().month().map(|m| m.number_from_month() as usize);
        if band.id().indicator() != Some(expected) || month != Some(position + 1) {
            return Err(incomplete(format!(
                "band {} found at month position {}",
                band.name(),
                position + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use irrimetrics_core::{GeoTransform, Raster};

    fn raster(v: f64) -> Raster<f64> {
        let mut r = Raster::filled(2, 3, v);
        r.set_transform(GeoTransform::new(84.0, 27.0, 0.5, -0.5));
        r
    }

    fn stack(indicator: Indicator, months: impl IntoIterator<Item = u32>) -> BandStack {
        let bands = months
            .into_iter()
            .map(|m| Band::new(BandId::monthly_from_number(m, indicator).unwrap(), raster(m as f64)))
            .collect();
        BandStack::new(indicator, bands)
    }

    fn full_stacks() -> BandStacks {
        BandStacks {
            ndvi: stack(Indicator::Ndvi, 1..=12),
            green: stack(Indicator::Green, 1..=12),
            rain: stack(Indicator::Rain, 1..=12),
        }
    }

    fn viirs() -> Band {
        Band::new(BandId::nightlight(2016), raster(3.5))
    }

    #[test]
    fn composite_has_37_bands_in_contract_order() {
        let composite = compose(full_stacks(), viirs()).unwrap();
        assert_eq!(composite.len(), 37);

        let names = composite.band_names();
        let mut expected: Vec<String> = Vec::new();
        for suffix in ["NDVI", "GREEN", "RAIN"] {
            expected.extend((1..=12).map(|m| format!("{m:02}{suffix}")));
        }
        expected.push("VIIRS2016".into());
        assert_eq!(names, expected);

        for (i, band) in composite.bands().iter().enumerate() {
            assert_eq!(band.id().composite_position(), i + 1);
        }
    }

    #[test]
    fn eleven_vegetation_bands_are_incomplete() {
        let mut stacks = full_stacks();
        stacks.ndvi = stack(Indicator::Ndvi, 1..=11);
        match compose(stacks, viirs()) {
            Err(PipelineError::IncompleteStack { indicator, count, .. }) => {
                assert_eq!(indicator, Indicator::Ndvi);
                assert_eq!(count, 11);
            }
            other => panic!("expected IncompleteStack, got {other:?}"),
        }
    }

    #[test]
    fn misordered_or_foreign_bands_are_rejected() {
        let mut stacks = full_stacks();
        stacks.green = stack(Indicator::Green, [2, 1, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert!(matches!(
            compose(stacks, viirs()),
            Err(PipelineError::IncompleteStack { indicator: Indicator::Green, count: 12, .. })
        ));

        let mut stacks = full_stacks();
        stacks.rain = stack(Indicator::Ndvi, 1..=12);
        assert!(matches!(
            compose(stacks, viirs()),
            Err(PipelineError::IncompleteStack { indicator: Indicator::Rain, .. })
        ));
    }

    #[test]
    fn nightlight_slot_takes_only_a_nightlight_band() {
        let band = Band::new(BandId::monthly_from_number(1, Indicator::Rain).unwrap(), raster(0.0));
        assert!(matches!(
            compose(full_stacks(), band),
            Err(PipelineError::UnexpectedBand { .. })
        ));
    }

    #[test]
    fn bands_must_share_one_grid() {
        let mut r = Raster::filled(4, 4, 1.0);
        r.set_transform(GeoTransform::new(84.0, 27.0, 0.5, -0.5));
        let odd = Band::new(BandId::nightlight(2016), r);
        assert!(matches!(compose(full_stacks(), odd), Err(PipelineError::Core(_))));
    }
}
