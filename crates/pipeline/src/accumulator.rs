//! Month slots and the ordered stacks built from them

use chrono::Month;

use irrimetrics_core::{Band, Indicator};

use crate::error::{PipelineError, Result};
use crate::monthly::MonthlyBands;

/// Bands of one indicator, January first
#[derive(Debug, Clone)]
pub struct BandStack {
    indicator: Indicator,
    bands: Vec<Band>,
}

impl BandStack {
    /// Wraps `bands` as given; order and completeness are checked when composing
    pub fn new(indicator: Indicator, bands: Vec<Band>) -> Self {
        Self { indicator, bands }
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }
}

/// The three monthly stacks, in composite order
#[derive(Debug, Clone)]
pub struct BandStacks {
    pub ndvi: BandStack,
    pub green: BandStack,
    pub rain: BandStack,
}

impl BandStacks {
    pub fn iter(&self) -> impl Iterator<Item = &BandStack> {
        [&self.ndvi, &self.green, &self.rain].into_iter()
    }
}

/// One slot per calendar month.
///
/// Months may arrive in any order; each may be filled once.
#[derive(Debug, Default)]
pub struct BandAccumulator {
    slots: [Option<MonthlyBands>; 12],
}

fn slot_index(month: Month) -> usize {
    month.number_from_month() as usize - 1
}

impl BandAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bands: MonthlyBands) -> Result<()> {
        let slot = &mut self.slots[slot_index(bands.month)];
        if slot.is_some() {
            return Err(PipelineError::DuplicateMonth(bands.month.number_from_month()));
        }
        *slot = Some(bands);
        Ok(())
    }

    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// 1-based numbers of the months still empty
    pub fn missing_months(&self) -> Vec<u32> {
        (1..=12u32)
            .zip(self.slots.iter())
            .filter(|(_, slot)| slot.is_none())
            .map(|(m, _)| m)
            .collect()
    }

    /// Merge the filled slots in month order
    pub fn into_stacks(self) -> BandStacks {
        let mut ndvi = Vec::with_capacity(12);
        let mut green = Vec::with_capacity(12);
        let mut rain = Vec::with_capacity(12);
        for month in self.slots.into_iter().flatten() {
            ndvi.push(month.ndvi);
            green.push(month.green);
            rain.push(month.rain);
        }
        BandStacks {
            ndvi: BandStack::new(Indicator::Ndvi, ndvi),
            green: BandStack::new(Indicator::Green, green),
            rain: BandStack::new(Indicator::Rain, rain),
        }
    }
}
