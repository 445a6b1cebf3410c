//! Per-pixel reduction of image stacks
//!
//! A stack is the set of scenes a collection query returned. Reducing it
//! collapses the scene axis so each output pixel summarises every valid
//! observation at that location. Missing observations (NaN or declared
//! no-data) are skipped; a pixel with none stays NaN.

use std::fmt;

use crate::grid::AnalysisGrid;
use crate::image::Image;
use crate::imagery::band_math::{build_output, is_missing};
use crate::maybe_rayon::*;
use irrimetrics_core::{Error, Raster, Result};
use tracing::debug;

/// Per-pixel statistic applied across a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reducer {
    Min,
    Sum,
    Median,
}

impl Reducer {
    /// Suffix appended to reduced band names, e.g. `B5` becomes `B5_min`
    pub fn suffix(self) -> &'static str {
        match self {
            Reducer::Min => "min",
            Reducer::Sum => "sum",
            Reducer::Median => "median",
        }
    }

    /// Name a band takes after reduction
    pub fn reduced_name(self, band: &str) -> String {
        format!("{}_{}", band, self.suffix())
    }

    /// Reduce the valid values of one pixel; `values` may be reordered
    fn reduce(self, values: &mut [f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        match self {
            Reducer::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reducer::Sum => values.iter().sum(),
            Reducer::Median => {
                values.sort_unstable_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 1 {
                    values[mid]
                } else {
                    (values[mid - 1] + values[mid]) / 2.0
                }
            }
        }
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Reduce a stack of single-band rasters lying on `grid`.
///
/// An empty stack yields an all-NaN raster.
pub fn reduce_rasters(rasters: &[&Raster<f64>], reducer: Reducer, grid: &AnalysisGrid) -> Result<Raster<f64>> {
    let template = grid.empty_raster();
    if rasters.is_empty() {
        debug!(%reducer, "empty stack, emitting all-NaN band");
        return Ok(template);
    }
    if let Some(off) = rasters.iter().find(|r| !grid.matches(**r)) {
        let (er, ec) = grid.shape();
        let (ar, ac) = off.shape();
        return Err(Error::SizeMismatch { er, ec, ar, ac });
    }

    let (rows, cols) = grid.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut buf = Vec::with_capacity(rasters.len());
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                buf.clear();
                for r in rasters {
                    let v = unsafe { r.get_unchecked(row, col) };
                    if !is_missing(v, r.nodata()) {
                        buf.push(v);
                    }
                }
                *out = reducer.reduce(&mut buf);
            }
            row_data
        })
        .collect();

    build_output(&template, data)
}

/// Reduce every listed band across a stack of images.
///
/// Output bands are named `<band>_<reducer>` and keep the order of
/// `bands`. Every image must carry every listed band on `grid`.
pub fn reduce_stack(images: &[Image], reducer: Reducer, bands: &[&str], grid: &AnalysisGrid) -> Result<Image> {
    let mut out = Image::new();
    for band in bands {
        let rasters = images
            .iter()
            .map(|img| img.require(band))
            .collect::<Result<Vec<_>>>()?;
        let reduced = reduce_rasters(&rasters, reducer, grid)?;
        out.add_band(reducer.reduced_name(band), reduced)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use irrimetrics_core::Region;

    fn grid() -> AnalysisGrid {
        let region = Region::around_point("sq", 85.0, 25.0, 1.0).unwrap();
        AnalysisGrid::covering(&region, 1.0).unwrap()
    }

    fn scene(grid: &AnalysisGrid, values: [f64; 4]) -> Raster<f64> {
        let mut r = grid.empty_raster();
        for (i, v) in values.into_iter().enumerate() {
            r.set(i / 2, i % 2, v).unwrap();
        }
        r
    }

    #[test]
    fn min_sum_median_skip_missing() {
        let g = grid();
        let a = scene(&g, [1.0, f64::NAN, 5.0, f64::NAN]);
        let b = scene(&g, [3.0, 2.0, 1.0, f64::NAN]);
        let c = scene(&g, [2.0, 4.0, 9.0, f64::NAN]);
        let stack = [&a, &b, &c];

        let min = reduce_rasters(&stack, Reducer::Min, &g).unwrap();
        assert_eq!(min.get(0, 0).unwrap(), 1.0);
        assert_eq!(min.get(0, 1).unwrap(), 2.0);
        assert!(min.get(1, 1).unwrap().is_nan());

        let sum = reduce_rasters(&stack, Reducer::Sum, &g).unwrap();
        assert_eq!(sum.get(0, 0).unwrap(), 6.0);
        assert_eq!(sum.get(1, 0).unwrap(), 15.0);
        assert!(sum.get(1, 1).unwrap().is_nan());

        let median = reduce_rasters(&stack, Reducer::Median, &g).unwrap();
        assert_eq!(median.get(0, 0).unwrap(), 2.0);
        assert_eq!(median.get(0, 1).unwrap(), 3.0);
        assert_eq!(median.get(1, 0).unwrap(), 5.0);
    }

    #[test]
    fn empty_stack_is_all_nan() {
        let g = grid();
        let out = reduce_rasters(&[], Reducer::Median, &g).unwrap();
        assert!(g.matches(&out));
        assert!(out.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn reduce_stack_names_bands() {
        let g = grid();
        let images: Vec<Image> = (0..2)
            .map(|i| {
                Image::new()
                    .with_band("B4", g.filled(i as f64))
                    .unwrap()
                    .with_band("B5", g.filled(10.0 + i as f64))
                    .unwrap()
            })
            .collect();
        let out = reduce_stack(&images, Reducer::Min, &["B5", "B4"], &g).unwrap();
        assert_eq!(out.band_names().collect::<Vec<_>>(), vec!["B5_min", "B4_min"]);
        assert_eq!(out.require("B5_min").unwrap().get(0, 0).unwrap(), 10.0);
        assert!(reduce_stack(&images, Reducer::Min, &["B9"], &g).is_err());
    }

    #[test]
    fn rejects_off_grid_scene() {
        let g = grid();
        let off = Raster::filled(3, 3, 1.0);
        assert!(reduce_rasters(&[&off], Reducer::Sum, &g).is_err());
    }
}
