//! Cell value trait for generic rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types that can be stored in a raster cell.
///
/// Scenes arrive in whatever sample type the source product uses
/// (`u16` reflectance counts, `f32` radiance, ...); every derived band is
/// widened to `f64` through [`RasterElement::to_f64`].
pub trait RasterElement:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value used to fill cells that carry no data
    fn default_nodata() -> Self;

    /// Whether this value is a no-data cell given the raster's declared no-data value
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Widen to `f64`, mapping unrepresentable values to `None`
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Narrow from `f64`, falling back to the no-data value
    fn from_f64(value: f64) -> Self {
        NumCast::from(value).unwrap_or_else(Self::default_nodata)
    }
}

macro_rules! impl_int_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! impl_float_element {
    ($($t:ty),*) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                self.is_nan() || nodata.is_some_and(|nd| *self == nd)
            }
        }
    )*};
}

impl_int_element!(i8, i16, i32, i64, u8, u16, u32, u64);
impl_float_element!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(!0.0_f64.is_nodata(None));
        assert!((-9999.0_f32).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn integer_nodata_needs_declared_value() {
        assert!(!0_u16.is_nodata(None));
        assert!(0_u16.is_nodata(Some(0)));
        assert_eq!(u16::from_f64(-1.0), u16::MIN);
    }
}
