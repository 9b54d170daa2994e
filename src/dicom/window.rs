//! Display window derived from the pixel range of a frame.

use super::dataset::Dataset;
use super::tags;
use crate::error::Result;
use ndarray::ArrayView2;

/// VOI window (`WindowCenter`, `WindowWidth`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    /// Window centre.
    pub center: f64,
    /// Window width.
    pub width: f64,
}

impl Window {
    /// Window spanning `[min, max]` inclusive.
    pub fn from_range(min: f64, max: f64) -> Self {
        let width = max - min + 1.0;
        Self {
            center: min + width / 2.0,
            width,
        }
    }
}

/// Smallest and largest value of a pixel buffer.
pub fn pixel_range(pixels: ArrayView2<'_, i16>) -> Option<(i16, i16)> {
    pixels.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Window for a frame, preferring the declared smallest/largest pixel values
/// over the actual pixel range.
pub fn auto_window<D: Dataset + ?Sized>(
    dataset: &D,
    pixels: ArrayView2<'_, i16>,
) -> Result<Option<Window>> {
    let range = pixel_range(pixels);
    let min = match dataset.optional_f64(tags::SMALLEST_IMAGE_PIXEL_VALUE)? {
        Some(v) => Some(v),
        None => range.map(|(lo, _)| f64::from(lo)),
    };
    let max = match dataset.optional_f64(tags::LARGEST_IMAGE_PIXEL_VALUE)? {
        Some(v) => Some(v),
        None => range.map(|(_, hi)| f64::from(hi)),
    };
    Ok(min.zip(max).map(|(lo, hi)| Window::from_range(lo, hi)))
}
