//! Peak normalization.

use super::buffer::GrayBuffer;

/// A buffer rescaled so its maximum is 1.0, with the observed value range.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub buffer: GrayBuffer,
    /// Smallest sample after division
    pub min: f64,
    /// Largest sample after division; 1.0 unless the input was all zero
    pub max: f64,
}

/// Divide every sample by the buffer maximum.
///
/// A non-positive maximum (all-black input) leaves the samples untouched
/// instead of dividing by zero.
pub fn normalize(buffer: GrayBuffer) -> Normalized {
    let (_, peak) = value_range(&buffer);
    let buffer = if peak > 0.0 {
        GrayBuffer::new(buffer.into_samples().mapv_into(|v| v / peak))
    } else {
        buffer
    };
    let (min, max) = value_range(&buffer);
    Normalized { buffer, min, max }
}

/// `(min, max)` over all samples.
pub fn value_range(buffer: &GrayBuffer) -> (f64, f64) {
    buffer
        .samples()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
