//! RGB to luminance reduction.
//!
//! Uses the ITU-R BT.709 weights `Y = 0.2125 R + 0.7154 G + 0.0721 B` on
//! samples scaled to [0, 1]. Output byte streams depend on these exact
//! constants; do not re-derive them.

use ndarray::{Array2, Axis};

use super::buffer::{ColorLayout, GrayBuffer, PixelBuffer};

/// Red weight.
pub const LUMA_R: f64 = 0.2125;
/// Green weight.
pub const LUMA_G: f64 = 0.7154;
/// Blue weight.
pub const LUMA_B: f64 = 0.0721;

const U8_MAX: f64 = 255.0;

/// Reduce a decoded buffer to single-channel luminance in [0, 1].
///
/// Grayscale input is only rescaled by 1/255.
pub fn to_luminance(pixels: &PixelBuffer) -> GrayBuffer {
    let samples = pixels.samples();
    let data: Array2<f64> = match pixels.layout() {
        ColorLayout::Gray => samples
            .index_axis(Axis(2), 0)
            .mapv(|v| f64::from(v) / U8_MAX),
        ColorLayout::Rgb => samples.map_axis(Axis(2), |px| {
            let r = f64::from(px[0]) / U8_MAX;
            let g = f64::from(px[1]) / U8_MAX;
            let b = f64::from(px[2]) / U8_MAX;
            LUMA_R * r + LUMA_G * g + LUMA_B * b
        }),
    };
    GrayBuffer::new(data)
}
