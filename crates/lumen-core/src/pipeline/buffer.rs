//! Pixel buffers passed between pipeline stages.
//!
//! Every stage consumes or borrows its input and returns a fresh buffer, so
//! each stage stays a pure function of its arguments.

use ndarray::{Array2, Array3};

use crate::error::{PipelineError, PipelineResult};

/// How the decoder interpreted the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayout {
    /// Single luminance channel
    Gray,
    /// Three interleaved channels in R, G, B order
    Rgb,
}

impl ColorLayout {
    /// Number of samples per pixel.
    pub fn channels(self) -> usize {
        match self {
            ColorLayout::Gray => 1,
            ColorLayout::Rgb => 3,
        }
    }
}

/// Decoded 8-bit image with shape `(height, width, channels)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    data: Array3<u8>,
    layout: ColorLayout,
}

impl PixelBuffer {
    /// Wrap raw interleaved samples. `raw.len()` must equal `height * width * channels`.
    pub fn from_raw(
        height: u32,
        width: u32,
        layout: ColorLayout,
        raw: Vec<u8>,
    ) -> PipelineResult<Self> {
        if height == 0 || width == 0 {
            return Err(PipelineError::Decode(format!(
                "image has no pixels ({height}x{width})"
            )));
        }
        let shape = (height as usize, width as usize, layout.channels());
        let data = Array3::from_shape_vec(shape, raw)
            .map_err(|e| PipelineError::Decode(format!("sample count mismatch: {e}")))?;
        Ok(Self { data, layout })
    }

    pub fn height(&self) -> u32 {
        self.data.dim().0 as u32
    }

    pub fn width(&self) -> u32 {
        self.data.dim().1 as u32
    }

    pub fn layout(&self) -> ColorLayout {
        self.layout
    }

    pub fn samples(&self) -> &Array3<u8> {
        &self.data
    }

    /// Samples in row-major interleaved order.
    pub fn to_raw(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }
}

/// Single-channel floating point image with shape `(height, width)`.
///
/// Samples are nominally in [0, 1]; interpolation may overshoot slightly
/// until the quantizer clamps them.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayBuffer {
    data: Array2<f64>,
}

impl GrayBuffer {
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    pub fn height(&self) -> u32 {
        self.data.nrows() as u32
    }

    pub fn width(&self) -> u32 {
        self.data.ncols() as u32
    }

    /// `(height, width)`
    pub fn dims(&self) -> (u32, u32) {
        (self.height(), self.width())
    }

    pub fn samples(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_samples(self) -> Array2<f64> {
        self.data
    }
}

/// Requested output size, both components at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub height: u32,
    pub width: u32,
}

impl TargetSize {
    /// Validate a caller-supplied `[height, width]` pair against `max`.
    pub fn new(height: i64, width: i64, max: u32) -> PipelineResult<Self> {
        let in_range = |v: i64| v >= 1 && v <= i64::from(max);
        if !in_range(height) || !in_range(width) {
            return Err(PipelineError::InvalidDimensions { height, width, max });
        }
        Ok(Self {
            height: height as u32,
            width: width as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffer_shape() {
        let buf = PixelBuffer::from_raw(2, 3, ColorLayout::Rgb, vec![0; 18]).unwrap();
        assert_eq!(buf.height(), 2);
        assert_eq!(buf.width(), 3);
        assert_eq!(buf.samples().dim(), (2, 3, 3));
    }

    #[test]
    fn test_pixel_buffer_rejects_wrong_length() {
        let result = PixelBuffer::from_raw(2, 2, ColorLayout::Gray, vec![0; 3]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_pixel_buffer_rejects_empty() {
        let result = PixelBuffer::from_raw(0, 2, ColorLayout::Gray, vec![]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_target_size_bounds() {
        assert!(TargetSize::new(1, 1, 4096).is_ok());
        assert!(TargetSize::new(4096, 4096, 4096).is_ok());
        assert!(matches!(
            TargetSize::new(0, 10, 4096),
            Err(PipelineError::InvalidDimensions { height: 0, width: 10, .. })
        ));
        assert!(TargetSize::new(10, -3, 4096).is_err());
        assert!(TargetSize::new(4097, 10, 4096).is_err());
    }
}
