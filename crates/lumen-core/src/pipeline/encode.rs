//! Quantization and container encoding.
//!
//! Thumbnails are written as 8-bit grayscale PNG with fixed compression and
//! filter settings so identical buffers always produce identical bytes.
//! Preserved originals are re-encoded as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, GrayImage, ImageEncoder};

use crate::error::{PipelineError, PipelineResult};

use super::buffer::{ColorLayout, GrayBuffer, PixelBuffer};

/// PNG compression level used for every thumbnail.
pub const PNG_COMPRESSION: CompressionType = CompressionType::Default;

/// PNG row filter used for every thumbnail.
pub const PNG_FILTER: FilterType = FilterType::Adaptive;

/// Map float samples to 8-bit: clamp to [0, 1], scale by 255, round.
pub fn quantize(buffer: &GrayBuffer) -> PipelineResult<GrayImage> {
    let (height, width) = buffer.dims();
    let raw: Vec<u8> = buffer
        .samples()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(width, height, raw).ok_or_else(|| PipelineError::Encode {
        format: "gray8".to_string(),
        message: format!("sample count does not match {width}x{height}"),
    })
}

/// Encode an 8-bit grayscale image as PNG.
pub fn encode_png(image: &GrayImage) -> PipelineResult<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, PNG_COMPRESSION, PNG_FILTER)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::L8,
        )
        .map_err(|e| PipelineError::Encode {
            format: "png".to_string(),
            message: e.to_string(),
        })?;
    Ok(bytes)
}

/// Encode a decoded buffer as JPEG at `quality` (1-100).
pub fn encode_jpeg(pixels: &PixelBuffer, quality: u8) -> PipelineResult<Vec<u8>> {
    let color = match pixels.layout() {
        ColorLayout::Gray => ExtendedColorType::L8,
        ColorLayout::Rgb => ExtendedColorType::Rgb8,
    };
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .write_image(&pixels.to_raw(), pixels.width(), pixels.height(), color)
        .map_err(|e| PipelineError::Encode {
            format: "jpeg".to_string(),
            message: e.to_string(),
        })?;
    Ok(bytes)
}
