//! Image decoding with content-based format detection.

use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

use super::buffer::{ColorLayout, PixelBuffer};

/// Image decoder with configurable limits.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// Decoded samples, grayscale or RGB
    pub pixels: PixelBuffer,
    /// Detected container format
    pub format: ImageFormat,
    /// Encoded size in bytes
    pub byte_len: usize,
}

impl DecodedImage {
    pub fn layout(&self) -> ColorLayout {
        self.pixels.layout()
    }

    /// `(height, width)` of the source image.
    pub fn dims(&self) -> (u32, u32) {
        (self.pixels.height(), self.pixels.width())
    }
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode an in-memory image.
    ///
    /// Sources without color information (L, LA) become [`ColorLayout::Gray`];
    /// everything else is converted to [`ColorLayout::Rgb`]. Alpha is dropped.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::Decode("empty image payload".to_string()));
        }

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode(format!("cannot detect image format: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| PipelineError::Decode("unrecognized image container".to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;

        let (width, height) = (image.width(), image.height());
        if width > self.limits.max_image_dimension || height > self.limits.max_image_dimension {
            return Err(PipelineError::ImageTooLarge {
                width,
                height,
                max_dim: self.limits.max_image_dimension,
            });
        }

        let pixels = to_pixel_buffer(image)?;
        tracing::trace!(
            "Decoded {} {}x{} as {:?}",
            format_to_string(format),
            width,
            height,
            pixels.layout()
        );

        Ok(DecodedImage {
            pixels,
            format,
            byte_len: bytes.len(),
        })
    }
}

fn to_pixel_buffer(image: DynamicImage) -> Result<PixelBuffer, PipelineError> {
    let (width, height) = (image.width(), image.height());
    if image.color().has_color() {
        PixelBuffer::from_raw(height, width, ColorLayout::Rgb, image.into_rgb8().into_raw())
    } else {
        PixelBuffer::from_raw(height, width, ColorLayout::Gray, image.into_luma8().into_raw())
    }
}

/// Convert an ImageFormat to a string representation.
pub fn format_to_string(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "jpeg".to_string(),
        ImageFormat::Png => "png".to_string(),
        ImageFormat::WebP => "webp".to_string(),
        ImageFormat::Gif => "gif".to_string(),
        ImageFormat::Tiff => "tiff".to_string(),
        ImageFormat::Bmp => "bmp".to_string(),
        _ => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn decoder() -> ImageDecoder {
        ImageDecoder::new(LimitsConfig::default())
    }

    #[test]
    fn test_format_to_string() {
        assert_eq!(format_to_string(ImageFormat::Jpeg), "jpeg");
        assert_eq!(format_to_string(ImageFormat::Png), "png");
        assert_eq!(format_to_string(ImageFormat::Avif), "unknown");
    }

    #[test]
    fn test_decode_rgb_png() {
        let img = RgbImage::from_pixel(5, 3, Rgb([10, 20, 30]));
        let decoded = decoder()
            .decode(&png_bytes(DynamicImage::ImageRgb8(img)))
            .unwrap();
        assert_eq!(decoded.format, ImageFormat::Png);
        assert_eq!(decoded.layout(), ColorLayout::Rgb);
        assert_eq!(decoded.dims(), (3, 5));
        assert_eq!(decoded.pixels.samples()[[2, 4, 1]], 20);
    }

    #[test]
    fn test_decode_gray_png() {
        let img = GrayImage::from_pixel(4, 4, Luma([77]));
        let decoded = decoder()
            .decode(&png_bytes(DynamicImage::ImageLuma8(img)))
            .unwrap();
        assert_eq!(decoded.layout(), ColorLayout::Gray);
        assert!(decoded.pixels.samples().iter().all(|&v| v == 77));
    }

    #[test]
    fn test_decode_rgba_drops_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 0]));
        let decoded = decoder()
            .decode(&png_bytes(DynamicImage::ImageRgba8(img)))
            .unwrap();
        assert_eq!(decoded.layout(), ColorLayout::Rgb);
        assert_eq!(decoded.pixels.to_raw()[..3], [200, 100, 50]);
    }

    #[test]
    fn test_decode_single_pixel_is_success() {
        let img = GrayImage::from_pixel(1, 1, Luma([0]));
        let decoded = decoder()
            .decode(&png_bytes(DynamicImage::ImageLuma8(img)))
            .unwrap();
        assert_eq!(decoded.dims(), (1, 1));
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(matches!(decoder().decode(&[]), Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_fails() {
        let bytes = png_bytes(DynamicImage::new_rgb8(32, 32));
        let truncated = &bytes[..bytes.len() / 2];
        assert!(matches!(
            decoder().decode(truncated),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            decoder().decode(b"definitely not an image"),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_dimension_limit() {
        let limits = LimitsConfig {
            max_image_dimension: 8,
            ..LimitsConfig::default()
        };
        let bytes = png_bytes(DynamicImage::new_luma8(16, 4));
        let err = ImageDecoder::new(limits).decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ImageTooLarge {
                width: 16,
                height: 4,
                max_dim: 8
            }
        ));
    }
}
