//! Pipeline orchestration - wires together all processing stages.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Config, LimitsConfig, ProcessingConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ProcessedImage, ProcessingRequest};

use super::buffer::TargetSize;
use super::deadline::Deadline;
use super::decode::{format_to_string, ImageDecoder};
use super::encode::{encode_jpeg, encode_png, quantize};
use super::grayscale::to_luminance;
use super::normalize::normalize;
use super::resample::resize_within;
use super::validate::Validator;

/// Runs decode → grayscale → resample → normalize → quantize → encode.
///
/// Cheap to clone; the async entry point moves a clone onto the blocking pool.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    inner: Arc<Stages>,
}

#[derive(Debug)]
struct Stages {
    decoder: ImageDecoder,
    validator: Validator,
    processing: ProcessingConfig,
    limits: LimitsConfig,
}

impl ImageProcessor {
    /// Create a new image processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(Stages {
                decoder: ImageDecoder::new(config.limits.clone()),
                validator: Validator::new(config.limits.clone()),
                processing: config.processing.clone(),
                limits: config.limits.clone(),
            }),
        }
    }

    /// Validate a caller-supplied `[height, width]` against the configured maximum.
    pub fn target_size(&self, height: i64, width: i64) -> PipelineResult<TargetSize> {
        TargetSize::new(height, width, self.inner.processing.max_target_dimension)
    }

    /// Default target size for requests that omit one.
    pub fn default_target(&self) -> TargetSize {
        let [height, width] = self.inner.processing.default_size;
        TargetSize { height, width }
    }

    /// Process a request on the blocking pool under the configured timeout.
    ///
    /// The blocking task polls the deadline itself and is always awaited, so
    /// a timed-out run has released its thread by the time this returns.
    pub async fn process(&self, request: ProcessingRequest) -> PipelineResult<ProcessedImage> {
        let deadline = Deadline::after(Duration::from_millis(self.inner.limits.process_timeout_ms));
        let processor = self.clone();
        let task = tokio::task::spawn_blocking(move || {
            processor.process_within(
                &request.image,
                request.target,
                request.save_original,
                &deadline,
            )
        });

        task.await
            .map_err(|e| PipelineError::Worker(format!("task join error: {e}")))?
    }

    /// Run every stage synchronously on the calling thread, without a deadline.
    pub fn process_sync(
        &self,
        bytes: &[u8],
        target: TargetSize,
        save_original: bool,
    ) -> PipelineResult<ProcessedImage> {
        self.process_within(bytes, target, save_original, &Deadline::unbounded())
    }

    /// Run every stage synchronously, checking `deadline` between stages.
    ///
    /// When `save_original` is set the decoded source is also re-encoded as
    /// JPEG; that path skips the grayscale, resample and normalize stages.
    pub fn process_within(
        &self,
        bytes: &[u8],
        target: TargetSize,
        save_original: bool,
        deadline: &Deadline,
    ) -> PipelineResult<ProcessedImage> {
        let start = Instant::now();

        deadline.check("validate")?;
        self.inner.validator.validate(bytes)?;

        let decode_start = Instant::now();
        let decoded = self.inner.decoder.decode(bytes)?;
        tracing::trace!("  Decode: {:?}", decode_start.elapsed());
        deadline.check("decode")?;

        let reduce_start = Instant::now();
        let gray = to_luminance(&decoded.pixels);
        tracing::trace!("  Grayscale: {:?}", reduce_start.elapsed());
        deadline.check("grayscale")?;

        let resample_start = Instant::now();
        let resized = resize_within(&gray, target.height, target.width, deadline)?;
        drop(gray);
        tracing::trace!("  Resample: {:?}", resample_start.elapsed());

        let normalized = normalize(resized);

        let encode_start = Instant::now();
        let quantized = quantize(&normalized.buffer)?;
        let processed_png = encode_png(&quantized)?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        let original_jpeg = if save_original {
            deadline.check("original")?;
            let original_start = Instant::now();
            let jpeg = encode_jpeg(&decoded.pixels, self.inner.processing.original_quality)?;
            tracing::trace!("  Original: {:?}", original_start.elapsed());
            Some(jpeg)
        } else {
            None
        };

        let original_dims = decoded.dims();
        tracing::debug!(
            "Processed {} {}x{} -> {}x{} in {:?} (min {:.4}, max {:.4})",
            format_to_string(decoded.format),
            original_dims.0,
            original_dims.1,
            target.height,
            target.width,
            start.elapsed(),
            normalized.min,
            normalized.max
        );

        Ok(ProcessedImage {
            original_dims,
            processed_dims: normalized.buffer.dims(),
            valor_min: normalized.min,
            valor_max: normalized.max,
            source_format: format_to_string(decoded.format),
            layout: decoded.layout(),
            processed_png,
            original_jpeg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::buffer::ColorLayout;
    use crate::pipeline::resample::resize;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn processor() -> ImageProcessor {
        ImageProcessor::new(&Config::default())
    }

    fn gradient() -> Vec<u8> {
        let img = RgbImage::from_fn(90, 70, |x, y| {
            Rgb([(x * 2) as u8, (y * 3) as u8, ((x + y) % 256) as u8])
        });
        png_bytes(DynamicImage::ImageRgb8(img))
    }

    #[test]
    fn test_processed_dimensions_match_target() {
        let bytes = gradient();
        for (h, w) in [(1, 1), (10, 10), (64, 64), (140, 33)] {
            let target = processor().target_size(h, w).unwrap();
            let out = processor().process_sync(&bytes, target, false).unwrap();
            assert_eq!(out.original_dims, (70, 90));
            assert_eq!(out.processed_dims, (h as u32, w as u32));
            let thumb = image::load_from_memory(&out.processed_png).unwrap();
            assert_eq!((thumb.height(), thumb.width()), (h as u32, w as u32));
        }
    }

    #[test]
    fn test_red_square() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let bytes = png_bytes(DynamicImage::ImageRgb8(img));
        let target = processor().target_size(10, 10).unwrap();
        let out = processor().process_sync(&bytes, target, true).unwrap();

        assert_eq!(out.original_dims, (100, 100));
        assert_eq!(out.processed_dims, (10, 10));
        assert!((out.valor_max - 1.0).abs() < 1e-9);
        assert!((out.valor_min - 1.0).abs() < 1e-9);
        assert_eq!(out.layout, ColorLayout::Rgb);
        assert_eq!(out.source_format, "png");
        assert!(out.original_jpeg.is_some());
    }

    #[test]
    fn test_black_image_stays_zero() {
        let bytes = png_bytes(DynamicImage::ImageLuma8(GrayImage::new(20, 20)));
        let target = processor().target_size(5, 5).unwrap();
        let out = processor().process_sync(&bytes, target, false).unwrap();
        assert_eq!(out.valor_min, 0.0);
        assert_eq!(out.valor_max, 0.0);
        let thumb = image::load_from_memory(&out.processed_png).unwrap().into_luma8();
        assert!(thumb.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_output_is_deterministic() {
        let bytes = gradient();
        let target = processor().target_size(17, 23).unwrap();
        let a = processor().process_sync(&bytes, target, false).unwrap();
        let b = processor().process_sync(&bytes, target, false).unwrap();
        assert_eq!(a.processed_png, b.processed_png);
    }

    #[test]
    fn test_png_round_trip_matches_quantized_stages() {
        let bytes = gradient();
        let target = processor().target_size(12, 15).unwrap();
        let out = processor().process_sync(&bytes, target, false).unwrap();

        let decoded = ImageDecoder::new(LimitsConfig::default()).decode(&bytes).unwrap();
        let resized = resize(&to_luminance(&decoded.pixels), 12, 15).unwrap();
        let expected = quantize(&normalize(resized).buffer).unwrap();

        let thumb = image::load_from_memory(&out.processed_png).unwrap().into_luma8();
        assert_eq!(thumb, expected);
    }

    #[test]
    fn test_original_skipped_when_not_requested() {
        let bytes = png_bytes(DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([120]))));
        let target = processor().target_size(4, 4).unwrap();
        let out = processor().process_sync(&bytes, target, false).unwrap();
        assert!(out.original_jpeg.is_none());
        assert_eq!(out.layout, ColorLayout::Gray);
    }

    #[test]
    fn test_garbage_bytes_fail_decode() {
        let target = processor().default_target();
        let err = processor()
            .process_sync(b"not an image at all", target, true)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[tokio::test]
    async fn test_async_process() {
        let request = ProcessingRequest {
            image: gradient(),
            media_type: Some("image/png".to_string()),
            target: processor().target_size(8, 8).unwrap(),
            save_original: false,
        };
        let out = processor().process(request).await.unwrap();
        assert_eq!(out.processed_dims, (8, 8));
        assert_eq!(out.valor_max, 1.0);
    }

    #[test]
    fn test_expired_deadline_aborts_before_work() {
        let target = processor().target_size(8, 8).unwrap();
        let err = processor()
            .process_within(&gradient(), target, true, &Deadline::after(Duration::ZERO))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { ref stage, .. } if stage == "validate"));
    }

    #[tokio::test]
    async fn test_timed_out_task_has_finished_when_process_returns() {
        let img = RgbImage::from_fn(1500, 1500, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x ^ y) % 256) as u8])
        });
        let bytes = png_bytes(DynamicImage::ImageRgb8(img));
        let config = Config {
            limits: LimitsConfig {
                process_timeout_ms: 1,
                ..LimitsConfig::default()
            },
            ..Config::default()
        };
        let processor = ImageProcessor::new(&config);
        let request = ProcessingRequest {
            image: bytes,
            media_type: None,
            target: processor.target_size(64, 64).unwrap(),
            save_original: true,
        };

        let err = processor.process(request).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 1, .. }));
        // Only the caller's handle remains: the blocking task dropped its clone.
        assert_eq!(Arc::strong_count(&processor.inner), 1);
    }
}
