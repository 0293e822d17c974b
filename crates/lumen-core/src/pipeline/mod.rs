//! Image processing pipeline components.
//!
//! Stages run strictly left to right for every request:
//! - **validate**: Cheap checks on the encoded bytes
//! - **decode**: Decode into an 8-bit grayscale or RGB buffer
//! - **grayscale**: Reduce to single-channel luminance in [0, 1]
//! - **resample**: Anti-aliased resize to the requested size
//! - **normalize**: Rescale so the maximum becomes 1.0
//! - **encode**: Quantize to 8-bit and write PNG (or JPEG for originals)
//! - **processor**: Orchestrates the full pipeline under a [`Deadline`]

pub mod buffer;
pub mod deadline;
pub mod decode;
pub mod encode;
pub mod grayscale;
pub mod normalize;
pub mod processor;
pub mod resample;
pub mod validate;

// Re-exports for convenient access
pub use buffer::{ColorLayout, GrayBuffer, PixelBuffer, TargetSize};
pub use deadline::Deadline;
pub use decode::{DecodedImage, ImageDecoder};
pub use normalize::Normalized;
pub use processor::ImageProcessor;
pub use validate::Validator;
