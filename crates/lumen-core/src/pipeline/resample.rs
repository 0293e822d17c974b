//! Anti-aliased resampling of single-channel float buffers.
//!
//! Downsampling applies a separable Gaussian low-pass filter with
//! `sigma = (scale - 1) / 2` per axis, then interpolates bilinearly at
//! pixel centers. Upsampling skips the filter.
//!
//! Bilinear interpolation reads at most two source rows and two source
//! columns per output sample, so the filter is only evaluated at those
//! rows and columns. Each evaluated sample goes through the same sequence
//! of floating-point operations as a full-image blur would apply, and the
//! result is bit-identical to filtering everything first.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

use crate::error::{PipelineError, PipelineResult};

use super::buffer::GrayBuffer;
use super::deadline::Deadline;

/// Gaussian kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

const STAGE: &str = "resample";

/// Resize `input` to exactly `height x width`.
pub fn resize(input: &GrayBuffer, height: u32, width: u32) -> PipelineResult<GrayBuffer> {
    resize_within(input, height, width, &Deadline::unbounded())
}

/// Resize `input` to exactly `height x width`, giving up once `deadline` passes.
///
/// Output samples are not clamped; bilinear interpolation of filtered data
/// stays within the input range but callers must not rely on it.
pub fn resize_within(
    input: &GrayBuffer,
    height: u32,
    width: u32,
    deadline: &Deadline,
) -> PipelineResult<GrayBuffer> {
    if height == 0 || width == 0 {
        return Err(PipelineError::ZeroDimension { height, width });
    }

    let (in_h, in_w) = input.dims();
    let scale_y = f64::from(in_h) / f64::from(height);
    let scale_x = f64::from(in_w) / f64::from(width);

    let (rows, taps_y) = compact_taps(&linear_taps(in_h as usize, height as usize));
    let (cols, taps_x) = compact_taps(&linear_taps(in_w as usize, width as usize));
    let kernel_y = anti_alias_sigma(scale_y).map(gaussian_kernel);
    let kernel_x = anti_alias_sigma(scale_x).map(gaussian_kernel);

    let filtered = filter_at(
        input.samples().view(),
        &rows,
        &cols,
        kernel_y.as_deref(),
        kernel_x.as_deref(),
        deadline,
    )?;

    let data = interpolate_axis(&filtered, Axis(0), &taps_y);
    deadline.check(STAGE)?;
    let data = interpolate_axis(&data, Axis(1), &taps_x);

    tracing::trace!(
        "Resampled {}x{} -> {}x{} (scale {:.3}, {:.3}, {} rows x {} cols filtered)",
        in_h,
        in_w,
        height,
        width,
        scale_y,
        scale_x,
        rows.len(),
        cols.len()
    );
    Ok(GrayBuffer::new(data))
}

/// Low-pass strength for a scale factor, `None` when no filtering is needed.
fn anti_alias_sigma(scale: f64) -> Option<f64> {
    let sigma = (scale - 1.0) / 2.0;
    (sigma > 0.0).then_some(sigma)
}

/// Normalized Gaussian weights for offsets `-radius..=radius`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-((k * k) as f64) / denom).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / sum).collect()
}

/// Reflect `i` into `0..len` without repeating the edge sample (`d c b | a b c d | c b a`).
fn mirror_index(i: i64, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let m = i.rem_euclid(period);
    if m >= len as i64 {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Source indices `center - radius ..= center + radius`, mirrored into `0..len`.
fn kernel_support(center: usize, radius: usize, len: usize) -> impl Iterator<Item = usize> {
    let start = center as i64 - radius as i64;
    (0..=2 * radius as i64).map(move |k| mirror_index(start + k, len))
}

/// Blur `src` along rows with `kernel_y`, then along columns with
/// `kernel_x`, evaluating only the sampled `rows` x `cols`.
fn filter_at(
    src: ArrayView2<f64>,
    rows: &[usize],
    cols: &[usize],
    kernel_y: Option<&[f64]>,
    kernel_x: Option<&[f64]>,
    deadline: &Deadline,
) -> PipelineResult<Array2<f64>> {
    let (in_h, in_w) = src.dim();
    let mut out = Array2::<f64>::zeros((rows.len(), cols.len()));
    let mut row_buf = Array1::<f64>::zeros(in_w);

    for (&r, mut out_row) in rows.iter().zip(out.rows_mut()) {
        deadline.check(STAGE)?;

        match kernel_y {
            Some(kernel) => {
                row_buf.fill(0.0);
                let radius = kernel.len() / 2;
                for (w, j) in kernel.iter().zip(kernel_support(r, radius, in_h)) {
                    row_buf.zip_mut_with(&src.row(j), |acc, &v| *acc += w * v);
                }
            }
            None => row_buf.assign(&src.row(r)),
        }

        match kernel_x {
            Some(kernel) => {
                let radius = kernel.len() / 2;
                for (&c, value) in cols.iter().zip(out_row.iter_mut()) {
                    let mut acc = 0.0;
                    for (w, j) in kernel.iter().zip(kernel_support(c, radius, in_w)) {
                        acc += w * row_buf[j];
                    }
                    *value = acc;
                }
            }
            None => {
                for (&c, value) in cols.iter().zip(out_row.iter_mut()) {
                    *value = row_buf[c];
                }
            }
        }
    }
    Ok(out)
}

/// Source position and weight for one output sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f64,
}

/// Pixel-center aligned bilinear taps mapping `in_len` samples onto `out_len`.
/// Positions outside the source are clamped to the edge sample.
fn linear_taps(in_len: usize, out_len: usize) -> Vec<Tap> {
    let scale = in_len as f64 / out_len as f64;
    let last = (in_len - 1) as f64;
    (0..out_len)
        .map(|o| {
            let c = ((o as f64 + 0.5) * scale - 0.5).clamp(0.0, last);
            let lo = c.floor() as usize;
            let hi = (lo + 1).min(in_len - 1);
            Tap {
                lo,
                hi,
                frac: c - lo as f64,
            }
        })
        .collect()
}

/// Split taps into the sorted distinct source indices they read and the
/// same taps re-pointed at positions in that list.
fn compact_taps(taps: &[Tap]) -> (Vec<usize>, Vec<Tap>) {
    let mut sources: Vec<usize> = taps.iter().flat_map(|t| [t.lo, t.hi]).collect();
    sources.sort_unstable();
    sources.dedup();

    let position = |i: usize| sources.partition_point(|&s| s < i);
    let remapped = taps
        .iter()
        .map(|t| Tap {
            lo: position(t.lo),
            hi: position(t.hi),
            frac: t.frac,
        })
        .collect();
    (sources, remapped)
}

fn interpolate_lane(lane_in: ArrayView1<f64>, mut lane_out: ArrayViewMut1<f64>, taps: &[Tap]) {
    for (o, tap) in taps.iter().enumerate() {
        lane_out[o] = lane_in[tap.lo] * (1.0 - tap.frac) + lane_in[tap.hi] * tap.frac;
    }
}

fn interpolate_axis(data: &Array2<f64>, axis: Axis, taps: &[Tap]) -> Array2<f64> {
    let mut shape = data.raw_dim();
    shape[axis.index()] = taps.len();

    let mut out = Array2::<f64>::zeros(shape);
    for (lane_in, lane_out) in data.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        interpolate_lane(lane_in, lane_out, taps);
    }
    out
}
