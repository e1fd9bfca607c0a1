// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation and correction.
//
// Pipeline:
//
// 1. Luminance, inverted so text strokes are bright
// 2. Canny edge detection (50 / 150)
// 3. Probabilistic Hough segments (see `hough`)
// 4. Keep near-horizontal segments (-45..45 degrees), take the median angle
// 5. Rotate about the centre by that angle onto an enlarged canvas, with
//    bicubic interpolation and edge-replicated borders

use docverify_core::error::{DocVerifyError, Result};
use image::{DynamicImage, GrayImage, ImageBuffer, Pixel};
use imageproc::edges::canny;
use tracing::{debug, info, instrument};

use super::hough::SegmentDetector;

/// Skews smaller than this (degrees) are left alone.
pub const MIN_CORRECTION_DEGREES: f64 = 0.1;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Estimate the dominant text-line angle in degrees.
///
/// Returns 0.0 when no usable segments are found.
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn estimate_skew(image: &DynamicImage) -> f64 {
    let mut gray: GrayImage = image.to_luma8();
    image::imageops::invert(&mut gray);
    let edges = canny(&gray, CANNY_LOW, CANNY_HIGH);

    let segments = SegmentDetector::default().detect(&edges);
    let mut angles: Vec<f64> = segments
        .iter()
        .map(|s| s.angle_degrees())
        .filter(|a| *a > -45.0 && *a < 45.0)
        .collect();
    debug!(
        segments = segments.len(),
        kept = angles.len(),
        "Skew candidates collected"
    );

    median(&mut angles).unwrap_or(0.0)
}

/// Estimate and correct skew. Returns the input unchanged when the skew is
/// below [`MIN_CORRECTION_DEGREES`].
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn deskew(image: &DynamicImage) -> Result<DynamicImage> {
    let angle = estimate_skew(image);
    if angle.abs() < MIN_CORRECTION_DEGREES {
        debug!(angle, "Skew below correction threshold");
        return Ok(image.clone());
    }
    info!(angle, "Correcting skew");
    rotate_expanded(image, angle)
}

/// Canvas size after rotating a `width` x `height` image by `degrees`.
pub fn rotated_canvas(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let w = f64::from(width);
    let h = f64::from(height);
    let new_w = (h * sin + w * cos) as u32;
    let new_h = (h * cos + w * sin) as u32;
    (new_w, new_h)
}

/// Rotate so that a line at `degrees` becomes horizontal, growing the canvas
/// so no content is cropped.
pub fn rotate_expanded(image: &DynamicImage, degrees: f64) -> Result<DynamicImage> {
    let (new_w, new_h) = rotated_canvas(image.width(), image.height(), degrees);
    if new_w == 0 || new_h == 0 {
        return Err(DocVerifyError::Preprocess(format!(
            "rotation by {degrees} degrees produced an empty canvas"
        )));
    }

    match image {
        DynamicImage::ImageLuma8(buf) => Ok(DynamicImage::ImageLuma8(warp_rotation(
            buf, degrees, new_w, new_h,
        ))),
        DynamicImage::ImageRgb8(buf) => Ok(DynamicImage::ImageRgb8(warp_rotation(
            buf, degrees, new_w, new_h,
        ))),
        other => Err(DocVerifyError::Preprocess(format!(
            "unsupported pixel layout for rotation: {:?}",
            other.color()
        ))),
    }
}

/// Inverse-map every destination pixel into the source and sample it with a
/// bicubic kernel. Source coordinates outside the image clamp to the edge;
/// `imageproc::geometric_transformations::warp_into` only offers a constant
/// fill colour for those.
fn warp_rotation<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    degrees: f64,
    new_w: u32,
    new_h: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = usize::from(P::CHANNEL_COUNT);
    let (w, h) = src.dimensions();
    let raw = src.as_raw();
    let (sin, cos) = degrees.to_radians().sin_cos();

    // Centre of rotation uses integer halves of the source, the destination
    // centre uses the exact half of the new canvas.
    let cx = f64::from(w / 2);
    let cy = f64::from(h / 2);
    let ncx = f64::from(new_w) / 2.0;
    let ncy = f64::from(new_h) / 2.0;

    let mut out = vec![0u8; new_w as usize * new_h as usize * channels];
    let mut acc = vec![0f64; channels];

    for y in 0..new_h {
        let dy = f64::from(y) - ncy;
        for x in 0..new_w {
            let dx = f64::from(x) - ncx;
            let sx = cos * dx - sin * dy + cx;
            let sy = sin * dx + cos * dy + cy;

            let x0 = sx.floor();
            let y0 = sy.floor();
            let wx = cubic_weights(sx - x0);
            let wy = cubic_weights(sy - y0);

            acc.iter_mut().for_each(|v| *v = 0.0);
            for (row, wyv) in wy.iter().enumerate() {
                let yy = clamp_index(y0 as i64 - 1 + row as i64, h);
                for (col, wxv) in wx.iter().enumerate() {
                    let xx = clamp_index(x0 as i64 - 1 + col as i64, w);
                    let base = (yy * w as usize + xx) * channels;
                    let weight = wyv * wxv;
                    for (c, v) in acc.iter_mut().enumerate() {
                        *v += weight * f64::from(raw[base + c]);
                    }
                }
            }

            let base = (y as usize * new_w as usize + x as usize) * channels;
            for (c, v) in acc.iter().enumerate() {
                out[base + c] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    // Buffer length always matches new_w * new_h * channels.
    ImageBuffer::from_raw(new_w, new_h, out).unwrap_or_else(|| ImageBuffer::new(new_w, new_h))
}

/// Catmull-Rom style cubic convolution weights (a = -0.75) for the four taps
/// around a sample at fractional offset `t`.
fn cubic_weights(t: f64) -> [f64; 4] {
    const A: f64 = -0.75;
    let w0 = ((A * (t + 1.0) - 5.0 * A) * (t + 1.0) + 8.0 * A) * (t + 1.0) - 4.0 * A;
    let w1 = ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0;
    let w2 = ((A + 2.0) * (1.0 - t) - (A + 3.0)) * (1.0 - t) * (1.0 - t) + 1.0;
    let w3 = 1.0 - w0 - w1 - w2;
    [w0, w1, w2, w3]
}

fn clamp_index(i: i64, len: u32) -> usize {
    i.clamp(0, i64::from(len) - 1) as usize
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
