// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Non-local means denoising.
//
// Each output pixel is a weighted mean of the pixels in a 21x21 search window,
// weighted by how similar their 7x7 neighbourhoods are. Patch distances for a
// given search offset are computed for the whole image at once from a
// summed-area table of squared differences, so the cost per offset is linear
// in the pixel count.

use docverify_core::error::{DocVerifyError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, instrument};

/// Half-size of the 7x7 comparison patch.
const TEMPLATE_RADIUS: i64 = 3;
/// Half-size of the 21x21 search window.
const SEARCH_RADIUS: i64 = 10;

/// Denoise a grayscale or RGB image. RGB channels are filtered independently.
#[instrument(skip(image), fields(width = image.width(), height = image.height(), strength))]
pub fn denoise(image: &DynamicImage, strength: f32) -> Result<DynamicImage> {
    if strength <= 0.0 {
        return Err(DocVerifyError::Preprocess(format!(
            "denoise strength must be positive, got {strength}"
        )));
    }

    let out = match image {
        DynamicImage::ImageLuma8(gray) => {
            let (w, h) = gray.dimensions();
            let plane = nl_means_plane(gray.as_raw(), w, h, strength);
            DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, plane).ok_or_else(|| {
                DocVerifyError::Preprocess("denoised plane has wrong size".into())
            })?)
        }
        DynamicImage::ImageRgb8(rgb) => {
            let (w, h) = rgb.dimensions();
            let raw = rgb.as_raw();
            let mut interleaved = vec![0u8; raw.len()];
            for c in 0..3 {
                let channel: Vec<u8> = raw.iter().skip(c).step_by(3).copied().collect();
                let filtered = nl_means_plane(&channel, w, h, strength);
                for (i, v) in filtered.into_iter().enumerate() {
                    interleaved[i * 3 + c] = v;
                }
            }
            DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, interleaved).ok_or_else(|| {
                DocVerifyError::Preprocess("denoised image has wrong size".into())
            })?)
        }
        other => {
            return Err(DocVerifyError::Preprocess(format!(
                "unsupported pixel layout for denoising: {:?}",
                other.color()
            )));
        }
    };

    debug!("Denoising complete");
    Ok(out)
}

/// Filter a single 8-bit plane.
fn nl_means_plane(src: &[u8], width: u32, height: u32, strength: f32) -> Vec<u8> {
    let w = i64::from(width);
    let h = i64::from(height);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    // Pad by search + template radius with edge replication so every window
    // lookup stays in bounds.
    let pad = SEARCH_RADIUS + TEMPLATE_RADIUS;
    let pw = w + 2 * pad;
    let ph = h + 2 * pad;
    let padded: Vec<f64> = (0..ph)
        .flat_map(|y| {
            let sy = (y - pad).clamp(0, h - 1);
            (0..pw).map(move |x| {
                let sx = (x - pad).clamp(0, w - 1);
                f64::from(src[(sy * w + sx) as usize])
            })
        })
        .collect();

    // Region over which squared differences are needed: the image plus a
    // template radius on each side.
    let rw = w + 2 * TEMPLATE_RADIUS;
    let rh = h + 2 * TEMPLATE_RADIUS;
    let origin = pad - TEMPLATE_RADIUS;
    let patch = 2 * TEMPLATE_RADIUS + 1;
    let patch_area = (patch * patch) as f64;
    let h2 = f64::from(strength) * f64::from(strength);

    let stride = (rw + 1) as usize;
    let mut integral = vec![0f64; stride * (rh + 1) as usize];
    let mut weight_sum = vec![0f64; (w * h) as usize];
    let mut value_sum = vec![0f64; (w * h) as usize];

    for oy in -SEARCH_RADIUS..=SEARCH_RADIUS {
        for ox in -SEARCH_RADIUS..=SEARCH_RADIUS {
            // Summed-area table of (I(q) - I(q + offset))^2 over the region.
            for ry in 0..rh {
                let mut row_sum = 0.0;
                let py = origin + ry;
                for rx in 0..rw {
                    let px = origin + rx;
                    let a = padded[(py * pw + px) as usize];
                    let b = padded[((py + oy) * pw + px + ox) as usize];
                    row_sum += (a - b) * (a - b);
                    let idx = (ry as usize + 1) * stride + rx as usize + 1;
                    integral[idx] = row_sum + integral[idx - stride];
                }
            }

            for y in 0..h {
                for x in 0..w {
                    let (x1, y1) = (x as usize, y as usize);
                    let (x2, y2) = ((x + patch) as usize, (y + patch) as usize);
                    let ssd = integral[y2 * stride + x2] - integral[y1 * stride + x2]
                        - integral[y2 * stride + x1]
                        + integral[y1 * stride + x1];
                    let weight = (-(ssd / patch_area).max(0.0) / h2).exp();
                    let neighbour =
                        padded[((y + pad + oy) * pw + x + pad + ox) as usize];
                    let i = (y * w + x) as usize;
                    weight_sum[i] += weight;
                    value_sum[i] += weight * neighbour;
                }
            }
        }
    }

    // The zero offset always contributes weight 1, so weight_sum > 0.
    value_sum
        .iter()
        .zip(&weight_sum)
        .map(|(v, wsum)| (v / wsum).round().clamp(0.0, 255.0) as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn variance(values: impl Iterator<Item = u8> + Clone) -> f64 {
        let n = values.clone().count() as f64;
        let mean = values.clone().map(f64::from).sum::<f64>() / n;
        values.map(|v| (f64::from(v) - mean).powi(2)).sum::<f64>() / n
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(24, 18, Luma([140])));
        let out = denoise(&img, 10.0).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn speckle_noise_is_reduced() {
        let mut gray = GrayImage::from_pixel(32, 32, Luma([128]));
        // Deterministic +-12 speckle.
        for (x, y, p) in gray.enumerate_pixels_mut() {
            if (x * 7 + y * 13) % 5 == 0 {
                p.0[0] = 140;
            } else if (x * 3 + y * 11) % 7 == 0 {
                p.0[0] = 116;
            }
        }
        let before = variance(gray.as_raw().iter().copied());
        let out = denoise(&DynamicImage::ImageLuma8(gray), 10.0).unwrap().to_luma8();
        let after = variance(out.as_raw().iter().copied());
        assert!(after < before / 2.0, "variance {before} -> {after}");
    }

    #[test]
    fn rgb_keeps_layout_and_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([10, 120, 240])));
        let out = denoise(&img, 10.0).unwrap();
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        assert_eq!(out, img);
    }

    #[test]
    fn non_positive_strength_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(4, 4));
        assert!(denoise(&img, 0.0).is_err());
    }
}
