// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local contrast enhancement (contrast-limited adaptive histogram
// equalization).
//
// Grayscale images are equalized directly. Colour images are converted to
// CIE L*a*b*, only the lightness channel is equalized, and the result is
// converted back so hues are preserved.

use docverify_core::error::{DocVerifyError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use tracing::{debug, instrument};

/// Equalize local contrast with the given clip limit and tile grid.
#[instrument(skip(image), fields(width = image.width(), height = image.height(), clip_limit, grid))]
pub fn enhance_contrast(image: &DynamicImage, clip_limit: f32, grid: u32) -> Result<DynamicImage> {
    if grid == 0 || clip_limit <= 0.0 {
        return Err(DocVerifyError::Preprocess(format!(
            "invalid CLAHE parameters: clip_limit={clip_limit}, grid={grid}"
        )));
    }

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let (w, h) = gray.dimensions();
            let out = clahe(gray.as_raw(), w, h, clip_limit, grid);
            let buf = GrayImage::from_raw(w, h, out)
                .ok_or_else(|| DocVerifyError::Preprocess("CLAHE output has wrong size".into()))?;
            debug!("Equalized grayscale image");
            Ok(DynamicImage::ImageLuma8(buf))
        }
        DynamicImage::ImageRgb8(rgb) => {
            let (w, h) = rgb.dimensions();
            let lab: Vec<[f64; 3]> = rgb.pixels().map(|p| rgb_to_lab(p.0)).collect();

            // 8-bit lightness, as 0..=100 scaled to 0..=255.
            let lightness: Vec<u8> = lab
                .iter()
                .map(|[l, _, _]| (l * 255.0 / 100.0).round().clamp(0.0, 255.0) as u8)
                .collect();
            let equalized = clahe(&lightness, w, h, clip_limit, grid);

            let raw: Vec<u8> = lab
                .iter()
                .zip(&equalized)
                .flat_map(|([_, a, b], l8)| lab_to_rgb([f64::from(*l8) * 100.0 / 255.0, *a, *b]))
                .collect();
            let buf = RgbImage::from_raw(w, h, raw)
                .ok_or_else(|| DocVerifyError::Preprocess("CLAHE output has wrong size".into()))?;
            debug!("Equalized lightness channel");
            Ok(DynamicImage::ImageRgb8(buf))
        }
        other => Err(DocVerifyError::Preprocess(format!(
            "unsupported pixel layout for contrast enhancement: {:?}",
            other.color()
        ))),
    }
}

// -- CLAHE --------------------------------------------------------------------

/// Equalize one 8-bit plane.
///
/// The plane is split into `grid` x `grid` tiles (edges replicated so every
/// tile is full). Each tile's histogram is clipped at
/// `clip_limit * tile_area / 256`, the excess spread evenly across all bins,
/// and turned into a lookup table. Pixels are mapped by bilinear interpolation
/// between the four nearest tile tables.
fn clahe(src: &[u8], width: u32, height: u32, clip_limit: f32, grid: u32) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let w = width as usize;
    let h = height as usize;
    let tiles = grid as usize;
    let tile_w = w.div_ceil(tiles);
    let tile_h = h.div_ceil(tiles);
    let tile_area = tile_w * tile_h;

    let clip = ((f64::from(clip_limit) * tile_area as f64 / 256.0) as usize).max(1);
    let lut_scale = 255.0 / tile_area as f64;

    let mut luts = vec![[0u8; 256]; tiles * tiles];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let mut hist = [0usize; 256];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = y.min(h - 1);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = x.min(w - 1);
                    hist[usize::from(src[sy * w + sx])] += 1;
                }
            }

            // Clip and redistribute.
            let mut clipped = 0;
            for bin in hist.iter_mut() {
                if *bin > clip {
                    clipped += *bin - clip;
                    *bin = clip;
                }
            }
            let batch = clipped / 256;
            let mut residual = clipped - batch * 256;
            for bin in hist.iter_mut() {
                *bin += batch;
            }
            if residual > 0 {
                let step = (256 / residual).max(1);
                let mut i = 0;
                while i < 256 && residual > 0 {
                    hist[i] += 1;
                    residual -= 1;
                    i += step;
                }
            }

            let lut = &mut luts[ty * tiles + tx];
            let mut cumulative = 0usize;
            for (value, count) in hist.iter().enumerate() {
                cumulative += count;
                lut[value] = (cumulative as f64 * lut_scale).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let inv_tw = 1.0 / tile_w as f64;
    let inv_th = 1.0 / tile_h as f64;
    let last = tiles as i64 - 1;
    let mut out = vec![0u8; w * h];

    for y in 0..h {
        let tyf = y as f64 * inv_th - 0.5;
        let ty1 = tyf.floor() as i64;
        let ya = tyf - ty1 as f64;
        let (ty1c, ty2c) = (ty1.clamp(0, last) as usize, (ty1 + 1).clamp(0, last) as usize);

        for x in 0..w {
            let txf = x as f64 * inv_tw - 0.5;
            let tx1 = txf.floor() as i64;
            let xa = txf - tx1 as f64;
            let (tx1c, tx2c) = (tx1.clamp(0, last) as usize, (tx1 + 1).clamp(0, last) as usize);

            let v = usize::from(src[y * w + x]);
            let at = |ty: usize, tx: usize| f64::from(luts[ty * tiles + tx][v]);
            let top = at(ty1c, tx1c) * (1.0 - xa) + at(ty1c, tx2c) * xa;
            let bottom = at(ty2c, tx1c) * (1.0 - xa) + at(ty2c, tx2c) * xa;
            out[y * w + x] = (top * (1.0 - ya) + bottom * ya).round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

// -- Colour space -------------------------------------------------------------

// D65 white point.
const XN: f64 = 0.950_456;
const ZN: f64 = 1.088_754;

fn srgb_to_linear(c: u8) -> f64 {
    let c = f64::from(c) / 255.0;
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f64) -> u8 {
    let c = c.clamp(0.0, 1.0);
    let v = if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    };
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lab_f(t: f64) -> f64 {
    if t > 0.008_856 {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f64) -> f64 {
    let cube = f * f * f;
    if cube > 0.008_856 {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

/// sRGB (8-bit) to L*a*b* with L in 0..=100.
fn rgb_to_lab([r, g, b]: [u8; 3]) -> [f64; 3] {
    let (r, g, b) = (srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b));
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / XN;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / ZN;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > 0.008_856 { 116.0 * fy - 16.0 } else { 903.3 * y };
    [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn lab_to_rgb([l, a, b]: [f64; 3]) -> [u8; 3] {
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;
    let y = if l > 903.3 * 0.008_856 { fy * fy * fy } else { l / 903.3 };
    let x = lab_f_inv(fx) * XN;
    let z = lab_f_inv(fz) * ZN;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_992 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    [linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(bl)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn spread(values: &[u8]) -> u8 {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        max - min
    }

    #[test]
    fn low_contrast_texture_is_stretched() {
        // Texture confined to 120..=127.
        let gray = GrayImage::from_fn(128, 128, |x, y| Luma([120 + ((x * 3 + y * 5) % 8) as u8]));
        let before = spread(gray.as_raw());
        let out = enhance_contrast(&DynamicImage::ImageLuma8(gray), 2.0, 8)
            .unwrap()
            .to_luma8();
        assert!(spread(out.as_raw()) > before, "contrast did not increase");
    }

    #[test]
    fn output_keeps_dimensions_for_odd_sizes() {
        let gray = GrayImage::from_fn(37, 19, |x, y| Luma([((x * 5 + y * 3) % 256) as u8]));
        let out = enhance_contrast(&DynamicImage::ImageLuma8(gray), 2.0, 8).unwrap();
        assert_eq!((out.width(), out.height()), (37, 19));
    }

    #[test]
    fn lab_round_trip_is_close() {
        for rgb in [[0, 0, 0], [255, 255, 255], [200, 30, 60], [12, 140, 220]] {
            let back = lab_to_rgb(rgb_to_lab(rgb));
            for c in 0..3 {
                assert!(
                    (i16::from(back[c]) - i16::from(rgb[c])).abs() <= 1,
                    "{rgb:?} -> {back:?}"
                );
            }
        }
    }

    #[test]
    fn gray_colour_image_stays_gray() {
        let rgb = RgbImage::from_fn(32, 32, |x, _| {
            let v = 90 + (x as u8);
            Rgb([v, v, v])
        });
        let out = enhance_contrast(&DynamicImage::ImageRgb8(rgb), 2.0, 8)
            .unwrap()
            .to_rgb8();
        for p in out.pixels() {
            let [r, g, b] = p.0;
            assert!(r.abs_diff(g) <= 2 && g.abs_diff(b) <= 2, "tinted pixel {:?}", p);
        }
    }

    #[test]
    fn zero_grid_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(8, 8));
        assert!(enhance_contrast(&img, 2.0, 0).is_err());
    }
}
