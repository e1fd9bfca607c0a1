// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing pipeline: deskew, denoise, enhance, in that order.

use docverify_core::config::PreprocessConfig;
use docverify_core::error::Result;
use image::DynamicImage;
use tracing::{info, instrument, warn};

use super::{denoise, deskew, enhance};
use crate::source::normalize;

/// Runs the enabled preprocessing stages over an image.
///
/// `process` never fails: a stage that errors is logged and skipped, and the
/// image it was given flows on to the next stage unchanged.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: DynamicImage) -> DynamicImage {
        if image.width() == 0 || image.height() == 0 {
            warn!("Empty image; skipping preprocessing");
            return image;
        }
        let mut current = normalize(image);

        if self.config.deskew {
            current = run_stage("deskew", current, deskew::deskew);
        }
        if self.config.denoise {
            let strength = self.config.denoise_strength;
            current = run_stage("denoise", current, |img| denoise::denoise(img, strength));
        }
        if self.config.enhance {
            let (clip, grid) = (self.config.clahe_clip_limit, self.config.clahe_tile_grid);
            current = run_stage("enhance", current, |img| {
                enhance::enhance_contrast(img, clip, grid)
            });
        }

        info!(
            width = current.width(),
            height = current.height(),
            "Preprocessing complete"
        );
        current
    }
}

fn run_stage(
    name: &'static str,
    input: DynamicImage,
    stage: impl FnOnce(&DynamicImage) -> Result<DynamicImage>,
) -> DynamicImage {
    match stage(&input) {
        Ok(output) => output,
        Err(err) => {
            warn!(stage = name, error = %err, "Preprocessing stage failed; keeping its input");
            input
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgba, RgbaImage};

    #[test]
    fn empty_image_passes_through() {
        let preprocessor = Preprocessor::default();
        for image in [
            DynamicImage::ImageLuma8(GrayImage::new(0, 0)),
            DynamicImage::ImageRgba8(RgbaImage::new(0, 0)),
            DynamicImage::ImageLuma8(GrayImage::new(0, 12)),
        ] {
            let out = preprocessor.process(image.clone());
            assert_eq!(out, image);
        }
    }

    #[test]
    fn all_stages_disabled_is_identity() {
        let config = PreprocessConfig {
            deskew: false,
            denoise: false,
            enhance: false,
            ..PreprocessConfig::default()
        };
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(30, 20, |x, y| {
            Luma([(x * 7 + y) as u8])
        }));
        let out = Preprocessor::new(config).process(img.clone());
        assert_eq!(out, img);
    }

    #[test]
    fn failing_stage_keeps_its_input() {
        // An invalid tile grid makes the enhance stage fail.
        let config = PreprocessConfig {
            deskew: false,
            denoise: false,
            enhance: true,
            clahe_tile_grid: 0,
            ..PreprocessConfig::default()
        };
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([77])));
        let out = Preprocessor::new(config).process(img.clone());
        assert_eq!(out, img);
    }

    #[test]
    fn rgba_input_is_normalized() {
        let config = PreprocessConfig {
            deskew: false,
            denoise: false,
            enhance: false,
            ..PreprocessConfig::default()
        };
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        let out = Preprocessor::new(config).process(img);
        assert!(matches!(out, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn full_pipeline_on_blank_page_keeps_size() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([250])));
        let out = Preprocessor::default().process(img);
        assert_eq!((out.width(), out.height()), (40, 30));
    }
}
