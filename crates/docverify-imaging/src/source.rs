// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image intake: decode files or uploaded bytes into a normalized raster.
//
// Every decoded image is reduced to one of two layouts the preprocessing
// stages understand: 8-bit grayscale or 8-bit RGB. Alpha is dropped and
// 16-bit/float images are narrowed.

use std::path::Path;

use docverify_core::error::{DocVerifyError, Result};
use image::{ColorType, DynamicImage};
use tracing::{debug, info, instrument};

/// A decoded document image, normalized to `Luma8` or `Rgb8`.
#[derive(Debug, Clone)]
pub struct ImageSource {
    image: DynamicImage,
}

impl ImageSource {
    // -- Construction ---------------------------------------------------------

    /// Read and decode an image file.
    ///
    /// A missing or unreadable file is an `Io` error; a file that is present
    /// but cannot be decoded is a `Decode` error.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let image = image::load_from_memory(&data).map_err(|err| {
            DocVerifyError::Decode(format!(
                "failed to decode {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = image.width(), height = image.height(), "Image loaded");
        Ok(Self::from_dynamic(image))
    }

    /// Decode raw encoded bytes (JPEG, PNG, TIFF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(DocVerifyError::Decode("empty image payload".into()));
        }
        let image = image::load_from_memory(data)
            .map_err(|err| DocVerifyError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = image.width(),
            height = image.height(),
            "Image decoded from bytes"
        );
        Ok(Self::from_dynamic(image))
    }

    /// Wrap an already-decoded image, normalizing its pixel layout.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: normalize(image),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }
}

/// Reduce any decoded image to `Luma8` or `Rgb8`.
pub fn normalize(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::L8 => image,
        ColorType::Rgb8 => image,
        ColorType::La8 | ColorType::L16 | ColorType::La16 => {
            DynamicImage::ImageLuma8(image.to_luma8())
        }
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}
