// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The `RecognitionEngine` trait implemented by every OCR backend.

use docverify_core::error::Result;
use docverify_core::types::Detection;
use image::DynamicImage;

/// Text plus engine-native scores.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    /// Mean confidence in `[0, 1]`.
    pub confidence: f64,
    pub detections: Vec<Detection>,
}

/// An OCR backend.
///
/// Engines are owned by an [`EngineHandle`](crate::EngineHandle), which
/// serializes calls, so methods take `&mut self`.
pub trait RecognitionEngine: Send {
    /// Short identifier used in logs and reports (e.g. `ocrs`, `tesseract`).
    fn name(&self) -> &str;

    /// Recognise all text in the image, lines separated by `\n`.
    fn extract(&mut self, image: &DynamicImage) -> Result<String>;

    /// Recognise text with native confidence and per-fragment detections.
    ///
    /// Engines without native scores return `Ok(None)` and the caller falls
    /// back to [`extract`](Self::extract) plus a heuristic score.
    fn extract_with_confidence(&mut self, _image: &DynamicImage) -> Result<Option<EngineOutput>> {
        Ok(None)
    }
}
