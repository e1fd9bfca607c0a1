// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust OCR backend built on `ocrs`, with neural network models executed
// via `rten`.
//
// # Feature Gate
//
// Only available with the `ocrs` feature:
//
// ```toml
// docverify-recognition = { path = "crates/docverify-recognition", features = ["ocrs"] }
// ```
//
// # Model Setup
//
// The engine needs two model files in one directory:
//
// - **Detection model** (`text-detection.rten`): locates text regions.
// - **Recognition model** (`text-recognition.rten`): decodes characters.
//
// Running the `ocrs-cli` tool once downloads both into the default cache
// directory, `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).
//
// The engine reports plain text only, so the ensemble scores its output with
// the heuristic in `confidence`.

use std::path::{Path, PathBuf};

use docverify_core::error::{DocVerifyError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::engine::RecognitionEngine;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Default directory for cached model files.
///
/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrsModels {
    pub detection: PathBuf,
    pub recognition: PathBuf,
}

impl Default for OcrsModels {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsModels {
    /// Expect `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection: dir.join(DETECTION_MODEL_FILENAME),
            recognition: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Fail early, with a hint, when either model is missing.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [("detection", &self.detection), ("recognition", &self.recognition)] {
            if !path.exists() {
                return Err(DocVerifyError::EngineUnavailable(format!(
                    "ocrs {kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn available(&self) -> bool {
        self.detection.exists() && self.recognition.exists()
    }
}

/// `ocrs` detection + recognition pipeline.
pub struct OcrsEngine {
    engine: OcrEngine,
}

impl OcrsEngine {
    /// Load both models. This is the expensive step; handles call it once.
    #[instrument(skip_all, fields(
        detection = %models.detection.display(),
        recognition = %models.recognition.display(),
    ))]
    pub fn load(models: &OcrsModels) -> Result<Self> {
        models.validate()?;

        info!("Loading ocrs detection model");
        let detection_model = Model::load_file(&models.detection).map_err(|err| {
            DocVerifyError::EngineUnavailable(format!(
                "failed to load detection model from {}: {}",
                models.detection.display(),
                err
            ))
        })?;

        info!("Loading ocrs recognition model");
        let recognition_model = Model::load_file(&models.recognition).map_err(|err| {
            DocVerifyError::EngineUnavailable(format!(
                "failed to load recognition model from {}: {}",
                models.recognition.display(),
                err
            ))
        })?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            DocVerifyError::EngineUnavailable(format!("failed to initialise ocrs: {}", err))
        })?;

        info!("ocrs engine ready");
        Ok(Self { engine })
    }

    /// Load from a model directory, or the default cache directory.
    pub fn from_model_dir(dir: Option<&Path>) -> Result<Self> {
        let models = dir.map(OcrsModels::from_dir).unwrap_or_default();
        Self::load(&models)
    }
}

impl RecognitionEngine for OcrsEngine {
    fn name(&self) -> &str {
        "ocrs"
    }

    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn extract(&mut self, image: &DynamicImage) -> Result<String> {
        // ocrs expects RGB8.
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            DocVerifyError::Recognition(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| DocVerifyError::Recognition(format!("ocrs input preparation failed: {}", err)))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| DocVerifyError::Recognition(format!("ocrs recognition failed: {}", err)))?;

        debug!(
            line_count = text.lines().count(),
            char_count = text.chars().count(),
            "ocrs recognition complete"
        );
        Ok(text)
    }
}
