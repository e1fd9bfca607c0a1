// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine wiring.
//
// Which engines exist depends on the compiled features: `ocrs` (default) is
// preferred as primary, `tesseract` serves as fallback or, alone, as primary.
// Handles are lazy, so building the ensemble never loads a model.

use std::sync::Arc;

use docverify_core::config::RecognitionConfig;
use docverify_core::error::{DocVerifyError, Result};
use docverify_recognition::{EngineHandle, RecognitionEnsemble};
use tracing::info;

/// Build the ensemble from every compiled-in engine.
pub fn build_ensemble(config: &RecognitionConfig) -> Result<RecognitionEnsemble> {
    let mut handles = available_engines(config).into_iter();
    let primary = handles.next().ok_or_else(|| {
        DocVerifyError::EngineUnavailable(
            "built without an OCR backend; enable the `ocrs` or `tesseract` feature".into(),
        )
    })?;

    let mut ensemble = RecognitionEnsemble::new(primary, config.confidence_threshold);
    if config.use_fallback {
        if let Some(fallback) = handles.next() {
            ensemble = ensemble.with_fallback(fallback);
        }
    }

    info!(
        primary = %ensemble.primary().name(),
        fallback = ?ensemble.fallback().map(|h| h.name().to_string()),
        "recognition ensemble configured"
    );
    Ok(ensemble)
}

#[allow(unused_variables, unused_mut)]
fn available_engines(config: &RecognitionConfig) -> Vec<Arc<EngineHandle>> {
    let mut handles = Vec::new();

    #[cfg(feature = "ocrs")]
    {
        use docverify_recognition::{OcrsEngine, RecognitionEngine};

        let model_dir = config.model_dir.clone();
        handles.push(Arc::new(EngineHandle::lazy("ocrs", move || {
            let engine = OcrsEngine::from_model_dir(model_dir.as_deref())?;
            Ok(Box::new(engine) as Box<dyn RecognitionEngine>)
        })));
    }

    #[cfg(feature = "tesseract")]
    {
        use docverify_recognition::{RecognitionEngine, TesseractEngine};

        let languages = config.languages.clone();
        handles.push(Arc::new(EngineHandle::lazy("tesseract", move || {
            let engine = TesseractEngine::new(&languages, None)?;
            Ok(Box::new(engine) as Box<dyn RecognitionEngine>)
        })));
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "ocrs")]
    #[test]
    fn ocrs_is_primary_and_not_loaded_yet() {
        use docverify_core::lifecycle::HandleState;

        let ensemble = build_ensemble(&RecognitionConfig::default()).unwrap();
        assert_eq!(ensemble.primary().name(), "ocrs");
        assert_eq!(ensemble.primary().state(), HandleState::Idle);
        assert_eq!(ensemble.confidence_threshold(), 0.7);
    }

    #[cfg(all(feature = "ocrs", feature = "tesseract"))]
    #[test]
    fn tesseract_is_fallback_unless_disabled() {
        let ensemble = build_ensemble(&RecognitionConfig::default()).unwrap();
        assert_eq!(ensemble.fallback().map(|h| h.name()), Some("tesseract"));

        let config = RecognitionConfig {
            use_fallback: false,
            ..RecognitionConfig::default()
        };
        assert!(build_ensemble(&config).unwrap().fallback().is_none());
    }

    #[cfg(not(any(feature = "ocrs", feature = "tesseract")))]
    #[test]
    fn no_backend_is_engine_unavailable() {
        assert!(matches!(
            build_ensemble(&RecognitionConfig::default()),
            Err(DocVerifyError::EngineUnavailable(_))
        ));
    }
}
