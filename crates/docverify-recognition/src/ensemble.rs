// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition ensemble: primary engine first, fallback only when the
// primary is not confident enough.

use std::sync::Arc;

use docverify_core::types::{RecognitionResult, RecognitionSource};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use crate::confidence::estimate_confidence;
use crate::handle::{EngineHandle, Recognition};

/// Confidence gap under which primary and fallback results are merged.
const MERGE_WINDOW: f64 = 0.1;
/// Fallback text must be this much longer than the primary's to lead a merge.
const MERGE_LENGTH_RATIO: f64 = 1.2;

/// Primary/fallback OCR with confidence-driven selection.
///
/// Never fails: an unusable primary yields an empty zero-confidence result,
/// a failing fallback is ignored.
#[derive(Debug, Clone)]
pub struct RecognitionEnsemble {
    primary: Arc<EngineHandle>,
    fallback: Option<Arc<EngineHandle>>,
    confidence_threshold: f64,
}

impl RecognitionEnsemble {
    pub fn new(primary: Arc<EngineHandle>, confidence_threshold: f64) -> Self {
        Self {
            primary,
            fallback: None,
            confidence_threshold,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<EngineHandle>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn primary(&self) -> &Arc<EngineHandle> {
        &self.primary
    }

    pub fn fallback(&self) -> Option<&Arc<EngineHandle>> {
        self.fallback.as_ref()
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Recognise text, consulting the fallback engine only when needed.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn extract(&self, image: &DynamicImage) -> RecognitionResult {
        let primary_source = RecognitionSource::Primary {
            engine: self.primary.name().to_string(),
        };
        let primary = match self.primary.recognize(image) {
            Ok(recognition) => into_result(recognition, primary_source),
            Err(err) => {
                warn!(engine = %self.primary.name(), error = %err, "Primary engine failed");
                RecognitionResult::empty(primary_source)
            }
        };

        if primary.confidence >= self.confidence_threshold {
            info!(confidence = primary.confidence, "Using primary result (high confidence)");
            return primary;
        }

        let Some(fallback_handle) = &self.fallback else {
            debug!(confidence = primary.confidence, "No fallback configured");
            return primary;
        };

        let fallback_source = RecognitionSource::Fallback {
            engine: fallback_handle.name().to_string(),
        };
        let fallback = match fallback_handle.recognize(image) {
            Ok(recognition) => into_result(recognition, fallback_source),
            Err(err) => {
                warn!(engine = %fallback_handle.name(), error = %err, "Fallback engine failed; keeping primary");
                return primary;
            }
        };

        select(primary, fallback)
    }
}

/// Choose between (or merge) a low-confidence primary and its fallback.
pub fn select(primary: RecognitionResult, fallback: RecognitionResult) -> RecognitionResult {
    if fallback.confidence > primary.confidence {
        info!(
            primary = primary.confidence,
            fallback = fallback.confidence,
            "Using fallback result (better confidence)"
        );
        return fallback;
    }
    if (fallback.confidence - primary.confidence).abs() < MERGE_WINDOW {
        info!("Using merged recognition result");
        return merge(primary, fallback);
    }
    info!(confidence = primary.confidence, "Using primary result (default)");
    primary
}

/// Merge two comparably confident results. The fallback text leads only when
/// it is substantially longer.
pub fn merge(primary: RecognitionResult, fallback: RecognitionResult) -> RecognitionResult {
    let primary_len = primary.text.chars().count() as f64;
    let fallback_len = fallback.text.chars().count() as f64;
    let (lead, other) = if fallback_len > primary_len * MERGE_LENGTH_RATIO {
        (fallback, primary)
    } else {
        (primary, fallback)
    };

    let confidence = (lead.confidence + other.confidence) / 2.0;
    let source = RecognitionSource::Merged {
        lead: engine_name(&lead.source),
        other: engine_name(&other.source),
    };
    let mut detections = lead.detections;
    detections.extend(other.detections);

    RecognitionResult {
        text: lead.text,
        confidence,
        source,
        detections,
    }
}

fn into_result(recognition: Recognition, source: RecognitionSource) -> RecognitionResult {
    match recognition {
        Recognition::Native(output) => RecognitionResult {
            text: output.text,
            confidence: output.confidence.clamp(0.0, 1.0),
            source,
            detections: output.detections,
        },
        Recognition::Text(text) => RecognitionResult {
            confidence: estimate_confidence(&text),
            text,
            source,
            detections: Vec::new(),
        },
    }
}

fn engine_name(source: &RecognitionSource) -> String {
    match source {
        RecognitionSource::Primary { engine } | RecognitionSource::Fallback { engine } => {
            engine.clone()
        }
        RecognitionSource::Merged { lead, .. } => lead.clone(),
    }
}
