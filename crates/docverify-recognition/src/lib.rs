// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-recognition: Text recognition for DocVerify.
//
// A primary OCR engine runs first; when its confidence is low a fallback
// engine is consulted and the better (or merged) result wins. Engines are
// loaded lazily, exactly once, behind shared handles.
//
// # Feature Gates
//
// - `ocrs`: pure-Rust `ocrs`/`rten` engine (text only, heuristic confidence)
// - `tesseract`: libtesseract engine (per-word confidence and boxes)

pub mod confidence;
pub mod engine;
pub mod ensemble;
pub mod handle;

#[cfg(feature = "ocrs")]
pub mod ocrs_engine;

#[cfg(feature = "tesseract")]
pub mod tesseract_engine;

pub use confidence::estimate_confidence;
pub use engine::{EngineOutput, RecognitionEngine};
pub use ensemble::RecognitionEnsemble;
pub use handle::{EngineHandle, Recognition};

#[cfg(feature = "ocrs")]
pub use ocrs_engine::OcrsEngine;

#[cfg(feature = "tesseract")]
pub use tesseract_engine::TesseractEngine;
