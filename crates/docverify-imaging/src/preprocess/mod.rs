// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing stages: skew correction, noise removal, and contrast
// enhancement for photographed documents.

pub mod denoise;
pub mod deskew;
pub mod enhance;
pub mod hough;
pub mod pipeline;

pub use pipeline::Preprocessor;
