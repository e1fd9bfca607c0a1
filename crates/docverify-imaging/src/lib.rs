// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docverify-imaging: Image intake and normalization for DocVerify.
//
// Decodes uploaded document photos and runs the preprocessing stages that
// make them easier to read: deskew, non-local-means denoising and local
// contrast equalization.

pub mod preprocess;
pub mod source;

pub use preprocess::Preprocessor;
pub use source::ImageSource;
