// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocVerify pipeline coordinator: decode, normalize, recognise, classify,
// extract, and validate one document image into a `ProcessingReport`.

pub mod coordinator;

pub use coordinator::{DocumentPipeline, PipelineBuilder};
