// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for DocVerify.

use thiserror::Error;

use crate::lifecycle::LifecycleError;

/// Top-level error type for all DocVerify operations.
///
/// Only [`DocVerifyError::Decode`] is fatal to a processing request; every
/// other variant is absorbed by the stage that produced it and downgraded to a
/// lower-confidence partial result.
#[derive(Debug, Error)]
pub enum DocVerifyError {
    // -- Input --
    #[error("image could not be decoded: {0}")]
    Decode(String),

    // -- Engines --
    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("image preprocessing failed: {0}")]
    Preprocess(String),

    // -- Language-model fallback --
    #[error("language-model fallback failed: {0}")]
    Fallback(String),

    // -- Configuration / lifecycle --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    // -- Plumbing --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocVerifyError>;
