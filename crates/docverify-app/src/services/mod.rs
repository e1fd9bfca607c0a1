// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service layer: turns command-line input into a configured pipeline.

pub mod data_dir;
pub mod engines;
pub mod settings;
