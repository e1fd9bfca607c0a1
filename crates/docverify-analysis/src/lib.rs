// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// DocVerify text analysis: what kind of document the recognised text came
// from, which fields it carries, and whether those fields are plausible.
//
// Classification and extraction are rule/pattern driven. When a language
// model is configured it is consulted only as a fallback, under an explicit
// timeout, and its failures degrade to the rule-based result.

pub mod classify;
pub mod extract;
pub mod llm;
pub mod validate;

pub use classify::Classifier;
pub use extract::Extractor;
pub use llm::LanguageModel;
pub use validate::Validator;
